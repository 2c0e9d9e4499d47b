pub mod block;
pub mod setting;

pub use block::Block;
pub use setting::SettingRow;
