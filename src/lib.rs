pub mod config;
pub mod dates;
pub mod db;
pub mod document;
pub mod format;
pub mod import;
pub mod models;
pub mod oura;
pub mod settings;
pub mod trigger;

#[cfg(feature = "tauri-plugin")]
pub mod commands;

#[cfg(test)]
mod test_utils;

pub use config::PluginConfig;
pub use db::{AppState, StoreError};
pub use import::{ImportReport, Importer};
pub use oura::{BiometricsSource, OuraError};
pub use trigger::Trigger;
