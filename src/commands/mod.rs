//! Tauri plugin exposing the importer to a desktop notes host.

pub mod oura;

use crate::config::PluginConfig;
use crate::db::{self, AppState};
use std::sync::Arc;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime};
use tracing::{error, info, warn};

pub const PLUGIN_NAME: &str = "oura-ring";

pub fn init<R: Runtime>() -> TauriPlugin<R> {
  Builder::new(PLUGIN_NAME)
    .invoke_handler(tauri::generate_handler![
      oura::import_oura_ring,
      oura::import_oura_ring_data,
      oura::oura_settings_panel,
      oura::oura_set_setting,
    ])
    .setup(|app, _api| {
      let config = PluginConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default Oura configuration");
        PluginConfig::default()
      });

      let app_handle = app.clone();
      tauri::async_runtime::block_on(async move {
        match db::initialize_db(&app_handle).await {
          Ok(pool) => {
            app_handle.manage(Arc::new(AppState::new(pool, &config)));
            info!("Oura Ring plugin ready");
          }
          Err(e) => {
            error!(error = %e, "Failed to initialize database");
          }
        }
      });
      Ok(())
    })
    .build()
}
