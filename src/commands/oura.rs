use crate::db::{AppState, StoreError};
use crate::import::ImportReport;
use crate::settings::{panel, SettingsPanel};
use std::sync::Arc;
use tauri::State;

/// ---------------------------------------------------------------------------
/// Button Click
/// ---------------------------------------------------------------------------

/// Import into the block holding the clicked button.
#[tauri::command]
pub async fn import_oura_ring(
  state: State<'_, Arc<AppState>>,
  block_uid: String,
) -> Result<ImportReport, StoreError> {
  state.trigger.importer().import_oura_ring(&block_uid).await
}

/// ---------------------------------------------------------------------------
/// Palette Command
/// ---------------------------------------------------------------------------

/// Append a block to the open page (or today's daily page) and import into
/// it. Returns the new block's uid without waiting for the import.
#[tauri::command]
pub async fn import_oura_ring_data(
  state: State<'_, Arc<AppState>>,
  open_uid: Option<String>,
) -> Result<String, StoreError> {
  let (block_uid, _import) = state
    .trigger
    .run_palette_command(open_uid.as_deref())
    .await?;
  Ok(block_uid)
}

/// ---------------------------------------------------------------------------
/// Settings
/// ---------------------------------------------------------------------------

#[tauri::command]
pub fn oura_settings_panel() -> SettingsPanel {
  panel()
}

#[tauri::command]
pub async fn oura_set_setting(
  state: State<'_, Arc<AppState>>,
  key: String,
  value: String,
) -> Result<(), StoreError> {
  state.settings.set(&key, &value).await
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
