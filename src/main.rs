use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use oura_notes_lib::document::DocumentStore;
use oura_notes_lib::{db, settings, trigger, AppState, PluginConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "oura-notes", version, about = "Import Oura Ring data into daily notes")]
struct Args {
  /// SQLite notes database (overrides OURA_NOTES_DB)
  #[arg(long)]
  db: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Import into an existing block, as a button click would
  Import { block_uid: String },
  /// Run the "Import Oura Ring Data" palette command
  Palette {
    /// Page or block that is open; defaults to today's daily page
    #[arg(long)]
    open: Option<String>,
  },
  /// List blocks carrying an import button
  Buttons {
    /// Import into every button found
    #[arg(long)]
    click: bool,
  },
  /// Show or change extension settings
  Settings {
    #[command(subcommand)]
    action: SettingsAction,
  },
  /// Inspect or edit pages
  Page {
    #[command(subcommand)]
    action: PageAction,
  },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
  /// Print stored settings (the token is masked)
  Show,
  /// Print the settings panel definition
  Panel,
  Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum PageAction {
  Show { title: String },
  /// Append a block to a page, creating the page if needed
  Add { title: String, text: String },
}

fn mask(value: &str) -> String {
  let visible: String = value.chars().take(4).collect();
  format!("{}…", visible)
}

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oura_notes=info,oura_notes_lib=info".into()),
    )
    .init();

  let args = Args::parse();
  let config = PluginConfig::from_env()?;
  let db_path = args.db.unwrap_or_else(|| config.db_path.clone());

  let pool = db::connect(&db_path)
    .await
    .with_context(|| format!("opening notes database {}", db_path))?;
  let state = AppState::new(pool, &config);

  match args.command {
    Command::Import { block_uid } => {
      let report = state.trigger.click_button(&block_uid).await?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Palette { open } => {
      let (block_uid, handle) = state.trigger.run_palette_command(open.as_deref()).await?;
      info!(block_uid = %block_uid, "Created block for import");
      let report = handle.await?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Buttons { click } => {
      let buttons = state.trigger.observer().scan(state.documents.as_ref()).await?;
      for block in &buttons {
        println!("{}\t{}", block.uid, block.text);
      }
      if click {
        let handles: Vec<_> = buttons
          .iter()
          .map(|block| state.trigger.click_button(&block.uid))
          .collect();
        for handle in handles {
          handle.await?;
        }
      }
    }
    Command::Settings { action } => match action {
      SettingsAction::Show => {
        for row in state.settings.all().await? {
          let value = if row.key == settings::TOKEN_KEY {
            mask(&row.value)
          } else {
            row.value
          };
          println!("{} = {}", row.key, value);
        }
      }
      SettingsAction::Panel => {
        println!("{}", serde_json::to_string_pretty(&settings::panel())?);
        println!("commands: {:?}", trigger::registered_commands());
      }
      SettingsAction::Set { key, value } => {
        state.settings.set(&key, &value).await?;
        println!("{} updated", key);
      }
    },
    Command::Page { action } => match action {
      PageAction::Show { title } => {
        let Some(page) = state.documents.page_by_title(&title).await? else {
          bail!("no page titled '{}'", title);
        };
        println!("{} ({})", title, page.uid);
        for block in state.documents.children(&page.uid).await? {
          println!("  {:>3} {}  {}", block.ord, block.uid, block.text);
        }
      }
      PageAction::Add { title, text } => {
        let page_uid = match oura_notes_lib::dates::page_title_to_date(&title) {
          Some(date) => oura_notes_lib::dates::date_to_page_uid(date),
          None => oura_notes_lib::document::new_uid(),
        };
        let page_uid = state.documents.ensure_page(&page_uid, &title).await?;
        let uid = state.documents.append_block(&page_uid, &text).await?;
        println!("{}", uid);
      }
    },
  }

  Ok(())
}
