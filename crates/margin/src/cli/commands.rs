//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Reads page captures and writes export documents to disk
//! - Owns the async runtime and the tracing subscriber
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: convert shell arguments into typed commands via clap
//! 2. **Context Setup**: resolve the data directory, load configuration, open the store
//! 3. **Dispatch**: route commands to the `MarginApi` facade
//! 4. **Output Formatting**: hand `CmdResult` values to `render.rs`
//! 5. **Error Handling**: errors bubble up as `anyhow::Error` to `main`

use super::render::{
    render_listing, render_merge, render_messages, render_status, render_suggestions,
    render_weave,
};
use super::setup::{Cli, Commands, ConfigCommands};
use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser;
use clapfig::{Clapfig, ConfigAction, ConfigResult, SearchPath};
use marginapp::api::MarginApi;
use marginapp::commands::CmdResult;
use marginapp::config::MarginConfig;
use marginapp::export::export_file_name;
use marginapp::init::{
    config_search_paths, global_data_dir, initialize, MarginContext, CONFIG_FILE_NAME,
};
use marginapp::model::{ExportDocument, Selection};
use marginapp::page::{MemoryPage, PageCapture};
use marginapp::store::fs_backend::FsBackend;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "MARGIN_LOG";

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Config { action } = &cli.command {
        return handle_config_command(action.as_ref(), cli.data.as_deref());
    }

    let ctx = initialize(cli.data.clone())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(dispatch(cli.command, &ctx))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn dispatch(command: Commands, ctx: &MarginContext) -> anyhow::Result<()> {
    let api = &ctx.api;
    match command {
        Commands::Scan { capture } => handle_scan(api, &capture).await,
        Commands::Save { capture, output } => handle_save(api, &capture, output).await,
        Commands::Suggest {
            capture,
            tool,
            selection,
            text,
        } => handle_suggest(api, &capture, &tool, selection, text).await,
        Commands::List {
            exposition,
            weave,
            tool,
        } => {
            let result = api
                .list_suggestions(&exposition, weave.as_deref(), tool.as_deref())
                .await?;
            print_result(&result);
            Ok(())
        }
        Commands::Delete {
            exposition,
            weave,
            tool,
            suggestion_id,
        } => {
            let result = api
                .delete_suggestion(&exposition, &weave, &tool, &suggestion_id)
                .await?;
            print!("{}", render_messages(&result.messages));
            Ok(())
        }
        Commands::Export { exposition, output } => {
            let result = api.export_exposition(&exposition).await?;
            print!("{}", render_messages(&result.messages));
            if let Some(document) = &result.document {
                write_document(document, output)?;
            }
            Ok(())
        }
        Commands::Import { file, into } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let result = api.import_document(&raw, into.as_deref()).await?;
            print!("{}", render_messages(&result.messages));
            if let Some(report) = &result.merge {
                print!("{}", render_merge(report));
            }
            Ok(())
        }
        Commands::Read { capture } => handle_read(api, &capture).await,
        Commands::Status => {
            let result = api.status().await?;
            print!("{}", render_status(&result.expositions));
            println!("data: {}", ctx.data_dir.display());
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn handle_scan(api: &MarginApi<FsBackend>, capture: &Path) -> anyhow::Result<()> {
    let mut session = api.open_page(load_capture(capture)?);
    let result = api.enhance_page(&mut session).await?;
    print_result(&result);
    Ok(())
}

async fn handle_save(
    api: &MarginApi<FsBackend>,
    capture: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut session = api.open_page(load_capture(capture)?);
    let result = api.save_page(&mut session).await?;
    print!("{}", render_messages(&result.messages));
    if let Some(document) = &result.document {
        write_document(document, output)?;
    }
    Ok(())
}

async fn handle_suggest(
    api: &MarginApi<FsBackend>,
    capture: &Path,
    tool_id: &str,
    selection: String,
    text: String,
) -> anyhow::Result<()> {
    let mut session = api.open_page(load_capture(capture)?);
    api.enhance_page(&mut session).await?;
    let result = api
        .add_suggestion(&mut session, tool_id, Selection::new(selection), text)
        .await?;
    print_result(&result);
    Ok(())
}

async fn handle_read(api: &MarginApi<FsBackend>, capture: &Path) -> anyhow::Result<()> {
    let mut session = api.open_page(load_capture(capture)?);
    api.enhance_page(&mut session).await?;
    let result = api.text_only_view(&mut session).await?;
    print!("{}", render_messages(&result.messages));
    if let Some(listing) = &result.listing {
        print!("{}", render_listing(listing));
    }
    Ok(())
}

fn print_result(result: &CmdResult) {
    print!("{}", render_messages(&result.messages));
    if let Some(weave) = &result.weave {
        print!("{}", render_weave(weave));
    }
    if !result.suggestions.is_empty() {
        print!("{}", render_suggestions(&result.suggestions));
    }
}

fn load_capture(path: &Path) -> anyhow::Result<MemoryPage> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read page capture {}", path.display()))?;
    let capture: PageCapture = serde_json::from_str(&raw)
        .with_context(|| format!("invalid page capture {}", path.display()))?;
    Ok(capture.into())
}

fn write_document(document: &ExportDocument, output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output
        .unwrap_or_else(|| PathBuf::from(export_file_name(&document.exposition.id, Utc::now())));
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn handle_config_command(
    action: Option<&ConfigCommands>,
    data_override: Option<&Path>,
) -> anyhow::Result<()> {
    let global_dir = match global_data_dir() {
        Ok(dir) => dir,
        Err(e) => data_override.map(Path::to_path_buf).ok_or(e)?,
    };
    let load_paths = config_search_paths(&global_dir, data_override);

    match action {
        None => {
            // Bare `margin config`: show all resolved values
            let config: MarginConfig = Clapfig::builder()
                .app_name("margin")
                .file_name(CONFIG_FILE_NAME)
                .search_paths(load_paths)
                .no_env()
                .strict(false)
                .load()
                .unwrap_or_default();

            let table = toml::Value::try_from(&config).map_err(|e| anyhow!(e.to_string()))?;
            if let toml::Value::Table(t) = table {
                for (k, v) in &t {
                    println!("{} = {}", k, format_toml_value(v));
                }
            }
            if config.highlight_selectors.is_none() {
                println!(
                    "# highlight_selectors = {:?} (default)",
                    config.highlight_selectors()
                );
            }
            Ok(())
        }
        Some(command) => {
            let result = run_config_action(command, &global_dir, data_override)?;
            println!("{}", result);
            Ok(())
        }
    }
}

/// Scope name under which `config set` writes.
const DATA_SCOPE: &str = "data";

fn run_config_action(
    command: &ConfigCommands,
    global_dir: &Path,
    data_override: Option<&Path>,
) -> anyhow::Result<ConfigResult> {
    let action = match command {
        ConfigCommands::Gen { output } => ConfigAction::Gen {
            output: output.clone(),
        },
        ConfigCommands::Get { key } => ConfigAction::Get {
            key: key.clone(),
            scope: None,
        },
        ConfigCommands::Set { key, value } => ConfigAction::Set {
            key: key.clone(),
            value: value.clone(),
            scope: Some(DATA_SCOPE.to_string()),
        },
    };
    // Writes go to the data directory in use
    let set_dir = data_override.unwrap_or(global_dir).to_path_buf();

    Clapfig::builder::<MarginConfig>()
        .app_name("margin")
        .file_name(CONFIG_FILE_NAME)
        .search_paths(config_search_paths(global_dir, data_override))
        .persist_scope(DATA_SCOPE, SearchPath::Path(set_dir))
        .no_env()
        .strict(false)
        .handle(&action)
        .map_err(|e| anyhow!(e.to_string()))
}

/// Format a TOML value for display.
fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => format!("\"{}\"", s),
        toml::Value::Array(a) => toml::to_string(a).unwrap_or_else(|_| format!("{a:?}")),
        other => other.to_string(),
    }
}
