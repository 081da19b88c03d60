use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use corpusdesk::config::Config;
use corpusdesk::logging::{self, LogLevel};
use corpusdesk::query::{self, FilterTable, InMemoryTable, Row};
use corpusdesk::window::{AddOutcome, Arrangement, RestoreOutcome, UrlQuery, Viewport, WindowId, WindowRegistry};
use serde_json::{Value, json};
use tracing::{debug, error};

/// Query-bar and window-state tooling for the corpus workspace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum, global = true)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Viewport used for layout and percentage conversion, e.g. 1600x900
    #[arg(long = "viewport", value_name = "WxH", global = true)]
    viewport: Option<Viewport>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search-bar query tools
    #[command(subcommand)]
    Query(QueryCommand),
    /// Window-state tools operating on URL parameters
    #[command(subcommand)]
    Window(WindowCommand),
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Print the parsed query and the column filters it compiles to
    Parse { text: String },
    /// Print whether CANDIDATE is already part of OUTER
    Contains { outer: String, candidate: String },
    /// Print the chip labels shown for a query
    Chips { text: String },
    /// Print CURRENT with ADDITION appended as an alternative
    Extend { current: String, addition: String },
    /// Print the rows of a JSON file that pass the query
    Filter {
        text: String,
        /// JSON array of objects; values are strings or arrays of strings
        #[arg(long = "rows", value_name = "FILE")]
        rows: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum WindowCommand {
    /// Open a window from a descriptor and print the new URL state
    Open {
        #[arg(long = "state", default_value = "")]
        state: String,
        /// {"targetType": ..., "params": {...}}
        descriptor: String,
    },
    /// Close a window by id or position and print the new URL state
    Close {
        #[arg(long = "state", default_value = "")]
        state: String,
        window: String,
    },
    /// Change the arrangement and print the new URL state
    Arrange {
        #[arg(long = "state", default_value = "")]
        state: String,
        mode: Arrangement,
    },
    /// List the windows stored in a URL state
    Show {
        #[arg(long = "state", default_value = "")]
        state: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let log_path = cwd.join(logging::LOG_FILE.clone());
    let level = args.logging.map(tracing::Level::from);
    if args.logging.is_some() {
        logging::init_with(Some(log_path), level)?;
    }

    let cfg = match Config::from_path(args.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(color_eyre::eyre::eyre!("failed to load config: {e}"));
        }
    };
    debug!("Loaded config: {:?}", cfg.workspace);

    let output = run(&args, &cfg).map_err(|e| color_eyre::eyre::eyre!("{e:#}"))?;
    println!("{output}");
    Ok(())
}

fn run(args: &Args, cfg: &Config) -> anyhow::Result<String> {
    match &args.command {
        Command::Query(cmd) => run_query(cmd),
        Command::Window(cmd) => {
            let viewport = args.viewport.unwrap_or(cfg.workspace.default_viewport);
            run_window(cmd, cfg, viewport)
        }
    }
}

fn run_query(cmd: &QueryCommand) -> anyhow::Result<String> {
    let out = match cmd {
        QueryCommand::Parse { text } => {
            let node = query::parse(text)?;
            let entries = query::compile(&node);
            serde_json::to_string_pretty(&json!({
                "query": node.to_string(),
                "ast": node,
                "filters": entries,
            }))?
        }
        QueryCommand::Contains { outer, candidate } => query::is_in_query(outer, candidate).to_string(),
        QueryCommand::Chips { text } => query::summarize(text)?.join("\n"),
        QueryCommand::Extend { current, addition } => query::extend_query(current, addition),
        QueryCommand::Filter { text, rows } => {
            let raw = fs::read_to_string(rows).with_context(|| format!("reading {}", rows.display()))?;
            let value: Value = serde_json::from_str(&raw)?;
            let rows = rows_from_json(&value)?;
            let columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
            let mut table = InMemoryTable::new(columns.into_iter().cloned());
            let entries = query::apply_query(&mut table, text)?;
            debug!("Applied {} filters to {} columns", entries.len(), table.column_ids().count());
            for entry in entries.iter().filter(|e| !table.has_column(&e.column)) {
                eprintln!("warning: no column named '{}'", entry.column);
            }
            let matched = table.filter_rows(&rows);
            serde_json::to_string_pretty(&matched)?
        }
    };
    Ok(out)
}

fn rows_from_json(value: &Value) -> anyhow::Result<Vec<Row>> {
    let Value::Array(items) = value else {
        bail!("rows file must contain a JSON array");
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let Value::Object(map) = item else {
                bail!("row {index} is not an object");
            };
            let row: Row = map
                .iter()
                .map(|(column, value)| (column.clone(), cell_values(value)))
                .collect();
            Ok(row)
        })
        .collect()
}

fn cell_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(cell_values).collect(),
        other => vec![other.to_string()],
    }
}

fn restored_registry(cfg: &Config, viewport: Viewport, state: &str) -> anyhow::Result<WindowRegistry> {
    let mut registry = WindowRegistry::new(&cfg.workspace, viewport);
    match registry.restore(&UrlQuery::parse(state)) {
        RestoreOutcome::Fallback(e) => bail!("could not restore state: {e}"),
        RestoreOutcome::Restored { rejected, .. } if rejected > 0 => {
            eprintln!("warning: {rejected} stored windows were rejected");
        }
        _ => {}
    }
    Ok(registry)
}

fn resolve_window(registry: &WindowRegistry, key: &str) -> anyhow::Result<WindowId> {
    if let Ok(index) = key.parse::<usize>() {
        return registry
            .windows()
            .get(index)
            .map(|w| w.id.clone())
            .with_context(|| format!("no window at position {index}"));
    }
    let id: WindowId = key.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    if registry.get(&id).is_none() {
        bail!("no window with id {id}");
    }
    Ok(id)
}

fn run_window(cmd: &WindowCommand, cfg: &Config, viewport: Viewport) -> anyhow::Result<String> {
    let registry = match cmd {
        WindowCommand::Open { state, descriptor } => {
            let mut registry = restored_registry(cfg, viewport, state)?;
            let value: Value = serde_json::from_str(descriptor).context("descriptor is not valid JSON")?;
            if let AddOutcome::Rejected(e) = registry.add_window_value(&value) {
                bail!(e);
            }
            registry
        }
        WindowCommand::Close { state, window } => {
            let mut registry = restored_registry(cfg, viewport, state)?;
            let id = resolve_window(&registry, window)?;
            registry.remove_window(&id);
            registry
        }
        WindowCommand::Arrange { state, mode } => {
            let mut registry = restored_registry(cfg, viewport, state)?;
            registry.set_arrangement(*mode);
            registry
        }
        WindowCommand::Show { state } => {
            let registry = restored_registry(cfg, viewport, state)?;
            let mut lines = vec![format!("arrangement: {}", registry.arrangement())];
            for (index, w) in registry.windows().iter().enumerate() {
                let g = w.geometry;
                lines.push(format!(
                    "{index}: {} [{}] {}x{}+{}+{} z={}{}",
                    w.title,
                    w.target_type(),
                    g.width,
                    g.height,
                    g.x,
                    g.y,
                    g.z,
                    if w.maximized { " maximized" } else { "" }
                ));
            }
            return Ok(lines.join("\n"));
        }
    };
    Ok(registry.url_state().to_query_string())
}
