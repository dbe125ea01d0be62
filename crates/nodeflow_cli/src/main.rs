//! Command-line driver for `nodeflow_core`.
//!
//! # Responsibility
//! - Open a store file, boot a session and run one command against it.
//! - Double as a linkage smoke probe for the core crate.

use clap::{Parser, Subcommand};
use nodeflow_core::db::open_db;
use nodeflow_core::{
    find_template, init_logging, page_to_markdown, search, EngineConfig, LegacyJsonFile,
    LegacySource, LogLevel, NoRemote, NodeId, RemoteStore, Session, SqliteRemoteStore,
    SqliteWorkspaceRepository, TEMPLATES,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "nodeflow", version, about = "Radial note maps, local-first")]
struct Cli {
    /// Local store file.
    #[arg(long, default_value = "nodeflow.db")]
    db: PathBuf,
    /// SQLite file acting as the remote authority.
    #[arg(long)]
    remote_db: Option<PathBuf>,
    /// Pre-SQLite JSON workspace to import on first boot.
    #[arg(long)]
    legacy: Option<PathBuf>,
    /// JSON engine config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Skip the remote even when configured.
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print pages, node counts and sync status.
    Summary,
    /// Print the active page as markdown.
    Markdown,
    /// Add a node under `parent` on the active page.
    Add {
        #[arg(long)]
        parent: NodeId,
        label: String,
    },
    /// Delete a node and its subtree.
    Delete { id: NodeId },
    /// List built-in page templates.
    Templates,
    /// Add a page from a template.
    Template { name: String },
    /// Search labels and notes on every page.
    Search { query: String },
    /// Print the workspace snapshot as JSON.
    Export,
    /// Replace the workspace with a JSON snapshot file.
    Import { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nodeflow: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = &cli.log_dir {
        init_logging(LogLevel::parse(&cli.log_level)?, dir)?;
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let conn = open_db(&cli.db)?;
    let repo = SqliteWorkspaceRepository::try_new(&conn, config.workspace_key.as_str())?
        .with_history_capacity(config.history_capacity);

    let remote_conn = match &cli.remote_db {
        Some(path) if !cli.offline => Some(open_db(path)?),
        _ => None,
    };
    let sqlite_remote = remote_conn
        .as_ref()
        .map(SqliteRemoteStore::try_new)
        .transpose()?;
    let remote: &dyn RemoteStore = match &sqlite_remote {
        Some(store) => store,
        None => &NoRemote,
    };

    let legacy = cli.legacy.clone().map(LegacyJsonFile::new);
    let mut session = Session::new(config, repo, remote, Instant::now());
    let source = session.boot(legacy.as_ref().map(|file| file as &dyn LegacySource));

    match cli.command {
        Command::Summary => {
            println!("nodeflow_core version={}", nodeflow_core::core_version());
            println!("boot_source={}", source.as_str());
            let workspace = session.workspace();
            for page in workspace.pages() {
                let marker = if Some(page.id) == workspace.active_page_id() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} page {} \"{}\" nodes={} edges={}",
                    page.id,
                    page.name,
                    page.nodes.len(),
                    page.edges.len()
                );
            }
            println!("sync_status={}", session.sync_status().as_str());
        }
        Command::Markdown => {
            if let Some(page) = session.workspace().active_page() {
                print!("{}", page_to_markdown(page));
            }
        }
        Command::Add { parent, label } => {
            let workspace = session.workspace_mut();
            let Some(id) = workspace.add_child(parent) else {
                return Err(format!("no node {parent} on the active page").into());
            };
            workspace.set_label(id, label);
            session.relayout();
            session.mark_dirty(true, Instant::now());
            println!("added node {id}");
        }
        Command::Delete { id } => {
            let removed = session.workspace_mut().delete_node(id);
            if removed.is_empty() {
                println!("nothing deleted");
            } else {
                session.relayout();
                session.mark_dirty(true, Instant::now());
                println!("deleted {} nodes", removed.len());
            }
        }
        Command::Templates => {
            for template in TEMPLATES {
                println!("{:<20} {}", template.name, template.description);
            }
        }
        Command::Template { name } => {
            let template =
                find_template(&name).ok_or_else(|| format!("unknown template `{name}`"))?;
            let page_id = session
                .workspace_mut()
                .add_page_from_template(template, nodeflow_core::Point::ORIGIN);
            session.relayout();
            session.mark_dirty(true, Instant::now());
            println!("added page {page_id}");
        }
        Command::Search { query } => {
            for hit in search(session.workspace(), &query)? {
                match &hit.preview {
                    Some(preview) => println!(
                        "{}#{} {} [{}] {preview}",
                        hit.page_id, hit.node_id, hit.label, hit.page_name
                    ),
                    None => println!(
                        "{}#{} {} [{}]",
                        hit.page_id, hit.node_id, hit.label, hit.page_name
                    ),
                }
            }
        }
        Command::Export => println!("{}", session.export_json()?),
        Command::Import { file } => {
            let text = std::fs::read_to_string(file)?;
            let outcome = session.import_json(&text, Instant::now())?;
            println!(
                "imported {} pages, sync={outcome:?}",
                session.workspace().pages().len()
            );
        }
    }
    Ok(())
}
