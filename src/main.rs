use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use gsa_sync::config::Config;
use gsa_sync::content::{Entity, Node};
use gsa_sync::feed::Action;
use gsa_sync::storage::Database;
use gsa_sync::sync::{Dispatch, Synchronizer};
use gsa_sync::util::validate_http_url;

#[derive(Parser, Debug)]
#[command(
    name = "gsa-sync",
    about = "Push CMS content changes to a Google Search Appliance"
)]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "gsa-sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load nodes from a JSON array into the content store
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run the lifecycle hook for a stored node
    Notify {
        #[arg(value_enum)]
        event: LifecycleEvent,
        node_id: i64,
        /// Origin of the triggering request (defaults to site.origin)
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },
    /// Push every whitelisted node as one full feed
    FullSync {
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },
    /// Delete the whole data source from the appliance
    Purge,
    /// Print the feed a node would produce, without sending it
    Render {
        node_id: i64,
        /// Render a delete feed instead of an add feed
        #[arg(long)]
        delete: bool,
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LifecycleEvent {
    Created,
    Updated,
    Deleted,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Arc::new(
        Config::load(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?,
    );

    match args.command {
        Command::Import { file } => {
            let db = create_store(&config).await?;
            let count = import_nodes(&db, &file).await?;
            println!("Imported {} nodes into {}", count, config.database.display());
        }
        Command::Notify {
            event,
            node_id,
            origin,
        } => {
            let db = open_store(&config).await?;
            let sync = Synchronizer::new(config.clone()).context("Failed to set up sync")?;
            let origin = resolve_origin(&config, origin.as_deref())?;
            let node = load_node(&db, node_id).await?;
            let entity = Entity::Node(node);

            let dispatch = match event {
                LifecycleEvent::Created => sync.on_created(&entity, &origin).await,
                LifecycleEvent::Updated => sync.on_updated(&entity, &origin).await,
                LifecycleEvent::Deleted => sync.on_deleted(&entity, &origin).await,
            }
            .with_context(|| format!("Failed to push node {}", node_id))?;

            if matches!(event, LifecycleEvent::Deleted) {
                db.delete_node(node_id)
                    .await
                    .context("Failed to remove node from content store")?;
            }
            report(dispatch);
        }
        Command::FullSync { origin } => {
            let db = open_store(&config).await?;
            let sync = Synchronizer::new(config.clone()).context("Failed to set up sync")?;
            let origin = resolve_origin(&config, origin.as_deref())?;
            let dispatch = sync
                .full_sync(&db, &origin)
                .await
                .context("Full sync failed")?;
            report(dispatch);
        }
        Command::Purge => {
            let sync = Synchronizer::new(config.clone()).context("Failed to set up sync")?;
            let dispatch = sync.purge().await.context("Purge failed")?;
            report(dispatch);
        }
        Command::Render {
            node_id,
            delete,
            origin,
        } => {
            let db = open_store(&config).await?;
            let sync = Synchronizer::new(config.clone()).context("Failed to set up sync")?;
            let origin = resolve_origin(&config, origin.as_deref())?;
            let node = load_node(&db, node_id).await?;
            let action = if delete { Action::Delete } else { Action::Add };
            let xml = sync
                .render(&node, action, &origin)
                .with_context(|| format!("Failed to render node {}", node_id))?;
            println!("{}", xml);
        }
    }

    Ok(())
}

/// Opens the content store, creating it if needed. Only `import` does this.
async fn create_store(config: &Config) -> Result<Database> {
    let path = database_path(config)?;
    Database::open(path)
        .await
        .with_context(|| format!("Failed to open content store {}", path))
}

async fn open_store(config: &Config) -> Result<Database> {
    let path = database_path(config)?;
    Database::open_existing(path)
        .await
        .with_context(|| format!("Failed to open content store {}", path))
}

fn database_path(config: &Config) -> Result<&str> {
    config
        .database
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))
}

async fn load_node(db: &Database, node_id: i64) -> Result<Node> {
    db.get_node(node_id)
        .await
        .context("Failed to read content store")?
        .ok_or_else(|| anyhow::anyhow!("Node {} is not in the content store", node_id))
}

async fn import_nodes(db: &Database, file: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;
    let nodes: Vec<Node> = serde_json::from_str(&content)
        .with_context(|| format!("Import file is not a JSON array of nodes: {}", file.display()))?;
    db.upsert_nodes(&nodes)
        .await
        .context("Failed to store imported nodes")
}

fn resolve_origin(config: &Config, origin: Option<&str>) -> Result<Url> {
    match origin {
        Some(origin) => {
            validate_http_url(origin).with_context(|| format!("Invalid --origin: {}", origin))
        }
        None => Ok(config.site_origin()?),
    }
}

fn report(dispatch: Dispatch) {
    match dispatch {
        Dispatch::Skipped => println!("Not eligible for the search feed; nothing sent."),
        Dispatch::Pushed { feed_type, records } => {
            println!("Sent {} feed with {} record(s).", feed_type, records)
        }
    }
}
