mod batch;
mod catalog;
mod collect;
mod show;

use anyhow::Context;
use clap::{Parser, Subcommand};
use supplink_core::{AppConfig, Catalog};
use supplink_db::PgLinkStore;
use supplink_search::{CollectSettings, LinkCollector, SerpApiClient};
use tracing_subscriber::EnvFilter;

use crate::batch::BatchArgs;
use crate::catalog::CatalogCommands;

#[derive(Debug, Parser)]
#[command(name = "supplink")]
#[command(about = "Find and store product links for supplements on approved brand sites")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect links for one item and store them
    Collect {
        item: String,

        /// Maximum links from any one brand
        #[arg(long, value_parser = parse_positive)]
        per_brand_cap: Option<usize>,

        /// Maximum links overall
        #[arg(long, value_parser = parse_positive)]
        total_cap: Option<usize>,

        /// Search and print, but do not write to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Collect links for every catalog item (or the given items)
    Batch(BatchArgs),
    /// Print the stored links for an item
    Show { item: String },
    /// Print the search queries that would be sent for a brand and item
    Queries { brand: String, item: String },
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("supplink: no command given; run `supplink --help` for usage");
        return Ok(());
    };

    let config = supplink_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, catalog = %config.catalog_path.display(), "configuration loaded");

    match command {
        Commands::Collect {
            item,
            per_brand_cap,
            total_cap,
            dry_run,
        } => {
            let caps = Caps::resolve(&config, per_brand_cap, total_cap);
            collect::run_collect(&config, &item, caps, dry_run).await
        }
        Commands::Batch(args) => batch::run_batch(&config, args).await,
        Commands::Show { item } => show::run_show(&config, &item).await,
        Commands::Queries { brand, item } => catalog::run_queries(&config, &brand, &item),
        Commands::Catalog { command } => catalog::run_catalog_command(&config, &command),
        Commands::Db { command } => run_db_command(&config, &command).await,
    }
}

/// Per-call collection caps after applying command-line overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caps {
    pub per_brand: usize,
    pub total: usize,
}

impl Caps {
    pub(crate) fn resolve(
        config: &AppConfig,
        per_brand: Option<usize>,
        total: Option<usize>,
    ) -> Self {
        Self {
            per_brand: per_brand.unwrap_or(config.per_brand_cap),
            total: total.unwrap_or(config.total_cap),
        }
    }
}

pub(crate) fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

pub(crate) fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    supplink_core::load_catalog(&config.catalog_path)
        .with_context(|| format!("loading catalog {}", config.catalog_path.display()))
}

pub(crate) fn build_collector(
    config: &AppConfig,
    catalog: &Catalog,
) -> anyhow::Result<LinkCollector<SerpApiClient>> {
    let client = SerpApiClient::from_config(config).context("building search client")?;
    Ok(LinkCollector::from_catalog(
        client,
        catalog,
        CollectSettings::from_config(config),
    ))
}

pub(crate) async fn connect_pool(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config.require_database_url()?;
    let pool_config = supplink_db::PoolConfig::from_app_config(config);
    supplink_db::connect_pool(database_url, pool_config)
        .await
        .context("connecting to database")
}

pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<PgLinkStore> {
    Ok(PgLinkStore::new(connect_pool(config).await?))
}

async fn run_db_command(config: &AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = connect_pool(config).await?;
    match command {
        DbCommands::Migrate => {
            let applied = supplink_db::run_migrations(&pool).await?;
            if applied.is_empty() {
                println!("database is up to date");
            } else {
                println!("applied {} migration(s): {applied:?}", applied.len());
            }
        }
        DbCommands::Ping => {
            supplink_db::ping(&pool).await?;
            match supplink_db::count_product_links(&pool).await {
                Ok(stored) => println!("database ok ({stored} item(s) with stored links)"),
                Err(e) => {
                    tracing::warn!(error = %e, "product_links not readable; run `supplink db migrate`");
                    println!("database ok");
                }
            }
        }
    }
    Ok(())
}

/// Marks a collection run failed, logging rather than returning any error
/// from the update itself.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = supplink_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}
