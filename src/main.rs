use std::sync::Arc;

use clap::{Parser, Subcommand};

use civium::cmd::config::{self as config_cmd, ConfigArgs};
use civium::cmd::derive::{self as derive_cmd, DeriveArgs};
use civium::cmd::ticket::{self, TicketArgs};
use civium::config::{AppConfig, StoreConfig};
use civium::context::AppContext;
use civium::error::AppResult;
use civium::infra::file::FileTicketStore;
use civium::infra::memory::InMemoryTicketStore;
use civium::infra::rest::RestTicketStore;
use civium::logging;
use civium::services::TicketStore;

#[derive(Parser)]
#[command(name = "civium", author, version, about = "Municipal citizen request routing")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive department, unit, SLA and urgency for a category and description.
    Derive(DeriveArgs),
    /// List the active routing rules.
    Rules,
    /// Create and manage tickets.
    Ticket(TicketArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    if let Err(error) = run(cli).await {
        tracing::error!("{error}");
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let cwd = std::env::current_dir()?;
    let config = AppConfig::load(&cwd)?;
    tracing::debug!(rules = config.rules.len(), store = ?config.store, "configuration loaded");

    let store = build_store(&config.store);
    let context = AppContext::new(config, store);

    match cli.command {
        Commands::Derive(args) => derive_cmd::run_derive(&context, args),
        Commands::Rules => derive_cmd::run_rules(&context),
        Commands::Ticket(args) => ticket::run(&context, args.command).await,
        Commands::Config(args) => config_cmd::run(&context.config, args.command),
    }
}

fn build_store(store: &StoreConfig) -> Arc<dyn TicketStore> {
    match store {
        StoreConfig::File { path } => Arc::new(FileTicketStore::new(path.clone())),
        StoreConfig::Rest { base_url, api_key } => {
            Arc::new(RestTicketStore::new(base_url.clone(), api_key.clone()))
        }
        StoreConfig::Memory => {
            tracing::warn!("memory store selected; tickets are discarded on exit");
            Arc::new(InMemoryTicketStore::new())
        }
    }
}
