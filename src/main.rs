use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buscador::config::AppConfig;
use buscador::dataset::load_articles;
use buscador::search::{Mode, SearchIndex};
use buscador::server::{self, AppState};

/// Local search over a collection of academic articles.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Dataset file: a JSON object or an array of article objects
    #[arg(long)]
    data: Option<String>,

    /// Address to serve the search page on
    #[arg(long)]
    addr: Option<String>,

    /// Mode preselected in the search page (tema, palabras, ambos)
    #[arg(long)]
    mode: Option<Mode>,

    /// Persist the effective settings to the user config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buscador=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("📚 Buscador académico");

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("⚠️  Ignoring unreadable config: {:#}", e);
        AppConfig::default()
    });
    if let Some(data) = cli.data {
        config.dataset_path = data;
    }
    if let Some(addr) = cli.addr {
        config.bind_addr = addr;
    }
    if let Some(mode) = cli.mode {
        config.default_mode = mode;
    }
    if cli.save_config {
        let path = config.save()?;
        tracing::info!("✅ Saved config to {}", path.display());
    }

    // No search UI without a dataset
    let articles = load_articles(&config.dataset_path).map_err(|e| {
        tracing::error!("❌ Could not load {}: {:#}", config.dataset_path, e);
        e
    })?;
    let index = SearchIndex::new(articles);

    let addr = config.socket_addr()?;
    let state = AppState::new(index, &config.dataset_path, config.default_mode);

    tracing::info!("✨ Ready! Open http://{} in your browser", addr);
    tracing::info!("Press Ctrl+C to stop");

    server::serve(addr, state)
        .await
        .context("Search server stopped")?;

    Ok(())
}
