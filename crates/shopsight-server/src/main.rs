use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopsight_core::FaqModel;
use shopsight_scrape::{OpenAiCompatModel, ScrapeConfig, Scraper};
use shopsight_server::api::{self, AppState};
use shopsight_server::store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shopsight")]
#[command(about = "Storefront insight extraction (HTTP API and one-shot CLI)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API backed by a SQLite database.
    Serve(ServeCmd),
    /// Extract one storefront and print the record as JSON.
    Scrape(ScrapeCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Address to listen on.
    #[arg(long, env = "SHOPSIGHT_BIND", default_value = "127.0.0.1:8080")]
    bind: String,
    /// SQLite database path (created if missing).
    #[arg(long, env = "SHOPSIGHT_DB", default_value = "shopsight.db")]
    db: PathBuf,
    /// Use the configured chat-completions model for FAQ extraction
    /// instead of the built-in heuristics. Requires SHOPSIGHT_MODEL_*.
    #[arg(long, env = "SHOPSIGHT_MODEL_FAQS", default_value_t = false)]
    model_faqs: bool,
}

#[derive(clap::Args, Debug)]
struct ScrapeCmd {
    /// Storefront address. A bare domain is assumed to be https.
    url: String,
    /// Use the configured chat-completions model for FAQ extraction.
    #[arg(long, env = "SHOPSIGHT_MODEL_FAQS", default_value_t = false)]
    model_faqs: bool,
    /// Pretty-print the JSON record.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn faq_model(enabled: bool) -> Result<Option<Arc<dyn FaqModel>>> {
    if !enabled {
        return Ok(None);
    }
    let model = OpenAiCompatModel::from_env(reqwest::Client::new())
        .context("model-assisted FAQ extraction")?;
    Ok(Some(Arc::new(model)))
}

async fn serve(cmd: ServeCmd) -> Result<()> {
    let store = SqliteStore::connect(&cmd.db)
        .await
        .with_context(|| format!("opening database {}", cmd.db.display()))?;
    let state = AppState {
        store: Arc::new(store),
        faq_model: faq_model(cmd.model_faqs)?,
    };

    let listener = tokio::net::TcpListener::bind(&cmd.bind)
        .await
        .with_context(|| format!("binding {}", cmd.bind))?;
    info!(addr = %cmd.bind, db = %cmd.db.display(), "listening");
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

async fn scrape(cmd: ScrapeCmd) -> Result<()> {
    let config = ScrapeConfig {
        faq_model: faq_model(cmd.model_faqs)?,
    };
    let insights = Scraper::with_config(&cmd.url, config)?.run().await;
    let rendered = if cmd.pretty {
        serde_json::to_string_pretty(&insights)?
    } else {
        serde_json::to_string(&insights)?
    };
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Serve(cmd) => serve(cmd).await,
        Commands::Scrape(cmd) => scrape(cmd).await,
    }
}
