//! Home & Verse Storefront - catalog import, catalog API and checkout

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homeverse_storefront::api::{self, AppState};
use homeverse_storefront::bestsellers::{BestsellerGenerator, BestsellerOptions, DEFAULT_WINDOW_DAYS};
use homeverse_storefront::checkout::CheckoutOrchestrator;
use homeverse_storefront::config::{Config, ZohoConfig};
use homeverse_storefront::http::{HttpClient, RetryPolicy};
use homeverse_storefront::ranking::{generate_rankings, MockPopularity};
use homeverse_storefront::stripe::StripeClient;
use homeverse_storefront::zoho::{RefreshTokenProvider, ZohoClient};
use homeverse_storefront::{CatalogImporter, CatalogService, CatalogStore, ImportOptions};

#[derive(Parser)]
#[command(name = "homeverse-storefront", version, about = "Home & Verse storefront backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the catalog and checkout API (default)
    Serve,
    /// Import the catalog from Zoho Inventory
    Import {
        /// Only keep items with stock on hand
        #[arg(long)]
        in_stock_only: bool,
        /// Do not download product images
        #[arg(long)]
        skip_images: bool,
    },
    /// Regenerate popularity rankings from the current catalog
    Rank,
    /// Rebuild the bestseller list from recent Zoho sales orders
    Bestsellers {
        /// Trailing window in days
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = CatalogStore::new(&config.data_dir);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, store).await,
        Command::Import { in_stock_only, skip_images } => {
            let options = ImportOptions { in_stock_only, skip_images, ..ImportOptions::default() };
            import(&config, store, options).await
        }
        Command::Rank => rank(store).await,
        Command::Bestsellers { days } => {
            let options = BestsellerOptions { window_days: days, ..BestsellerOptions::default() };
            bestsellers(&config, store, options).await
        }
    }
}

fn zoho_client(zoho: &ZohoConfig, http: &HttpClient) -> ZohoClient {
    let tokens = RefreshTokenProvider::new(http.clone(), &zoho.accounts_url, zoho.credentials.clone());
    ZohoClient::new(http.clone(), &zoho.api_url, zoho.organization_id.clone(), Arc::new(tokens))
}

async fn serve(config: &Config, store: CatalogStore) -> Result<()> {
    store.ensure_dirs().await?;
    let http = HttpClient::new(&RetryPolicy::default())?;
    let catalog = CatalogService::new(store);
    let mut state = AppState::new(catalog.clone());

    match config.zoho() {
        Ok(zoho) => {
            let client = zoho_client(&zoho, &http);
            state = state.with_checkout(CheckoutOrchestrator::new(catalog, Arc::new(client)));
        }
        Err(e) => tracing::warn!(error = %e, "checkout disabled"),
    }
    match config.stripe_secret_key() {
        Ok(key) => state = state.with_payments(Arc::new(StripeClient::new(http.clone(), key))),
        Err(e) => tracing::warn!(error = %e, "payments disabled"),
    }

    let app = api::router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 Home & Verse storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

async fn import(config: &Config, store: CatalogStore, options: ImportOptions) -> Result<()> {
    let zoho = config.zoho().context("catalog import needs Zoho credentials")?;
    let http = HttpClient::new(&RetryPolicy::default())?;
    let importer = CatalogImporter::new(zoho_client(&zoho, &http), store, options);
    let summary = importer.run().await?;
    summary.log();
    Ok(())
}

async fn rank(store: CatalogStore) -> Result<()> {
    let products = store.load_products().await?;
    let rankings = generate_rankings(&products, &MockPopularity::default(), Utc::now());
    store.save_rankings(&rankings).await?;
    tracing::info!(
        products = rankings.product_count,
        algorithm = %rankings.algorithm_version,
        path = %store.rankings_path().display(),
        "rankings written"
    );
    Ok(())
}

async fn bestsellers(config: &Config, store: CatalogStore, options: BestsellerOptions) -> Result<()> {
    let zoho = config.zoho().context("bestsellers need Zoho credentials")?;
    let http = HttpClient::new(&RetryPolicy::default())?;
    let generator = BestsellerGenerator::new(zoho_client(&zoho, &http), store, options);
    generator.run(Utc::now()).await?;
    Ok(())
}
