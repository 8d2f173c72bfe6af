//! Home & Verse Storefront
//!
//! Consumer storefront over a catalog synchronised from Zoho Inventory.
//!
//! ## Features
//! - Catalog import: brand allow-list, consumer filtering, retail pricing,
//!   keyword categorisation, image download
//! - Catalog query API with popularity and variety sorting
//! - Popularity ranking generator
//! - Bestseller list from recent Zoho sales orders
//! - Checkout with server-side pricing, Stripe payment intents and Zoho
//!   sales orders

pub mod api;
pub mod bestsellers;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod http;
pub mod query;
pub mod ranking;
pub mod shipping;
pub mod stripe;
pub mod zoho;

use thiserror::Error;

pub use catalog::{CatalogImporter, CatalogStore, ImportOptions, ImportSummary};
pub use checkout::{CheckoutOrchestrator, CheckoutRequest, OrderConfirmation};
pub use config::Config;
pub use domain::{Money, Product, Sku};
pub use query::{CatalogService, ProductQuery};

// =============================================================================
// Error Types
// =============================================================================

/// Failures reading or writing the persisted JSON artifacts.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to an external system (inventory, payments).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("authentication with {service} failed: {message}")]
    Auth { service: &'static str, message: String },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl GatewayError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
