//! HTTP surface: catalog queries, shipping quotes and checkout.

mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::checkout::{CheckoutOrchestrator, PaymentGateway};
use crate::query::CatalogService;
use crate::GatewayError;

/// Checkout and payments are optional so the catalog keeps serving when
/// Zoho or Stripe credentials are absent.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub checkout: Option<CheckoutOrchestrator>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
}

impl AppState {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog, checkout: None, payments: None }
    }

    pub fn with_checkout(mut self, checkout: CheckoutOrchestrator) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = Some(payments);
        self
    }

    fn checkout(&self) -> Result<&CheckoutOrchestrator, ApiError> {
        self.checkout
            .as_ref()
            .ok_or_else(|| GatewayError::NotConfigured { service: "Zoho" }.into())
    }

    fn payments(&self) -> Result<&dyn PaymentGateway, ApiError> {
        self.payments
            .as_deref()
            .ok_or_else(|| GatewayError::NotConfigured { service: "Stripe" }.into())
    }
}

pub fn router(state: AppState) -> Router {
    let images = ServeDir::new(state.catalog.store().images_dir());
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:sku", get(handlers::get_product))
        .route("/api/brands", get(handlers::list_brands))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/stats", get(handlers::stats))
        .route("/api/rankings/info", get(handlers::rankings_info))
        .route("/api/bestsellers", get(handlers::bestsellers))
        .route("/api/shipping", get(handlers::shipping_options))
        .route("/api/zoho/test", get(handlers::zoho_test))
        .route("/api/checkout/create-payment-intent", post(handlers::create_payment_intent))
        .route("/api/checkout/place-order", post(handlers::place_order))
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
