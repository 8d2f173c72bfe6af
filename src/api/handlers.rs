use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;

use super::{ApiError, AppState};
use crate::bestsellers::{BestsellerList, BestsellerQuery};
use crate::checkout::{self, CheckoutRequest, ConnectionStatus, OrderConfirmation, PaymentIntent, PaymentIntentRequest};
use crate::domain::Product;
use crate::query::{BrandList, CatalogStats, CategoryList, ProductList, ProductQuery, RankingsInfo};
use crate::shipping::{self, ShippingQuote};

pub async fn health(State(s): State<AppState>) -> Result<Json<Value>, ApiError> {
    let view = s.catalog.view().await?;
    let displayable = view.products().iter().filter(|p| p.is_listable()).count();
    Ok(Json(json!({
        "status": "healthy",
        "service": "homeverse-storefront",
        "products_loaded": view.products().len(),
        "displayable": displayable,
    })))
}

pub async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> Result<Json<ProductList>, ApiError> {
    Ok(Json(s.catalog.list_products(&q).await?))
}

pub async fn get_product(State(s): State<AppState>, Path(sku): Path<String>) -> Result<Json<Product>, ApiError> {
    s.catalog
        .get_product(&sku)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

pub async fn list_brands(State(s): State<AppState>) -> Result<Json<BrandList>, ApiError> {
    Ok(Json(s.catalog.list_brands().await?))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<CategoryList>, ApiError> {
    Ok(Json(s.catalog.list_categories().await?))
}

pub async fn stats(State(s): State<AppState>) -> Result<Json<CatalogStats>, ApiError> {
    Ok(Json(s.catalog.stats().await?))
}

pub async fn bestsellers(State(s): State<AppState>, Query(q): Query<BestsellerQuery>) -> Result<Json<BestsellerList>, ApiError> {
    Ok(Json(s.catalog.bestsellers(&q).await?))
}

pub async fn rankings_info(State(s): State<AppState>) -> Result<Json<RankingsInfo>, ApiError> {
    Ok(Json(s.catalog.rankings_info().await?))
}

#[derive(Debug, Deserialize)]
pub struct ShippingParams {
    pub order_total: Option<String>,
}

/// An unparseable total quotes as zero.
pub async fn shipping_options(Query(p): Query<ShippingParams>) -> Json<ShippingQuote> {
    let total = p
        .order_total
        .as_deref()
        .and_then(|raw| Decimal::from_str(raw.trim()).ok())
        .unwrap_or(Decimal::ZERO);
    Json(shipping::quote(total))
}

pub async fn zoho_test(State(s): State<AppState>) -> Result<Json<ConnectionStatus>, ApiError> {
    let checkout = s.checkout()?;
    Ok(Json(ConnectionStatus::check(checkout.inventory()).await))
}

pub async fn create_payment_intent(
    State(s): State<AppState>,
    body: Result<Json<PaymentIntentRequest>, JsonRejection>,
) -> Result<Json<PaymentIntent>, ApiError> {
    let Json(r) = body?;
    let payments = s.payments()?;
    Ok(Json(checkout::create_payment_intent(payments, &r).await?))
}

pub async fn place_order(
    State(s): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<OrderConfirmation>, ApiError> {
    let Json(r) = body?;
    let checkout = s.checkout()?;
    let confirmation = checkout.place_order(&r).await?;
    tracing::info!(order_number = %confirmation.order_number, total = %confirmation.total, "order placed");
    Ok(Json(confirmation))
}
