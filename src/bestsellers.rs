//! Bestsellers from recent sales orders.
//!
//! Sales orders in a trailing window are tallied per SKU, ranked by units
//! sold and joined to the catalog. Only products the catalog lists with an
//! image make the published list.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::CatalogStore;
use crate::domain::Product;
use crate::query::parse_flag;
use crate::{GatewayError, StoreError};

pub const DEFAULT_WINDOW_DAYS: u32 = 90;
pub const DEFAULT_LIMIT: usize = 50;

/// Orders in these states never shipped anything.
const SKIPPED_STATUSES: &[&str] = &["draft", "void", "cancelled"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: u32,
}

impl DateRange {
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Self {
        let end = now.date_naive();
        Self { start: end - chrono::Duration::days(i64::from(days)), end, days }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SalesOrderSummary {
    pub salesorder_id: String,
    #[serde(default)]
    pub order_status: String,
}

impl SalesOrderSummary {
    pub fn counts_as_sale(&self) -> bool {
        let status = self.order_status.trim().to_ascii_lowercase();
        !self.salesorder_id.is_empty() && !SKIPPED_STATUSES.contains(&status.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SalesOrdersPage {
    pub orders: Vec<SalesOrderSummary>,
    pub has_more_page: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SoldLine {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub item_total: Decimal,
}

/// Sales history as the generator needs it.
#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn fetch_sales_orders_page(&self, window: &DateRange, page: u32, per_page: u32) -> Result<SalesOrdersPage, GatewayError>;

    async fn fetch_sales_order_lines(&self, salesorder_id: &str) -> Result<Vec<SoldLine>, GatewayError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSales {
    pub sku: String,
    pub item_id: String,
    pub name: String,
    pub quantity_sold: Decimal,
    pub revenue: Decimal,
    /// Line items, not distinct orders.
    pub order_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SalesTally {
    pub items: BTreeMap<String, ItemSales>,
    pub orders_processed: usize,
}

impl SalesTally {
    pub fn record_order(&mut self, lines: &[SoldLine]) {
        self.orders_processed += 1;
        for line in lines {
            let sku = line.sku.trim();
            if sku.is_empty() {
                continue;
            }
            let entry = self
                .items
                .entry(sku.to_string())
                .or_insert_with(|| ItemSales { sku: sku.to_string(), ..ItemSales::default() });
            entry.quantity_sold += line.quantity;
            entry.revenue += line.item_total;
            entry.order_count += 1;
            entry.name = line.name.clone();
            entry.item_id = line.item_id.clone();
        }
    }

    /// Takes the `top` SKUs by units sold (ties by SKU), then keeps the ones
    /// the catalog lists with an image.
    pub fn select(&self, catalog: &[Product], top: usize) -> Vec<Bestseller> {
        let by_sku: HashMap<&str, &Product> = catalog.iter().map(|p| (p.sku.as_str(), p)).collect();
        let mut ranked: Vec<&ItemSales> = self.items.values().collect();
        ranked.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
        ranked
            .into_iter()
            .take(top)
            .filter_map(|sales| {
                let product = by_sku.get(sales.sku.as_str()).filter(|p| p.has_image)?;
                Some(Bestseller {
                    sku: sales.sku.clone(),
                    name: if sales.name.is_empty() { product.name.clone() } else { sales.name.clone() },
                    quantity_sold: sales.quantity_sold.trunc().to_u64().unwrap_or(0),
                    revenue: sales.revenue.round_dp(2),
                    order_count: sales.order_count,
                    brand: product.brand.clone(),
                    price: product.price,
                    categories: product.categories.iter().cloned().collect(),
                    has_image: product.has_image,
                    image_url: product.image_url.clone(),
                    in_stock: product.in_stock,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bestseller {
    pub sku: String,
    pub name: String,
    pub quantity_sold: u64,
    pub revenue: Decimal,
    pub order_count: u32,
    pub brand: String,
    pub price: Decimal,
    pub categories: Vec<String>,
    pub has_image: bool,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestsellerStats {
    pub orders_processed: usize,
    pub unique_items_sold: usize,
    pub bestsellers_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestsellersFile {
    pub bestsellers: Vec<Bestseller>,
    pub generated_at: DateTime<Utc>,
    pub date_range: DateRange,
    pub stats: BestsellerStats,
}

#[derive(Error, Debug)]
pub enum BestsellerError {
    #[error("sales order fetch failed on page {page}: {source}")]
    Connectivity {
        page: u32,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct BestsellerOptions {
    pub window_days: u32,
    /// Cut taken before the catalog join.
    pub top: usize,
    pub page_size: u32,
    pub max_pages: u32,
    pub page_delay: Duration,
    pub order_delay: Duration,
}

impl Default for BestsellerOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            top: 50,
            page_size: 200,
            max_pages: 500,
            page_delay: Duration::from_millis(300),
            order_delay: Duration::from_millis(150),
        }
    }
}

pub struct BestsellerGenerator<S> {
    source: S,
    store: CatalogStore,
    options: BestsellerOptions,
}

impl<S: SalesSource> BestsellerGenerator<S> {
    pub fn new(source: S, store: CatalogStore, options: BestsellerOptions) -> Self {
        Self { source, store, options }
    }

    /// Lists every sales order in the window. A failing page aborts the run.
    pub async fn fetch_orders(&self, window: &DateRange) -> Result<Vec<SalesOrderSummary>, BestsellerError> {
        let mut orders = Vec::new();
        let mut page = 1;
        loop {
            let result = self
                .source
                .fetch_sales_orders_page(window, page, self.options.page_size)
                .await
                .map_err(|source| BestsellerError::Connectivity { page, source })?;
            orders.extend(result.orders);
            tracing::info!(page, total = orders.len(), "fetched sales order page");
            if !result.has_more_page {
                break;
            }
            if page >= self.options.max_pages {
                let source = GatewayError::Decode {
                    endpoint: "salesorders".to_string(),
                    reason: format!("more pages reported after {} pages", self.options.max_pages),
                };
                return Err(BestsellerError::Connectivity { page, source });
            }
            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }
        Ok(orders)
    }

    /// Regenerates `bestsellers.json`. A window without any sales orders
    /// leaves the previous list in place and returns `None`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Option<BestsellersFile>, BestsellerError> {
        let window = DateRange::trailing(now, self.options.window_days);
        let orders = self.fetch_orders(&window).await?;
        if orders.is_empty() {
            tracing::warn!(start = %window.start, end = %window.end, "no sales orders in window; bestsellers unchanged");
            return Ok(None);
        }

        let mut tally = SalesTally::default();
        for order in orders.iter().filter(|o| o.counts_as_sale()) {
            match self.source.fetch_sales_order_lines(&order.salesorder_id).await {
                Ok(lines) => tally.record_order(&lines),
                Err(error) => tracing::warn!(salesorder_id = %order.salesorder_id, %error, "sales order skipped"),
            }
            tokio::time::sleep(self.options.order_delay).await;
        }

        let catalog = self.store.load_products().await?;
        let bestsellers = tally.select(&catalog, self.options.top);
        let file = BestsellersFile {
            stats: BestsellerStats {
                orders_processed: tally.orders_processed,
                unique_items_sold: tally.items.len(),
                bestsellers_count: bestsellers.len(),
            },
            bestsellers,
            generated_at: now,
            date_range: window,
        };
        self.store.save_bestsellers(&file).await?;
        tracing::info!(
            orders = orders.len(),
            orders_processed = file.stats.orders_processed,
            unique_items_sold = file.stats.unique_items_sold,
            bestsellers = file.stats.bestsellers_count,
            path = %self.store.bestsellers_path().display(),
            "bestsellers written"
        );
        Ok(Some(file))
    }
}

/// `limit` and `in_stock_only` fall back to their defaults when malformed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BestsellerQuery {
    pub limit: Option<String>,
    pub in_stock_only: Option<String>,
}

impl BestsellerQuery {
    pub fn limit(&self) -> usize {
        self.limit.as_deref().and_then(|raw| raw.trim().parse().ok()).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn in_stock_only(&self) -> bool {
        parse_flag(self.in_stock_only.as_deref()).unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestsellerList {
    pub bestsellers: Vec<Bestseller>,
    pub count: usize,
    pub generated_at: Option<DateTime<Utc>>,
    pub date_range: Option<DateRange>,
}

pub fn list_bestsellers(file: Option<BestsellersFile>, query: &BestsellerQuery) -> BestsellerList {
    let Some(file) = file else {
        return BestsellerList { bestsellers: vec![], count: 0, generated_at: None, date_range: None };
    };
    let in_stock_only = query.in_stock_only();
    let bestsellers: Vec<Bestseller> = file
        .bestsellers
        .into_iter()
        .filter(|b| !in_stock_only || b.in_stock)
        .take(query.limit())
        .collect();
    BestsellerList {
        count: bestsellers.len(),
        bestsellers,
        generated_at: Some(file.generated_at),
        date_range: Some(file.date_range),
    }
}
