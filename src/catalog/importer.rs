//! Catalog import run: fetch → select consumer items → enrich → persist.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::category::assign_categories;
use super::filter::{should_exclude, ExclusionReason};
use super::normalize::{clean_product_name, normalize_brand};
use super::pricing::compute_retail_price;
use super::raw::RawItem;
use super::store::{CatalogFile, CatalogStore, StockSnapshot};
use crate::domain::{Product, Sku};
use crate::{GatewayError, StoreError};

/// Image files this small are error pages, not pictures.
const MIN_IMAGE_BYTES: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct ItemsPage {
    pub items: Vec<Value>,
    pub has_more_page: bool,
}

/// Read side of the inventory system as the importer needs it.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_items_page(&self, page: u32, per_page: u32) -> Result<ItemsPage, GatewayError>;

    /// `Ok(None)` when the item has no image to give.
    async fn fetch_item_image(&self, item_id: &str) -> Result<Option<Vec<u8>>, GatewayError>;
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("inventory fetch failed on page {page} after {fetched} items: {source}")]
    Connectivity {
        page: u32,
        fetched: usize,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub in_stock_only: bool,
    pub skip_images: bool,
    pub page_size: u32,
    /// A source still reporting more pages after this many is broken.
    pub max_pages: u32,
    pub page_delay: Duration,
    pub image_delay: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            in_stock_only: false,
            skip_images: false,
            page_size: 200,
            max_pages: 500,
            page_delay: Duration::from_millis(300),
            image_delay: Duration::from_millis(150),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Existing,
    Downloaded,
    Missing,
}

impl ImageOutcome {
    pub fn has_image(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub fetched: usize,
    pub unparseable: usize,
    pub skipped_inactive: usize,
    pub skipped_other_brand: usize,
    pub skipped_no_stock: usize,
    pub excluded: BTreeMap<ExclusionReason, usize>,
    pub products: usize,
    pub by_brand: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub multi_category: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
    pub images_existing: usize,
    pub images_downloaded: usize,
    pub images_missing: usize,
}

impl ImportSummary {
    fn record_product(&mut self, product: &Product) {
        self.products += 1;
        *self.by_brand.entry(product.brand.clone()).or_default() += 1;
        for category in &product.categories {
            *self.by_category.entry(category.clone()).or_default() += 1;
        }
        if product.is_multi_category() {
            self.multi_category += 1;
        }
        if product.in_stock {
            self.in_stock += 1;
        } else {
            self.out_of_stock += 1;
        }
    }

    fn record_image(&mut self, outcome: ImageOutcome) {
        match outcome {
            ImageOutcome::Existing => self.images_existing += 1,
            ImageOutcome::Downloaded => self.images_downloaded += 1,
            ImageOutcome::Missing => self.images_missing += 1,
        }
    }

    pub fn total_excluded(&self) -> usize {
        self.excluded.values().sum()
    }

    /// Emits the operator report.
    pub fn log(&self) {
        tracing::info!(
            fetched = self.fetched,
            products = self.products,
            unparseable = self.unparseable,
            skipped_inactive = self.skipped_inactive,
            skipped_other_brand = self.skipped_other_brand,
            skipped_no_stock = self.skipped_no_stock,
            excluded = self.total_excluded(),
            "import complete"
        );
        for (reason, count) in &self.excluded {
            tracing::info!(%reason, count, "filtered out");
        }
        for (brand, count) in &self.by_brand {
            tracing::info!(%brand, count, "products by brand");
        }
        for (category, count) in &self.by_category {
            tracing::info!(%category, count, "products by category");
        }
        tracing::info!(
            multi_category = self.multi_category,
            single_category = self.products - self.multi_category,
            in_stock = self.in_stock,
            out_of_stock = self.out_of_stock,
            "catalog shape"
        );
        tracing::info!(
            existing = self.images_existing,
            downloaded = self.images_downloaded,
            missing = self.images_missing,
            "images"
        );
    }
}

pub struct CatalogImporter<S> {
    source: S,
    store: CatalogStore,
    options: ImportOptions,
}

impl<S: InventorySource> CatalogImporter<S> {
    pub fn new(source: S, store: CatalogStore, options: ImportOptions) -> Self {
        Self { source, store, options }
    }

    /// Pages through every inventory item. Any page failing (after the HTTP
    /// layer's own retries) aborts: a truncated catalog is worse than none.
    pub async fn fetch_all_items(&self) -> Result<Vec<Value>, ImportError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let result = self
                .source
                .fetch_items_page(page, self.options.page_size)
                .await
                .map_err(|source| ImportError::Connectivity { page, fetched: items.len(), source })?;
            items.extend(result.items);
            tracing::info!(page, total = items.len(), "fetched inventory page");
            if !result.has_more_page {
                break;
            }
            if page >= self.options.max_pages {
                let source = GatewayError::Decode {
                    endpoint: "items".to_string(),
                    reason: format!("more pages reported after {} pages", self.options.max_pages),
                };
                return Err(ImportError::Connectivity { page, fetched: items.len(), source });
            }
            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }
        Ok(items)
    }

    /// Downloads the item image unless a usable file already exists.
    pub async fn download_image(&self, item_id: &str, sku: &Sku) -> bool {
        self.ensure_image(item_id, sku).await.has_image()
    }

    async fn ensure_image(&self, item_id: &str, sku: &Sku) -> ImageOutcome {
        let path = self.store.image_path(sku);
        if usable_file(&path).await {
            return ImageOutcome::Existing;
        }
        if self.options.skip_images {
            return ImageOutcome::Missing;
        }
        let outcome = match self.source.fetch_item_image(item_id).await {
            Ok(Some(bytes)) if bytes.len() as u64 > MIN_IMAGE_BYTES => match self.store.save_image(sku, &bytes).await {
                Ok(_) => ImageOutcome::Downloaded,
                Err(error) => {
                    tracing::warn!(%sku, path = %path.display(), %error, "failed to store image");
                    ImageOutcome::Missing
                }
            },
            Ok(_) => ImageOutcome::Missing,
            Err(error) => {
                tracing::warn!(%sku, item_id, %error, "image download failed; product listed without image");
                ImageOutcome::Missing
            }
        };
        tokio::time::sleep(self.options.image_delay).await;
        outcome
    }

    /// Parses and filters raw items down to consumer products, each paired
    /// with its display brand.
    pub fn select(&self, items: &[Value], summary: &mut ImportSummary) -> Vec<(RawItem, &'static str)> {
        let mut selected = Vec::new();
        for value in items {
            let raw = match RawItem::from_value(value) {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!(%error, "skipping unparseable inventory item");
                    summary.unparseable += 1;
                    continue;
                }
            };
            if !raw.is_active() {
                summary.skipped_inactive += 1;
                continue;
            }
            let Some(brand) = raw.brand.as_deref().and_then(normalize_brand) else {
                summary.skipped_other_brand += 1;
                continue;
            };
            if self.options.in_stock_only && raw.stock_on_hand <= 0 {
                summary.skipped_no_stock += 1;
                continue;
            }
            if let Some(reason) = should_exclude(&raw) {
                *summary.excluded.entry(reason).or_default() += 1;
                continue;
            }
            selected.push((raw, brand));
        }
        selected
    }

    pub async fn run(&self) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();
        if self.options.in_stock_only {
            tracing::info!("mode: in-stock only");
        }
        if self.options.skip_images {
            tracing::info!("mode: skipping image downloads");
        }

        self.store.ensure_dirs().await?;
        let items = self.fetch_all_items().await?;
        summary.fetched = items.len();

        let selected = self.select(&items, &mut summary);
        tracing::info!(consumer_items = selected.len(), "consumer items selected");

        let mut products = Vec::with_capacity(selected.len());
        for (i, (raw, brand)) in selected.into_iter().enumerate() {
            if (i + 1) % 100 == 0 {
                tracing::info!(processed = i + 1, "processing products");
            }
            let sku = match Sku::new(raw.sku.clone()) {
                Ok(sku) => sku,
                Err(error) => {
                    tracing::warn!(item_id = %raw.item_id, %error, "skipping item with unusable SKU");
                    summary.unparseable += 1;
                    continue;
                }
            };
            let image = match raw.image_document_id {
                Some(_) => self.ensure_image(&raw.item_id, &sku).await,
                None => ImageOutcome::Missing,
            };
            summary.record_image(image);

            let product = build_product(raw, sku, brand, image.has_image());
            if let Err(error) = product.check_invariants() {
                tracing::warn!(sku = %product.sku, %error, "dropping product that breaks catalog invariants");
                continue;
            }
            summary.record_product(&product);
            products.push(product);
        }

        let now = Utc::now();
        let snapshot = StockSnapshot::from_products(&products, now);
        self.store.save_catalog(&CatalogFile::new(products, now)).await?;
        self.store.save_stock(&snapshot).await?;
        tracing::info!(
            catalog = %self.store.products_path().display(),
            stock = %self.store.stock_path().display(),
            "catalog written"
        );
        Ok(summary)
    }
}

fn build_product(raw: RawItem, sku: Sku, brand: &str, has_image: bool) -> Product {
    let image_url = has_image.then(|| format!("/images/{}.jpg", sku.file_stem()));
    let mut product = Product {
        id: raw.item_id,
        categories: assign_categories(&raw.name, brand),
        name: clean_product_name(&raw.name),
        sku,
        brand: brand.to_string(),
        description: raw.description,
        price: compute_retail_price(raw.rate),
        trade_price: raw.rate,
        ean: raw.ean,
        has_image,
        images: image_url.iter().cloned().collect(),
        image_url,
        in_stock: false,
        stock: 0,
        popularity_score: None,
    };
    product.set_stock(raw.stock_on_hand);
    product
}

async fn usable_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > MIN_IMAGE_BYTES)
        .unwrap_or(false)
}
