//! JSON artifacts under the data directory.
//!
//! `products.json` (catalog), `stock.json` (stock snapshot), `rankings.json`
//! (popularity), `bestsellers.json` (sales) and `images/`. Files are always
//! replaced whole: a write goes to a temporary sibling that is then renamed
//! over the target.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::bestsellers::BestsellersFile;
use crate::domain::{Product, Sku};
use crate::ranking::RankingFile;
use crate::StoreError;

const PRODUCTS_FILE: &str = "products.json";
const STOCK_FILE: &str = "stock.json";
const RANKINGS_FILE: &str = "rankings.json";
const BESTSELLERS_FILE: &str = "bestsellers.json";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<Product>,
    #[serde(default)]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub count: usize,
}

impl CatalogFile {
    pub fn new(products: Vec<Product>, imported_at: DateTime<Utc>) -> Self {
        Self { count: products.len(), products, imported_at: Some(imported_at) }
    }

    pub fn empty() -> Self {
        Self { products: vec![], imported_at: None, count: 0 }
    }
}

/// Stock per SKU as of the last import. Written for auditing; the query and
/// checkout paths read stock from the catalog records instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub stock: BTreeMap<String, StockEntry>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub source_item_id: String,
    pub stock: u32,
    pub updated_at: DateTime<Utc>,
}

impl StockSnapshot {
    pub fn from_products(products: &[Product], at: DateTime<Utc>) -> Self {
        let stock = products
            .iter()
            .map(|p| {
                let entry = StockEntry { source_item_id: p.id.clone(), stock: p.stock, updated_at: at };
                (p.sku.to_string(), entry)
            })
            .collect();
        Self { stock, updated_at: at }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path { &self.data_dir }
    pub fn products_path(&self) -> PathBuf { self.data_dir.join(PRODUCTS_FILE) }
    pub fn stock_path(&self) -> PathBuf { self.data_dir.join(STOCK_FILE) }
    pub fn rankings_path(&self) -> PathBuf { self.data_dir.join(RANKINGS_FILE) }
    pub fn bestsellers_path(&self) -> PathBuf { self.data_dir.join(BESTSELLERS_FILE) }
    pub fn images_dir(&self) -> PathBuf { self.data_dir.join(IMAGES_DIR) }
    pub fn image_path(&self, sku: &Sku) -> PathBuf { self.images_dir().join(format!("{}.jpg", sku.file_stem())) }

    /// A catalog that was never imported reads as empty.
    pub async fn load_catalog(&self) -> Result<CatalogFile, StoreError> {
        Ok(read_json(&self.products_path()).await?.unwrap_or_else(CatalogFile::empty))
    }

    pub async fn load_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.load_catalog().await?.products)
    }

    pub async fn save_catalog(&self, catalog: &CatalogFile) -> Result<(), StoreError> {
        write_json(&self.products_path(), catalog).await
    }

    pub async fn load_stock(&self) -> Result<Option<StockSnapshot>, StoreError> {
        read_json(&self.stock_path()).await
    }

    pub async fn save_stock(&self, snapshot: &StockSnapshot) -> Result<(), StoreError> {
        write_json(&self.stock_path(), snapshot).await
    }

    pub async fn load_rankings(&self) -> Result<Option<RankingFile>, StoreError> {
        read_json(&self.rankings_path()).await
    }

    pub async fn save_rankings(&self, rankings: &RankingFile) -> Result<(), StoreError> {
        write_json(&self.rankings_path(), rankings).await
    }

    pub async fn load_bestsellers(&self) -> Result<Option<BestsellersFile>, StoreError> {
        read_json(&self.bestsellers_path()).await
    }

    pub async fn save_bestsellers(&self, bestsellers: &BestsellersFile) -> Result<(), StoreError> {
        write_json(&self.bestsellers_path(), bestsellers).await
    }

    pub async fn save_image(&self, sku: &Sku, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.image_path(sku);
        write_atomic(&path, bytes).await?;
        Ok(path)
    }

    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        let images = self.images_dir();
        tokio::fs::create_dir_all(&images).await.map_err(|source| io_error(&images, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json { path: path.display().to_string(), source })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(value)
        .map_err(|source| StoreError::Json { path: path.display().to_string(), source })?;
    write_atomic(path, &body).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| io_error(parent, source))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await.map_err(|source| io_error(&tmp, source))?;
    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_error(path, source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::tests::product;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path());
        assert_eq!(store.load_catalog().await.unwrap(), CatalogFile::empty());
        assert!(store.load_rankings().await.unwrap().is_none());
        assert!(store.load_stock().await.unwrap().is_none());
        assert!(store.load_bestsellers().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("data"));
        let products = vec![product("RD-1", "Light House", "Räder", dec!(59.95), &["Christmas", "Lighting"])];
        let catalog = CatalogFile::new(products, Utc::now());
        store.save_catalog(&catalog).await.unwrap();

        let loaded = store.load_catalog().await.unwrap();
        assert_eq!(loaded.count, 1);
        assert_eq!(loaded.products[0].price, dec!(59.95));
        assert_eq!(loaded.products[0].categories.len(), 2);
        assert!(!store.data_dir().join("products.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), b"{ not json").unwrap();
        let store = CatalogStore::new(dir.path());
        assert!(matches!(store.load_catalog().await, Err(StoreError::Json { .. })));
    }

    #[tokio::test]
    async fn test_save_image_under_sanitised_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path());
        let path = store.save_image(&Sku::new("MF/24").unwrap(), b"jpeg").await.unwrap();
        assert_eq!(path, dir.path().join("images/MF_24.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
        assert!(!dir.path().join("images/MF_24.jpg.tmp").exists());
    }

    #[test]
    fn test_stock_snapshot_keyed_by_sku() {
        let mut p = product("MF-2", "Candle", "My Flame", dec!(9.95), &["Candles & Fragrance"]);
        p.set_stock(-3);
        let snapshot = StockSnapshot::from_products(&[p], Utc::now());
        let entry = &snapshot.stock["MF-2"];
        assert_eq!(entry.stock, 0);
        assert_eq!(entry.source_item_id, "id-MF-2");
    }
}
