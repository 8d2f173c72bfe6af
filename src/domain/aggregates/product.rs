//! Product Aggregate
//!
//! One record of the persisted catalog. Products are created in bulk by the
//! importer and only ever read afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::domain::value_objects::{Money, Sku};

/// Category every product lands in when nothing else matched.
pub const DEFAULT_CATEGORY: &str = "Home Décor";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Item id in the inventory system.
    pub id: String,
    pub sku: Sku,
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub trade_price: Decimal,
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub ean: String,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub stock: u32,
    /// Set on query responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<u8>,
}

impl Product {
    pub fn retail_price(&self) -> Money { Money::gbp(self.price) }
    pub fn is_listable(&self) -> bool { self.has_image }
    pub fn is_multi_category(&self) -> bool { self.categories.len() > 1 }

    /// Case-insensitive set membership.
    pub fn in_category(&self, category: &str) -> bool {
        let wanted = category.to_lowercase();
        self.categories.iter().any(|c| c.to_lowercase() == wanted)
    }

    /// `needle` must already be lower-cased.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.sku.as_str().to_lowercase().contains(needle)
    }

    /// Sets stock and the derived `in_stock` flag together; negative source
    /// stock is clamped to zero.
    pub fn set_stock(&mut self, on_hand: i64) {
        self.stock = u32::try_from(on_hand.max(0)).unwrap_or(u32::MAX);
        self.in_stock = self.stock > 0;
    }

    pub fn check_invariants(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.price <= Decimal::ZERO { return Err(ProductError::NonPositivePrice); }
        if self.categories.is_empty() { return Err(ProductError::NoCategories); }
        if self.in_stock != (self.stock > 0) { return Err(ProductError::StockFlagMismatch); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NonPositivePrice, NoCategories, StockFlagMismatch }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::NonPositivePrice => write!(f, "Price must be positive"),
            Self::NoCategories => write!(f, "Product has no categories"),
            Self::StockFlagMismatch => write!(f, "in_stock disagrees with stock"),
        }
    }
}
