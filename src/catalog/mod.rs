//! Catalog import from the inventory system.
//!
//! The pipeline is: page through every inventory item, parse it into a
//! [`RawItem`], keep active items of a consumer brand that pass the
//! consumer filters, then price, categorise and fetch images before writing
//! the catalog and the stock snapshot.

pub mod category;
pub mod filter;
pub mod importer;
pub mod normalize;
pub mod pricing;
pub mod raw;
pub mod store;

pub use category::assign_categories;
pub use filter::{should_exclude, ExclusionReason};
pub use importer::{CatalogImporter, ImportError, ImportOptions, ImportSummary, InventorySource, ItemsPage};
pub use normalize::{clean_product_name, normalize_brand};
pub use pricing::compute_retail_price;
pub use raw::{RawItem, RawItemError};
pub use store::{CatalogFile, CatalogStore, StockEntry, StockSnapshot};
