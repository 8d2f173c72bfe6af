//! Catalog query service.
//!
//! Stateless: every call loads the catalog and the ranking table from disk
//! and answers from that snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::bestsellers::{list_bestsellers, BestsellerList, BestsellerQuery};
use crate::catalog::category::CHRISTMAS;
use crate::catalog::CatalogStore;
use crate::domain::Product;
use crate::ranking::{RankingFile, DEFAULT_SCORE};
use crate::StoreError;

/// Buckets for the Christmas variety sort, in round-robin order. Products
/// matching none of them go to a trailing "other" bucket.
pub const CHRISTMAS_BUCKETS: &[&str] = &["light", "house", "santa", "christmas", "candle", "star", "angel", "tree"];

/// Query-string filters. Flags are kept as raw strings so a malformed value
/// falls back to its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub brand: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub in_stock_only: Option<String>,
    pub with_images_only: Option<String>,
    pub sort: Option<String>,
}

impl ProductQuery {
    pub fn in_stock_only(&self) -> bool {
        parse_flag(self.in_stock_only.as_deref()).unwrap_or(false)
    }

    pub fn with_images_only(&self) -> bool {
        parse_flag(self.with_images_only.as_deref()).unwrap_or(true)
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort.as_deref().and_then(SortOrder::parse)
    }
}

pub(crate) fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Popularity,
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "popularity" => Some(Self::Popularity),
            "price-asc" => Some(Self::PriceAsc),
            "price-desc" => Some(Self::PriceDesc),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrandList {
    pub brands: Vec<NamedCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryList {
    pub categories: Vec<NamedCount>,
    pub total_products: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub total_products: usize,
    pub displayable_products: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
    pub with_images: usize,
    pub without_images: usize,
    pub multi_category_products: usize,
    pub brands: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankingsInfo {
    NotGenerated { message: String },
    Ok {
        generated_at: chrono::DateTime<chrono::Utc>,
        product_count: usize,
        algorithm_version: String,
        notes: String,
    },
}

/// An in-memory snapshot of catalog + popularity scores.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    products: Vec<Product>,
    scores: HashMap<String, u8>,
}

impl CatalogView {
    pub fn new(products: Vec<Product>, rankings: Option<&RankingFile>) -> Self {
        let scores = rankings
            .map(|r| r.rankings.iter().map(|(sku, entry)| (sku.clone(), entry.score)).collect())
            .unwrap_or_default();
        Self { products, scores }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    fn score(&self, product: &Product) -> u8 {
        self.scores.get(product.sku.as_str()).copied().unwrap_or(DEFAULT_SCORE)
    }

    pub fn list_products(&self, query: &ProductQuery) -> ProductList {
        let brand = non_blank(&query.brand).map(str::to_lowercase);
        let category = non_blank(&query.category);
        let search = non_blank(&query.search).map(str::to_lowercase);
        let with_images_only = query.with_images_only();
        let in_stock_only = query.in_stock_only();

        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|p| !with_images_only || p.has_image)
            .filter(|p| brand.as_deref().map_or(true, |b| p.brand.to_lowercase() == b))
            .filter(|p| category.map_or(true, |c| p.in_category(c)))
            .filter(|p| search.as_deref().map_or(true, |s| p.matches_search(s)))
            .filter(|p| !in_stock_only || p.in_stock)
            .cloned()
            .map(|mut p| {
                p.popularity_score = Some(self.score(&p));
                p
            })
            .collect();

        let christmas = category.is_some_and(|c| c.eq_ignore_ascii_case(CHRISTMAS));
        match (query.sort_order(), category) {
            (Some(SortOrder::Popularity), _) | (None, Some(_)) if christmas => {
                products = interleave_by_keyword_bucket(products, CHRISTMAS_BUCKETS);
            }
            (Some(SortOrder::Popularity), _) | (None, Some(_)) => sort_by_popularity(&mut products),
            (Some(SortOrder::PriceAsc), _) => products.sort_by(|a, b| a.price.cmp(&b.price)),
            (Some(SortOrder::PriceDesc), _) => products.sort_by(|a, b| b.price.cmp(&a.price)),
            (Some(SortOrder::Name), _) => products.sort_by_cached_key(|p| p.name.to_lowercase()),
            (None, None) => {}
        }

        ProductList { count: products.len(), products }
    }

    pub fn find(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku.as_str() == sku)
    }

    pub fn get_product(&self, sku: &str) -> Option<Product> {
        self.find(sku).cloned().map(|mut p| {
            p.popularity_score = self.scores.get(sku).copied();
            p
        })
    }

    fn listable(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_listable())
    }

    pub fn list_brands(&self) -> BrandList {
        let counts = count_by(self.listable().map(|p| p.brand.as_str()));
        BrandList { brands: to_named(counts) }
    }

    /// A product is counted once in every category it belongs to, so the
    /// counts may add up to more than the number of products.
    pub fn list_categories(&self) -> CategoryList {
        let counts = count_by(self.listable().flat_map(|p| p.categories.iter().map(String::as_str)));
        CategoryList { categories: to_named(counts), total_products: self.listable().count() }
    }

    pub fn stats(&self) -> CatalogStats {
        let total = self.products.len();
        let in_stock = self.products.iter().filter(|p| p.in_stock).count();
        let with_images = self.listable().count();
        CatalogStats {
            total_products: total,
            displayable_products: with_images,
            in_stock,
            out_of_stock: total - in_stock,
            with_images,
            without_images: total - with_images,
            multi_category_products: self.products.iter().filter(|p| p.is_multi_category()).count(),
            brands: count_by(self.listable().map(|p| p.brand.as_str())),
            categories: count_by(self.listable().flat_map(|p| p.categories.iter().map(String::as_str))),
        }
    }
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_default() += 1;
    }
    counts
}

fn to_named(counts: BTreeMap<String, usize>) -> Vec<NamedCount> {
    counts.into_iter().map(|(name, count)| NamedCount { name, count }).collect()
}

fn popularity(p: &Product) -> u8 {
    p.popularity_score.unwrap_or(DEFAULT_SCORE)
}

fn sort_by_popularity(products: &mut [Product]) {
    products.sort_by(|a, b| popularity(b).cmp(&popularity(a)));
}

/// Variety sort: each product goes to the bucket of the first keyword its
/// name contains (else a trailing "other" bucket), buckets are ordered by
/// descending popularity, then drained round-robin in keyword order.
pub fn interleave_by_keyword_bucket(products: Vec<Product>, bucket_keywords: &[&str]) -> Vec<Product> {
    let mut buckets: Vec<Vec<Product>> = vec![Vec::new(); bucket_keywords.len() + 1];
    for product in products {
        let name = product.name.to_lowercase();
        let slot = bucket_keywords
            .iter()
            .position(|k| name.contains(k))
            .unwrap_or(bucket_keywords.len());
        buckets[slot].push(product);
    }

    let total = buckets.iter().map(Vec::len).sum();
    let mut drains: Vec<_> = buckets
        .into_iter()
        .map(|mut bucket| {
            sort_by_popularity(&mut bucket);
            bucket.into_iter()
        })
        .collect();

    let mut result = Vec::with_capacity(total);
    while result.len() < total {
        for drain in drains.iter_mut() {
            if let Some(product) = drain.next() {
                result.push(product);
            }
        }
    }
    result
}

/// Loads a fresh [`CatalogView`] per call.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: CatalogStore,
}

impl CatalogService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub async fn view(&self) -> Result<CatalogView, StoreError> {
        let products = self.store.load_products().await?;
        let rankings = self.store.load_rankings().await?;
        Ok(CatalogView::new(products, rankings.as_ref()))
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, StoreError> {
        Ok(self.view().await?.list_products(query))
    }

    pub async fn get_product(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.view().await?.get_product(sku))
    }

    pub async fn list_brands(&self) -> Result<BrandList, StoreError> {
        Ok(self.view().await?.list_brands())
    }

    pub async fn list_categories(&self) -> Result<CategoryList, StoreError> {
        Ok(self.view().await?.list_categories())
    }

    pub async fn stats(&self) -> Result<CatalogStats, StoreError> {
        Ok(self.view().await?.stats())
    }

    pub async fn bestsellers(&self, query: &BestsellerQuery) -> Result<BestsellerList, StoreError> {
        Ok(list_bestsellers(self.store.load_bestsellers().await?, query))
    }

    pub async fn rankings_info(&self) -> Result<RankingsInfo, StoreError> {
        Ok(match self.store.load_rankings().await? {
            None => RankingsInfo::NotGenerated {
                message: "Run the rank command to generate rankings".to_string(),
            },
            Some(file) => RankingsInfo::Ok {
                generated_at: file.generated_at,
                product_count: file.product_count,
                algorithm_version: file.algorithm_version,
                notes: file.notes,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::tests::product;
    use crate::ranking::{generate_rankings, MockPopularity, RankingEntry};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ranked(entries: &[(&str, u8)]) -> RankingFile {
        RankingFile {
            rankings: entries
                .iter()
                .map(|(sku, score)| (sku.to_string(), RankingEntry { score: *score, brand: String::new(), price: Decimal::ZERO }))
                .collect(),
            generated_at: Utc::now(),
            product_count: entries.len(),
            category_medians: BTreeMap::new(),
            algorithm_version: "test".into(),
            notes: String::new(),
        }
    }

    fn skus(list: &ProductList) -> Vec<&str> {
        list.products.iter().map(|p| p.sku.as_str()).collect()
    }

    fn query() -> ProductQuery {
        ProductQuery::default()
    }

    fn catalog() -> CatalogView {
        let mut no_image = product("RD-9", "Hidden Star", "Räder", dec!(9.95), &["Christmas"]);
        no_image.has_image = false;
        let mut sold_out = product("MF-1", "Scented Candle", "My Flame", dec!(14.95), &["Candles & Fragrance"]);
        sold_out.set_stock(0);
        let products = vec![
            product("RD-1", "Christmas Star Tealight Holder", "Räder", dec!(19.95), &["Christmas", "Lighting"]),
            sold_out,
            product("EL-1", "Alpaca Throw", "Elvang", dec!(119.95), &["Home Décor"]),
            product("RL-1", "Zwitscherbox", "Relaxound", dec!(84.95), &["Gifts", "Home Décor"]),
            no_image,
        ];
        CatalogView::new(products, Some(&ranked(&[("RD-1", 90), ("EL-1", 70), ("RL-1", 20)])))
    }

    #[test]
    fn test_default_listing_hides_imageless_products() {
        let list = catalog().list_products(&query());
        assert_eq!(list.count, 4);
        assert!(list.products.iter().all(|p| p.has_image));

        let q = ProductQuery { with_images_only: Some("false".into()), ..query() };
        assert_eq!(catalog().list_products(&q).count, 5);
    }

    #[test]
    fn test_malformed_flag_falls_back_to_default() {
        let q = ProductQuery { with_images_only: Some("maybe".into()), in_stock_only: Some("?".into()), ..query() };
        assert_eq!(catalog().list_products(&q).count, 4);
    }

    #[test]
    fn test_brand_filter_is_case_insensitive_on_input() {
        let q = ProductQuery { brand: Some("RÄDER".into()), ..query() };
        let list = catalog().list_products(&q);
        assert_eq!(skus(&list), vec!["RD-1"]);
        assert!(list.products.iter().all(|p| p.brand == "Räder"));

        let q = ProductQuery { brand: Some("räder".into()), with_images_only: Some("false".into()), ..query() };
        assert_eq!(catalog().list_products(&q).count, 2);
    }

    #[test]
    fn test_category_is_a_membership_test() {
        let q = ProductQuery { category: Some("home décor".into()), ..query() };
        assert_eq!(skus(&catalog().list_products(&q)), vec!["EL-1", "RL-1"]);
        let q = ProductQuery { category: Some("Lighting".into()), ..query() };
        assert_eq!(skus(&catalog().list_products(&q)), vec!["RD-1"]);
    }

    #[test]
    fn test_search_name_description_sku() {
        let mut view = catalog();
        view.products[2].description = "Soft woven alpaca from Denmark".into();
        for (needle, expected) in [("ZWITSCHER", vec!["RL-1"]), ("denmark", vec!["EL-1"]), ("mf-", vec!["MF-1"])] {
            let q = ProductQuery { search: Some(needle.into()), ..query() };
            assert_eq!(skus(&view.list_products(&q)), expected, "search {needle}");
        }
    }

    #[test]
    fn test_unmatched_filters_give_empty_list() {
        let q = ProductQuery { brand: Some("Nobody".into()), category: Some("???".into()), ..query() };
        let list = catalog().list_products(&q);
        assert_eq!(list.count, 0);
        assert!(list.products.is_empty());
    }

    #[test]
    fn test_in_stock_only() {
        let q = ProductQuery { in_stock_only: Some("true".into()), ..query() };
        assert!(!skus(&catalog().list_products(&q)).contains(&"MF-1"));
    }

    #[test]
    fn test_scores_annotated_with_default() {
        let list = catalog().list_products(&query());
        let mf = list.products.iter().find(|p| p.sku.as_str() == "MF-1").unwrap();
        assert_eq!(mf.popularity_score, Some(DEFAULT_SCORE));
    }

    #[test]
    fn test_sorts() {
        let sorted = |sort: &str| {
            let q = ProductQuery { sort: Some(sort.into()), ..query() };
            catalog().list_products(&q).products.into_iter().map(|p| p.sku.to_string()).collect::<Vec<_>>()
        };
        assert_eq!(sorted("popularity"), vec!["RD-1", "EL-1", "MF-1", "RL-1"]);
        assert_eq!(sorted("price-asc"), vec!["MF-1", "RD-1", "RL-1", "EL-1"]);
        assert_eq!(sorted("price-desc"), vec!["EL-1", "RL-1", "RD-1", "MF-1"]);
        assert_eq!(sorted("name"), vec!["EL-1", "RD-1", "MF-1", "RL-1"]);
        assert_eq!(sorted("bogus"), vec!["RD-1", "MF-1", "EL-1", "RL-1"]);
    }

    #[test]
    fn test_category_without_sort_defaults_to_popularity() {
        let q = ProductQuery { category: Some("Home Décor".into()), ..query() };
        assert_eq!(skus(&catalog().list_products(&q)), vec!["EL-1", "RL-1"]);
    }

    fn christmas_catalog() -> CatalogView {
        let products = vec![
            product("L1", "Light House Winter", "Räder", dec!(29.95), &["Christmas"]),
            product("L2", "LED Light Tree", "Räder", dec!(19.95), &["Christmas"]),
            product("S1", "Santa Figure", "Räder", dec!(12.95), &["Christmas"]),
            product("C1", "Christmas Porcelain Bell", "Räder", dec!(9.95), &["Christmas"]),
        ];
        CatalogView::new(products, Some(&ranked(&[("L1", 40), ("L2", 90), ("S1", 70), ("C1", 60)])))
    }

    #[test]
    fn test_christmas_variety_sort_default() {
        let q = ProductQuery { category: Some("Christmas".into()), ..query() };
        let list = christmas_catalog().list_products(&q);
        assert_eq!(skus(&list), vec!["L2", "S1", "C1", "L1"]);
        let scores: Vec<_> = list.products.iter().map(|p| p.popularity_score.unwrap()).collect();
        assert_eq!(scores, vec![90, 70, 60, 40]);
    }

    #[test]
    fn test_christmas_variety_sort_on_explicit_popularity() {
        let q = ProductQuery { category: Some("christmas".into()), sort: Some("popularity".into()), ..query() };
        assert_eq!(skus(&christmas_catalog().list_products(&q)), vec!["L2", "S1", "C1", "L1"]);

        let q = ProductQuery { category: Some("Christmas".into()), sort: Some("price-asc".into()), ..query() };
        assert_eq!(skus(&christmas_catalog().list_products(&q)), vec!["C1", "S1", "L2", "L1"]);
    }

    #[test]
    fn test_interleave_other_bucket_goes_last() {
        let mut products = vec![
            product("O1", "Porcelain Bell", "Räder", dec!(5), &["Christmas"]),
            product("A1", "Angel Wings", "Räder", dec!(5), &["Christmas"]),
            product("A2", "Angel Small", "Räder", dec!(5), &["Christmas"]),
        ];
        for (p, score) in products.iter_mut().zip([99, 10, 20]) {
            p.popularity_score = Some(score);
        }
        let out = interleave_by_keyword_bucket(products, CHRISTMAS_BUCKETS);
        let order: Vec<_> = out.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(order, vec!["A2", "O1", "A1"]);
    }

    #[test]
    fn test_interleave_empty() {
        assert!(interleave_by_keyword_bucket(vec![], CHRISTMAS_BUCKETS).is_empty());
    }

    #[test]
    fn test_multi_category_products_counted_in_each() {
        let view = catalog();
        let categories = view.list_categories();
        let count = |name: &str| categories.categories.iter().find(|c| c.name == name).map(|c| c.count);
        assert_eq!(count("Christmas"), Some(1));
        assert_eq!(count("Lighting"), Some(1));
        assert_eq!(count("Home Décor"), Some(2));
        let sum: usize = categories.categories.iter().map(|c| c.count).sum();
        assert!(sum > categories.total_products);
        assert_eq!(categories.total_products, 4);
    }

    #[test]
    fn test_brand_counts_skip_imageless() {
        let brands = catalog().list_brands().brands;
        assert_eq!(
            brands,
            vec![
                NamedCount { name: "Elvang".into(), count: 1 },
                NamedCount { name: "My Flame".into(), count: 1 },
                NamedCount { name: "Relaxound".into(), count: 1 },
                NamedCount { name: "Räder".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_stats() {
        let stats = catalog().stats();
        assert_eq!(stats.total_products, 5);
        assert_eq!(stats.displayable_products, 4);
        assert_eq!(stats.without_images, 1);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.multi_category_products, 2);
    }

    #[test]
    fn test_get_product() {
        let view = catalog();
        assert_eq!(view.get_product("RD-1").unwrap().popularity_score, Some(90));
        assert_eq!(view.get_product("MF-1").unwrap().popularity_score, None);
        assert!(view.get_product("rd-1").is_none());
    }

    #[tokio::test]
    async fn test_service_reads_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path());
        let service = CatalogService::new(store.clone());
        assert_eq!(service.list_products(&query()).await.unwrap().count, 0);
        assert!(matches!(service.rankings_info().await.unwrap(), RankingsInfo::NotGenerated { .. }));

        let products = catalog().products().to_vec();
        store.save_catalog(&crate::catalog::CatalogFile::new(products.clone(), Utc::now())).await.unwrap();
        store.save_rankings(&generate_rankings(&products, &MockPopularity::default(), Utc::now())).await.unwrap();

        assert_eq!(service.list_products(&query()).await.unwrap().count, 4);
        assert!(service.get_product("EL-1").await.unwrap().is_some());
        assert!(matches!(service.rankings_info().await.unwrap(), RankingsInfo::Ok { product_count: 5, .. }));
    }
}
