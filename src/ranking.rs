//! Popularity rankings.
//!
//! Scores are a placeholder signal until real sales data is wired in; the
//! formula lives behind [`RankingStrategy`] so it can be swapped without
//! touching the file format or the query service.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::catalog::category::{CANDLES, CHRISTMAS, GIFTS, HOME_DECOR, LIGHTING};
use crate::domain::Product;

/// Score used for products the ranking file does not know.
pub const DEFAULT_SCORE: u8 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub score: u8,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingFile {
    pub rankings: BTreeMap<String, RankingEntry>,
    pub generated_at: DateTime<Utc>,
    pub product_count: usize,
    #[serde(default)]
    pub category_medians: BTreeMap<String, Decimal>,
    pub algorithm_version: String,
    #[serde(default)]
    pub notes: String,
}

pub trait RankingStrategy {
    /// Popularity in `0..=100`.
    fn score(&self, product: &Product) -> u8;
    fn algorithm_version(&self) -> &str;
    fn notes(&self) -> &str;
}

/// Price-proximity + brand boost heuristic with random jitter.
#[derive(Debug, Clone)]
pub struct MockPopularity {
    jitter: RangeInclusive<i32>,
}

const TARGET_PRICES: &[(&str, Decimal)] = &[
    (CHRISTMAS, dec!(20)),
    (HOME_DECOR, dec!(25)),
    (CANDLES, dec!(18)),
    (LIGHTING, dec!(30)),
    (GIFTS, dec!(20)),
    ("Kitchen", dec!(25)),
];
const DEFAULT_TARGET_PRICE: Decimal = dec!(20);

const BRAND_CATEGORY_BOOSTS: &[(&str, &str, i32)] = &[
    ("Räder", CHRISTMAS, 50),
    ("Räder", HOME_DECOR, 20),
    ("Räder", GIFTS, 15),
    ("Relaxound", HOME_DECOR, 25),
    ("Relaxound", GIFTS, 20),
    ("My Flame", CANDLES, 40),
    ("My Flame", GIFTS, 20),
];

impl Default for MockPopularity {
    fn default() -> Self {
        Self { jitter: 5..=15 }
    }
}

impl MockPopularity {
    pub fn with_jitter(jitter: RangeInclusive<i32>) -> Self {
        Self { jitter }
    }

    fn price_points(price: Decimal, category: &str) -> i32 {
        let target = TARGET_PRICES
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(DEFAULT_TARGET_PRICE, |(_, t)| *t);
        match (price - target).abs() {
            d if d <= dec!(5) => 20,
            d if d <= dec!(10) => 15,
            d if d <= dec!(20) => 10,
            d if d <= dec!(40) => 5,
            _ => 0,
        }
    }
}

impl RankingStrategy for MockPopularity {
    fn score(&self, product: &Product) -> u8 {
        // never listed, never ranked
        if !product.has_image {
            return 0;
        }
        let mut score: i32 = 50;
        score += if product.in_stock { 10 } else { -20 };
        score += product
            .categories
            .iter()
            .map(|c| Self::price_points(product.price, c))
            .max()
            .unwrap_or(0);
        score += BRAND_CATEGORY_BOOSTS
            .iter()
            .filter(|(brand, category, _)| *brand == product.brand && product.categories.contains(*category))
            .map(|(_, _, boost)| boost)
            .sum::<i32>();
        if !self.jitter.is_empty() {
            score += rand::thread_rng().gen_range(self.jitter.clone());
        }
        score.clamp(0, 100) as u8
    }

    fn algorithm_version(&self) -> &str {
        "1.0-mock"
    }

    fn notes(&self) -> &str {
        "Mock rankings based on price proximity and brand boosts. Replace with real sales data."
    }
}

pub fn category_medians(products: &[Product]) -> BTreeMap<String, Decimal> {
    let mut prices: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for product in products {
        for category in &product.categories {
            prices.entry(category.clone()).or_default().push(product.price);
        }
    }
    prices
        .into_iter()
        .map(|(category, mut values)| {
            values.sort();
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / dec!(2)
            } else {
                values[mid]
            };
            (category, median)
        })
        .collect()
}

pub fn generate_rankings(products: &[Product], strategy: &dyn RankingStrategy, now: DateTime<Utc>) -> RankingFile {
    let rankings: BTreeMap<String, RankingEntry> = products
        .iter()
        .map(|p| {
            let entry = RankingEntry { score: strategy.score(p), brand: p.brand.clone(), price: p.price };
            (p.sku.to_string(), entry)
        })
        .collect();
    RankingFile {
        product_count: rankings.len(),
        rankings,
        generated_at: now,
        category_medians: category_medians(products),
        algorithm_version: strategy.algorithm_version().to_string(),
        notes: strategy.notes().to_string(),
    }
}
