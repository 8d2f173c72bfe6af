//! Cart Aggregate
//!
//! A cart as the client submits it, and the priced cart the server derives
//! from it. Client-side prices are carried along for logging only; every
//! amount in a [`PricedCart`] comes from the catalog.

use rust_decimal::Decimal;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, CURRENCY};

/// Largest quantity a single cart line may carry after merging.
pub const MAX_LINE_QUANTITY: u32 = 999;

#[derive(Clone, Debug)]
pub struct CartLine {
    pub sku: String,
    pub quantity: u32,
    pub client_price: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricedLine {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl PricedLine {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricedCart {
    lines: Vec<PricedLine>,
    subtotal: Money,
}

impl PricedCart {
    pub fn lines(&self) -> &[PricedLine] { &self.lines }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Lines with the same SKU are merged. Merged quantities saturate and are
    /// rejected at pricing time once above [`MAX_LINE_QUANTITY`].
    pub fn add_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.sku == line.sku) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Prices every line against the catalog. The first SKU the catalog does
    /// not know fails the whole cart.
    pub fn price<'a, F>(&self, lookup: F) -> Result<PricedCart, CartError>
    where
        F: Fn(&str) -> Option<&'a Product>,
    {
        let mut lines = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let product = lookup(&line.sku).ok_or_else(|| CartError::UnknownSku(line.sku.clone()))?;
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityTooLarge { sku: line.sku.clone(), quantity: line.quantity });
            }
            if let Some(client_price) = line.client_price {
                if client_price != product.price {
                    tracing::warn!(sku = %line.sku, %client_price, catalog_price = %product.price, "client price ignored");
                }
            }
            lines.push(PricedLine {
                sku: line.sku.clone(),
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.retail_price(),
            });
        }
        let subtotal = lines.iter().fold(Money::zero(CURRENCY), |acc, l| acc.add(&l.line_total()).unwrap_or(acc));
        Ok(PricedCart { lines, subtotal })
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<T: IntoIterator<Item = CartLine>>(iter: T) -> Self {
        let mut cart = Cart::new();
        for line in iter { cart.add_line(line); }
        cart
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { UnknownSku(String), QuantityTooLarge { sku: String, quantity: u32 } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSku(sku) => write!(f, "Product not found: {sku}"),
            Self::QuantityTooLarge { sku, quantity } => {
                write!(f, "quantity {quantity} for {sku} exceeds the limit of {MAX_LINE_QUANTITY}")
            }
        }
    }
}
