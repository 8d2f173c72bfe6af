//! Shipping methods and charges.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::domain::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: Decimal,
    pub free_threshold: Decimal,
}

pub const STANDARD: ShippingMethod = ShippingMethod {
    id: "standard",
    name: "Royal Mail 2nd Class",
    description: "3-5 working days",
    price: dec!(4.99),
    free_threshold: dec!(30.00),
};

pub const EXPRESS: ShippingMethod = ShippingMethod {
    id: "express",
    name: "Royal Mail / UPS 1st Class",
    description: "1-2 working days",
    price: dec!(7.99),
    free_threshold: dec!(30.00),
};

pub const METHODS: &[ShippingMethod] = &[STANDARD, EXPRESS];

impl ShippingMethod {
    /// Unknown ids fall back to standard.
    pub fn lookup(id: &str) -> &'static ShippingMethod {
        METHODS.iter().find(|m| m.id == id).unwrap_or(&METHODS[0])
    }

    pub fn charge_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.price
        }
    }

    pub fn charge(&self, subtotal: &Money) -> Money {
        Money::new(self.charge_for(subtotal.amount()), subtotal.currency())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: Decimal,
    pub free_threshold: Decimal,
    pub is_free: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuote {
    pub options: Vec<ShippingOption>,
    pub order_total: Decimal,
    pub free_shipping_message: String,
}

pub fn quote(order_total: Decimal) -> ShippingQuote {
    let options = METHODS
        .iter()
        .map(|m| {
            let price = m.charge_for(order_total);
            ShippingOption {
                id: m.id,
                name: m.name,
                description: m.description,
                price,
                free_threshold: m.free_threshold,
                is_free: price.is_zero(),
            }
        })
        .collect();
    ShippingQuote {
        options,
        order_total,
        free_shipping_message: format!("Free standard shipping on orders over £{}", STANDARD.free_threshold.round_dp(0)),
    }
}
