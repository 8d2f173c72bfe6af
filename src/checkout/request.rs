use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::domain::{Address, Cart, CartLine};

fn default_shipping_method() -> String {
    "standard".to_string()
}

fn default_currency() -> String {
    "gbp".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartItemRequest {
    #[validate(length(min = 1, message = "sku must not be empty"))]
    pub sku: String,
    #[validate(range(min = 1, max = 999, message = "quantity must be between 1 and 999"))]
    pub quantity: u32,
    /// What the client believes the price is. Never trusted.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub address: Address,
    #[serde(default)]
    pub shipping_address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "cart is empty"))]
    pub items: Vec<CartItemRequest>,
    #[validate]
    pub customer: CustomerInfo,
    #[serde(default = "default_shipping_method")]
    pub shipping_method: String,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

impl CheckoutRequest {
    /// Validates the request and every cart line.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.items.iter().try_for_each(|item| item.validate())
    }

    pub fn cart(&self) -> Cart {
        self.items
            .iter()
            .map(|item| CartLine { sku: item.sku.trim().to_string(), quantity: item.quantity, client_price: item.price })
            .collect()
    }

    pub fn shipping_address(&self) -> &Address {
        self.customer.shipping_address.as_ref().unwrap_or(&self.customer.address)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentIntentRequest {
    /// Minor units (pence).
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "currency must be an ISO code"))]
    pub currency: String,
}
