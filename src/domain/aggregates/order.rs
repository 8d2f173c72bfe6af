//! Order Aggregate
//!
//! Tracks one checkout from the moment the cart arrives until the sales order
//! exists in the inventory system:
//! `Received -> Validated -> Priced -> CustomerResolved -> OrderCreated`,
//! with `Failed` reachable from every non-terminal state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::{PricedCart, PricedLine};
use crate::domain::value_objects::{Money, CURRENCY};
use crate::domain::events::{DomainEvent, CheckoutEvent};

#[derive(Clone, Debug)]
pub struct Order {
    checkout_id: String,
    email: String,
    status: OrderStatus,
    items: Vec<PricedLine>,
    subtotal: Money,
    shipping: Money,
    total: Money,
    customer_id: Option<String>,
    order_id: Option<String>,
    order_number: Option<String>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub zip: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String { "United Kingdom".to_string() }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderStatus { #[default] Received, Validated, Priced, CustomerResolved, OrderCreated, Failed }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Priced => "priced",
            Self::CustomerResolved => "customer_resolved",
            Self::OrderCreated => "order_created",
            Self::Failed => "failed",
        }
    }
}

impl Order {
    pub fn receive(email: impl Into<String>) -> Self {
        let checkout_id = Uuid::new_v4().to_string();
        let email = email.into();
        let mut order = Self {
            checkout_id: checkout_id.clone(), email: email.clone(), status: OrderStatus::Received,
            items: vec![], subtotal: Money::zero(CURRENCY), shipping: Money::zero(CURRENCY), total: Money::zero(CURRENCY),
            customer_id: None, order_id: None, order_number: None, events: vec![],
        };
        order.raise_event(CheckoutEvent::Received { checkout_id, email });
        order
    }

    pub fn checkout_id(&self) -> &str { &self.checkout_id }
    pub fn email(&self) -> &str { &self.email }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[PricedLine] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn shipping(&self) -> &Money { &self.shipping }
    pub fn total(&self) -> &Money { &self.total }
    pub fn customer_id(&self) -> Option<&str> { self.customer_id.as_deref() }
    pub fn order_id(&self) -> Option<&str> { self.order_id.as_deref() }
    pub fn order_number(&self) -> Option<&str> { self.order_number.as_deref() }

    /// Every cart line resolved against the catalog.
    pub fn validate(&mut self, cart: PricedCart) -> Result<(), OrderError> {
        self.ensure_status(OrderStatus::Received)?;
        if cart.lines().is_empty() { return Err(OrderError::NoItems); }
        self.subtotal = cart.subtotal().clone();
        self.items = cart.lines().to_vec();
        self.status = OrderStatus::Validated;
        self.raise_event(CheckoutEvent::Validated { checkout_id: self.checkout_id.clone(), lines: self.items.len() });
        Ok(())
    }

    pub fn apply_shipping(&mut self, shipping: Money) -> Result<(), OrderError> {
        self.ensure_status(OrderStatus::Validated)?;
        self.total = self.subtotal.add(&shipping).map_err(|_| OrderError::CurrencyMismatch)?;
        self.shipping = shipping;
        self.status = OrderStatus::Priced;
        self.raise_event(CheckoutEvent::Priced {
            checkout_id: self.checkout_id.clone(),
            subtotal: self.subtotal.amount(),
            shipping: self.shipping.amount(),
            total: self.total.amount(),
        });
        Ok(())
    }

    pub fn resolve_customer(&mut self, customer_id: impl Into<String>, created: bool) -> Result<(), OrderError> {
        self.ensure_status(OrderStatus::Priced)?;
        let customer_id = customer_id.into();
        self.customer_id = Some(customer_id.clone());
        self.status = OrderStatus::CustomerResolved;
        self.raise_event(CheckoutEvent::CustomerResolved { checkout_id: self.checkout_id.clone(), customer_id, created });
        Ok(())
    }

    pub fn mark_created(&mut self, order_id: impl Into<String>, order_number: impl Into<String>) -> Result<(), OrderError> {
        self.ensure_status(OrderStatus::CustomerResolved)?;
        let (order_id, order_number) = (order_id.into(), order_number.into());
        self.order_id = Some(order_id.clone());
        self.order_number = Some(order_number.clone());
        self.status = OrderStatus::OrderCreated;
        self.raise_event(CheckoutEvent::OrderCreated { checkout_id: self.checkout_id.clone(), order_id, order_number });
        Ok(())
    }

    /// Terminal. A created order cannot fail afterwards.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if matches!(self.status, OrderStatus::OrderCreated | OrderStatus::Failed) {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Failed });
        }
        let stage = self.status.as_str().to_string();
        self.status = OrderStatus::Failed;
        self.raise_event(CheckoutEvent::Failed { checkout_id: self.checkout_id.clone(), stage, reason: reason.into() });
        Ok(())
    }

    pub fn total_amount(&self) -> Decimal { self.total.amount() }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: CheckoutEvent) { self.events.push(DomainEvent::Checkout(e)); }

    fn ensure_status(&self, wanted: OrderStatus) -> Result<(), OrderError> {
        if self.status != wanted {
            let to = match wanted {
                OrderStatus::Received => OrderStatus::Validated,
                OrderStatus::Validated => OrderStatus::Priced,
                OrderStatus::Priced => OrderStatus::CustomerResolved,
                _ => OrderStatus::OrderCreated,
            };
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, CurrencyMismatch, InvalidTransition { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move checkout from {} to {}", from.as_str(), to.as_str()),
        }
    }
}
