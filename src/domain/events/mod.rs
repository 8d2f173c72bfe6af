//! Domain events
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Checkout(CheckoutEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutEvent {
    Received { checkout_id: String, email: String },
    Validated { checkout_id: String, lines: usize },
    Priced { checkout_id: String, subtotal: Decimal, shipping: Decimal, total: Decimal },
    CustomerResolved { checkout_id: String, customer_id: String, created: bool },
    OrderCreated { checkout_id: String, order_id: String, order_number: String },
    Failed { checkout_id: String, stage: String, reason: String },
}
