//! Checkout orchestration.
//!
//! Turns a client cart into a sales order in the inventory system. Prices
//! always come from the catalog; the client's prices are only logged. The
//! steps run strictly in sequence and the first failure stops the checkout,
//! naming the step (and the SKU when one is involved).

pub mod gateway;
pub mod request;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::domain::aggregates::{CartError, OrderError};
use crate::domain::events::DomainEvent;
use crate::domain::Order;
use crate::query::CatalogService;
use crate::shipping::ShippingMethod;
use crate::{GatewayError, StoreError};

pub use gateway::{
    ConnectionStatus, Contact, InventoryGateway, InventoryItem, NewContact, NewSalesOrder, Organization,
    PaymentGateway, PaymentIntent, SalesOrder, SalesOrderLine,
};
pub use request::{CartItemRequest, CheckoutRequest, CustomerInfo, PaymentIntentRequest};

const ORDER_NOTES: &str = "Online order via Home & Verse website";
const ORDER_TERMS: &str = "Payment processed via Home & Verse website";
const CONTACT_NOTES: &str = "Created via Home & Verse website";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Validate,
    Price,
    ResolveCustomer,
    LookupItem,
    CreateOrder,
    Payment,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Price => "price",
            Self::ResolveCustomer => "resolve_customer",
            Self::LookupItem => "lookup_item",
            Self::CreateOrder => "create_order",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),

    #[error("Product not found: {sku}")]
    UnknownSku { sku: String },

    #[error("{step} failed: no inventory item for SKU {sku}")]
    ItemNotInInventory { step: CheckoutStep, sku: String },

    #[error("{step} failed: {source}")]
    Gateway {
        step: CheckoutStep,
        sku: Option<String>,
        #[source]
        source: GatewayError,
    },

    #[error("{step} failed: {source}")]
    State {
        step: CheckoutStep,
        #[source]
        source: OrderError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn step(&self) -> Option<CheckoutStep> {
        match self {
            Self::InvalidRequest(_) | Self::UnknownSku { .. } => Some(CheckoutStep::Validate),
            Self::ItemNotInInventory { step, .. } | Self::Gateway { step, .. } | Self::State { step, .. } => Some(*step),
            Self::Store(_) => None,
        }
    }

    pub fn sku(&self) -> Option<&str> {
        match self {
            Self::UnknownSku { sku } | Self::ItemNotInInventory { sku, .. } => Some(sku),
            Self::Gateway { sku, .. } => sku.as_deref(),
            _ => None,
        }
    }

    fn gateway(step: CheckoutStep, source: GatewayError) -> Self {
        Self::Gateway { step, sku: None, source }
    }

    fn state(step: CheckoutStep) -> impl FnOnce(OrderError) -> Self {
        move |source| Self::State { step, source }
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::UnknownSku(sku) => Self::UnknownSku { sku },
            err @ CartError::QuantityTooLarge { .. } => Self::InvalidRequest(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub success: bool,
    pub order_number: String,
    pub order_id: String,
    pub subtotal: rust_decimal::Decimal,
    pub shipping: rust_decimal::Decimal,
    pub total: rust_decimal::Decimal,
    pub customer_email: String,
}

#[derive(Clone)]
pub struct CheckoutOrchestrator {
    catalog: CatalogService,
    inventory: Arc<dyn InventoryGateway>,
}

impl CheckoutOrchestrator {
    pub fn new(catalog: CatalogService, inventory: Arc<dyn InventoryGateway>) -> Self {
        Self { catalog, inventory }
    }

    pub fn inventory(&self) -> &dyn InventoryGateway {
        self.inventory.as_ref()
    }

    pub async fn place_order(&self, request: &CheckoutRequest) -> Result<OrderConfirmation, CheckoutError> {
        request
            .validate_all()
            .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;

        let mut order = Order::receive(request.customer.email.trim());
        let result = self.run(&mut order, request).await;
        if let Err(err) = &result {
            // cannot fail: run() only errors before OrderCreated
            let _ = order.fail(err.to_string());
        }
        log_events(order.take_events());

        result.map(|()| OrderConfirmation {
            success: true,
            order_number: order.order_number().unwrap_or_default().to_string(),
            order_id: order.order_id().unwrap_or_default().to_string(),
            subtotal: order.subtotal().amount(),
            shipping: order.shipping().amount(),
            total: order.total().amount(),
            customer_email: order.email().to_string(),
        })
    }

    async fn run(&self, order: &mut Order, request: &CheckoutRequest) -> Result<(), CheckoutError> {
        let view = self.catalog.view().await?;
        let priced = request.cart().price(|sku| view.find(sku))?;
        order.validate(priced).map_err(CheckoutError::state(CheckoutStep::Validate))?;

        let method = ShippingMethod::lookup(&request.shipping_method);
        let shipping = method.charge(order.subtotal());
        order.apply_shipping(shipping).map_err(CheckoutError::state(CheckoutStep::Price))?;

        let (customer_id, created) = self.resolve_customer(request).await?;
        order.resolve_customer(customer_id, created).map_err(CheckoutError::state(CheckoutStep::ResolveCustomer))?;

        let mut line_items = Vec::with_capacity(order.items().len());
        for line in order.items() {
            let item = self
                .inventory
                .find_item_by_sku(&line.sku)
                .await
                .map_err(|source| CheckoutError::Gateway {
                    step: CheckoutStep::LookupItem,
                    sku: Some(line.sku.clone()),
                    source,
                })?
                .ok_or_else(|| CheckoutError::ItemNotInInventory { step: CheckoutStep::LookupItem, sku: line.sku.clone() })?;
            let name = if item.name.is_empty() { line.name.clone() } else { item.name };
            line_items.push(SalesOrderLine {
                item_id: item.item_id,
                quantity: line.quantity,
                rate: line.unit_price.amount(),
                name,
            });
        }

        let mut notes = ORDER_NOTES.to_string();
        if let Some(intent) = &request.payment_intent_id {
            notes.push_str(&format!("\nStripe Payment: {intent}"));
        }
        let sales_order = NewSalesOrder {
            customer_id: order.customer_id().unwrap_or_default().to_string(),
            line_items,
            shipping_charge: order.shipping().amount(),
            notes,
            terms: ORDER_TERMS.to_string(),
            is_inclusive_tax: true,
            reference_number: request.payment_intent_id.clone(),
        };
        let created = self
            .inventory
            .create_sales_order(&sales_order)
            .await
            .map_err(|e| CheckoutError::gateway(CheckoutStep::CreateOrder, e))?;
        order
            .mark_created(created.salesorder_id, created.salesorder_number)
            .map_err(CheckoutError::state(CheckoutStep::CreateOrder))
    }

    /// Reuses the first contact with this email, else creates one.
    async fn resolve_customer(&self, request: &CheckoutRequest) -> Result<(String, bool), CheckoutError> {
        let email = request.customer.email.trim();
        let existing = self
            .inventory
            .find_contact_by_email(email)
            .await
            .map_err(|e| CheckoutError::gateway(CheckoutStep::ResolveCustomer, e))?;
        if let Some(contact) = existing {
            return Ok((contact.contact_id, false));
        }

        let contact = NewContact {
            contact_name: request.customer.name.trim().to_string(),
            contact_type: "customer",
            email: email.to_string(),
            phone: request.customer.phone.clone(),
            billing_address: request.customer.address.clone(),
            shipping_address: request.shipping_address().clone(),
            notes: CONTACT_NOTES.to_string(),
        };
        let created = self
            .inventory
            .create_contact(&contact)
            .await
            .map_err(|e| CheckoutError::gateway(CheckoutStep::ResolveCustomer, e))?;
        Ok((created.contact_id, true))
    }
}

fn log_events(events: Vec<DomainEvent>) {
    for DomainEvent::Checkout(event) in events {
        tracing::info!(?event, "checkout");
    }
}

pub async fn create_payment_intent(
    payments: &dyn PaymentGateway,
    request: &PaymentIntentRequest,
) -> Result<PaymentIntent, CheckoutError> {
    request
        .validate()
        .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
    let currency = request.currency.to_lowercase();
    let intent = payments
        .create_payment_intent(request.amount, &currency)
        .await
        .map_err(|e| CheckoutError::gateway(CheckoutStep::Payment, e))?;
    tracing::info!(payment_intent = %intent.id, amount = request.amount, %currency, "payment intent created");
    Ok(intent)
}
