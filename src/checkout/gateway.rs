//! Seams to the inventory system and the payment processor.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Address;
use crate::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contact {
    pub contact_id: String,
    #[serde(default)]
    pub contact_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContact {
    pub contact_name: String,
    pub contact_type: &'static str,
    pub email: String,
    pub phone: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesOrderLine {
    pub item_id: String,
    pub quantity: u32,
    pub rate: Decimal,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSalesOrder {
    pub customer_id: String,
    pub line_items: Vec<SalesOrderLine>,
    pub shipping_charge: Decimal,
    pub notes: String,
    pub terms: String,
    pub is_inclusive_tax: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SalesOrder {
    pub salesorder_id: String,
    pub salesorder_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub organization_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    #[serde(rename(serialize = "payment_intent_id"))]
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>, GatewayError>;
    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, GatewayError>;
    async fn find_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>, GatewayError>;
    async fn create_sales_order(&self, order: &NewSalesOrder) -> Result<SalesOrder, GatewayError>;
    /// First organization visible to the credentials, if any.
    async fn organization(&self) -> Result<Option<Organization>, GatewayError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount` is in minor units.
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub async fn check(gateway: &dyn InventoryGateway) -> Self {
        match gateway.organization().await {
            Ok(Some(org)) => Self {
                success: true,
                organization: Some(org.name),
                org_id: Some(org.organization_id),
                error: None,
            },
            Ok(None) => Self::failed("No organizations found".to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "inventory connection test failed");
                Self::failed(err.to_string())
            }
        }
    }

    fn failed(error: String) -> Self {
        Self { success: false, organization: None, org_id: None, error: Some(error) }
    }
}
