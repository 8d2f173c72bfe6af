//! Zoho Inventory API client.
//!
//! One client serves the importer (item pages, item images), the bestseller
//! generator (sales order history) and the checkout (contacts, item lookup,
//! sales orders). Every request carries the
//! organization id and an OAuth token from the [`TokenProvider`].

pub mod auth;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::bestsellers::{DateRange, SalesOrderSummary, SalesOrdersPage, SalesSource, SoldLine};
use crate::catalog::{InventorySource, ItemsPage};
use crate::checkout::{Contact, InventoryGateway, InventoryItem, NewContact, NewSalesOrder, Organization, SalesOrder};
use crate::http::{error_message, HttpClient};
use crate::GatewayError;

pub use auth::{CachedToken, OAuthCredentials, RefreshTokenProvider, StaticToken, TokenProvider};

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.eu";
pub const DEFAULT_API_URL: &str = "https://www.zohoapis.eu/inventory/v1";

pub struct ZohoClient {
    http: HttpClient,
    api_url: String,
    organization_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ZohoClient {
    pub fn new(http: HttpClient, api_url: &str, organization_id: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            organization_id: organization_id.into(),
            tokens,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint)
    }

    async fn request(&self, method: Method, endpoint: &str) -> Result<reqwest::RequestBuilder, GatewayError> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .http
            .request(method, &self.url(endpoint))
            .header(reqwest::header::AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
            .query(&[("organization_id", self.organization_id.as_str())]))
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let request = self.request(Method::GET, endpoint).await?.query(query);
        let body = self.http.send_json(request, endpoint).await?;
        check_code(endpoint, body)
    }

    async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, payload: &T) -> Result<Value, GatewayError> {
        let request = self.request(Method::POST, endpoint).await?.json(payload);
        let body = self.http.send_json(request, endpoint).await?;
        check_code(endpoint, body)
    }
}

/// Zoho reports some failures as HTTP 200 with a non-zero `code`.
fn check_code(endpoint: &str, body: Value) -> Result<Value, GatewayError> {
    match body.get("code").and_then(Value::as_i64) {
        Some(code) if code != 0 => Err(GatewayError::Status {
            endpoint: endpoint.to_string(),
            status: 200,
            message: format!("code {code}: {}", error_message(&body.to_string())),
        }),
        _ => Ok(body),
    }
}

fn field<T: DeserializeOwned>(endpoint: &str, body: &Value, key: &str) -> Result<T, GatewayError> {
    let value = body.get(key).cloned().ok_or_else(|| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        reason: format!("missing `{key}`"),
    })?;
    serde_json::from_value(value).map_err(|e| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        reason: format!("`{key}`: {e}"),
    })
}

/// First element of a list field, if any.
fn first<T: DeserializeOwned>(endpoint: &str, body: &Value, key: &str) -> Result<Option<T>, GatewayError> {
    let list: Vec<Value> = match body.get(key) {
        Some(_) => field(endpoint, body, key)?,
        None => return Ok(None),
    };
    list.into_iter()
        .next()
        .map(|v| {
            serde_json::from_value(v).map_err(|e| GatewayError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

pub fn parse_items_page(body: &Value) -> ItemsPage {
    ItemsPage {
        items: body.get("items").and_then(Value::as_array).cloned().unwrap_or_default(),
        has_more_page: body["page_context"]["has_more_page"].as_bool().unwrap_or(false),
    }
}

#[async_trait]
impl InventorySource for ZohoClient {
    async fn fetch_items_page(&self, page: u32, per_page: u32) -> Result<ItemsPage, GatewayError> {
        let (page, per_page) = (page.to_string(), per_page.to_string());
        let body = self.get("items", &[("page", &page), ("per_page", &per_page)]).await?;
        Ok(parse_items_page(&body))
    }

    async fn fetch_item_image(&self, item_id: &str) -> Result<Option<Vec<u8>>, GatewayError> {
        let endpoint = format!("items/{item_id}/image");
        let request = self.request(Method::GET, &endpoint).await?;
        match self.http.send(request, &endpoint).await {
            Ok(response) => {
                let bytes = response.bytes().await.map_err(|e| GatewayError::Transport {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                })?;
                Ok(Some(bytes.to_vec()))
            }
            Err(GatewayError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Entries without a `salesorder_id` are dropped.
pub fn parse_sales_orders_page(body: &Value) -> SalesOrdersPage {
    let orders = body
        .get("salesorders")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|v| serde_json::from_value(v.clone()).ok()).collect())
        .unwrap_or_default();
    SalesOrdersPage {
        orders,
        has_more_page: body["page_context"]["has_more_page"].as_bool().unwrap_or(false),
    }
}

#[async_trait]
impl SalesSource for ZohoClient {
    async fn fetch_sales_orders_page(&self, window: &DateRange, page: u32, per_page: u32) -> Result<SalesOrdersPage, GatewayError> {
        let (page, per_page) = (page.to_string(), per_page.to_string());
        let (start, end) = (window.start.to_string(), window.end.to_string());
        let query = [
            ("page", page.as_str()),
            ("per_page", per_page.as_str()),
            ("date_start", start.as_str()),
            ("date_end", end.as_str()),
            ("sort_column", "date"),
            ("sort_order", "D"),
        ];
        let body = self.get("salesorders", &query).await?;
        Ok(parse_sales_orders_page(&body))
    }

    async fn fetch_sales_order_lines(&self, salesorder_id: &str) -> Result<Vec<SoldLine>, GatewayError> {
        let endpoint = format!("salesorders/{salesorder_id}");
        let body = self.get(&endpoint, &[]).await?;
        let lines = body["salesorder"].get("line_items").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(lines).map_err(|e| GatewayError::Decode { endpoint, reason: e.to_string() })
    }
}

#[async_trait]
impl InventoryGateway for ZohoClient {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>, GatewayError> {
        let body = self.get("contacts", &[("email", email)]).await?;
        first("contacts", &body, "contacts")
    }

    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, GatewayError> {
        let body = self.post("contacts", contact).await?;
        let created: Contact = field("contacts", &body, "contact")?;
        tracing::info!(contact_id = %created.contact_id, "created Zoho contact");
        Ok(created)
    }

    async fn find_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>, GatewayError> {
        let body = self.get("items", &[("sku", sku)]).await?;
        first("items", &body, "items")
    }

    async fn create_sales_order(&self, order: &NewSalesOrder) -> Result<SalesOrder, GatewayError> {
        let body = self.post("salesorders", order).await?;
        let created: SalesOrder = field("salesorders", &body, "salesorder")?;
        tracing::info!(
            salesorder_id = %created.salesorder_id,
            salesorder_number = %created.salesorder_number,
            "created Zoho sales order"
        );
        Ok(created)
    }

    async fn organization(&self) -> Result<Option<Organization>, GatewayError> {
        let body = self.get("organizations", &[]).await?;
        first("organizations", &body, "organizations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_items_page() {
        let body = json!({
            "code": 0,
            "items": [{"item_id": "1"}, {"item_id": "2"}],
            "page_context": {"page": 1, "per_page": 200, "has_more_page": true}
        });
        let page = parse_items_page(&body);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more_page);

        let last = parse_items_page(&json!({"items": []}));
        assert!(last.items.is_empty());
        assert!(!last.has_more_page);
    }

    #[test]
    fn test_nonzero_code_is_an_error() {
        let err = check_code("items", json!({"code": 57, "message": "You are not authorized"})).unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 200, .. }));
        assert!(err.to_string().contains("You are not authorized"));
        assert!(check_code("items", json!({"code": 0, "items": []})).is_ok());
    }

    #[test]
    fn test_first_contact() {
        let body = json!({"contacts": [
            {"contact_id": "460000000026049", "contact_name": "Jo Bloggs", "email": "jo@example.com"},
            {"contact_id": "460000000026050", "contact_name": "Jo B"}
        ]});
        let contact: Option<Contact> = first("contacts", &body, "contacts").unwrap();
        assert_eq!(contact.unwrap().contact_id, "460000000026049");

        let none: Option<Contact> = first("contacts", &json!({"contacts": []}), "contacts").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_sales_order_field() {
        let body = json!({"code": 0, "salesorder": {"salesorder_id": "9", "salesorder_number": "SO-00042", "total": 64.94}});
        let order: SalesOrder = field("salesorders", &body, "salesorder").unwrap();
        assert_eq!(order.salesorder_number, "SO-00042");
        assert!(field::<SalesOrder>("salesorders", &json!({}), "salesorder").is_err());
    }

    #[test]
    fn test_sales_order_payload_shape() {
        use crate::checkout::SalesOrderLine;
        use rust_decimal_macros::dec;
        let order = NewSalesOrder {
            customer_id: "c1".into(),
            line_items: vec![SalesOrderLine { item_id: "i1".into(), quantity: 2, rate: dec!(59.95), name: "Star".into() }],
            shipping_charge: dec!(0),
            notes: "n".into(),
            terms: "t".into(),
            is_inclusive_tax: true,
            reference_number: None,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["line_items"][0]["rate"], json!(59.95));
        assert_eq!(value["is_inclusive_tax"], json!(true));
        assert!(value.get("reference_number").is_none());
    }

    #[tokio::test]
    async fn test_requests_carry_token_and_org() {
        let http = HttpClient::new(&crate::http::RetryPolicy::default()).unwrap();
        let client = ZohoClient::new(http, "https://example.invalid/inventory/v1/", "20071", Arc::new(StaticToken("tok".into())));
        let request = client.request(Method::GET, "items").await.unwrap().build().unwrap();
        assert_eq!(request.url().as_str(), "https://example.invalid/inventory/v1/items?organization_id=20071");
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "Zoho-oauthtoken tok");
    }

    #[tokio::test]
    async fn test_sales_order_is_posted_once_when_zoho_stalls() {
        use crate::checkout::SalesOrderLine;
        use crate::http::tests::{local_client, TestServer};
        use rust_decimal_macros::dec;

        let server = TestServer::start(vec![None]).await;
        let http = local_client();
        let client = ZohoClient::new(http, &server.url, "20071", Arc::new(StaticToken("tok".into())));
        let order = NewSalesOrder {
            customer_id: "c1".into(),
            line_items: vec![SalesOrderLine { item_id: "i1".into(), quantity: 1, rate: dec!(59.95), name: "Star".into() }],
            shipping_charge: dec!(4.99),
            notes: "n".into(),
            terms: "t".into(),
            is_inclusive_tax: true,
            reference_number: Some("pi_123".into()),
        };

        let err = client.create_sales_order(&order).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { ref endpoint, .. } if endpoint == "salesorders"));
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(server.hits(), 1);
        assert!(server.requests()[0].starts_with("POST /salesorders?organization_id=20071"));
    }

    #[tokio::test]
    async fn test_item_lookup_retries_when_rate_limited() {
        use crate::http::tests::{local_client, TestServer};

        let server = TestServer::start(vec![
            Some((429, r#"{"code": 43, "message": "Too many requests"}"#)),
            Some((200, r#"{"code": 0, "items": [{"item_id": "i1", "name": "Star", "sku": "RD-1"}]}"#)),
        ])
        .await;
        let http = local_client();
        let client = ZohoClient::new(http, &server.url, "20071", Arc::new(StaticToken("tok".into())));

        let item = client.find_item_by_sku("RD-1").await.unwrap().unwrap();
        assert_eq!(item.item_id, "i1");
        assert_eq!(server.hits(), 2);
    }

    #[test]
    fn test_parse_sales_orders_page() {
        let body = json!({
            "code": 0,
            "salesorders": [
                {"salesorder_id": "1", "order_status": "confirmed", "date": "2024-11-02"},
                {"order_status": "draft"},
                {"salesorder_id": "3", "order_status": "void"}
            ],
            "page_context": {"has_more_page": false}
        });
        let page = parse_sales_orders_page(&body);
        let ids: Vec<&str> = page.orders.iter().map(|o| o.salesorder_id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert!(!page.has_more_page);
    }

    #[tokio::test]
    async fn test_sales_history_requests() {
        use crate::http::tests::{local_client, TestServer};
        use chrono::{TimeZone, Utc};
        use rust_decimal_macros::dec;

        let server = TestServer::start(vec![
            Some((200, r#"{"code": 0, "salesorders": [{"salesorder_id": "9", "order_status": "fulfilled"}], "page_context": {"has_more_page": true}}"#)),
            Some((200, r#"{"code": 0, "salesorder": {"line_items": [{"item_id": "i1", "sku": "RD-1", "name": "Star", "quantity": 2, "item_total": 119.9}]}}"#)),
        ])
        .await;
        let http = local_client();
        let client = ZohoClient::new(http, &server.url, "20071", Arc::new(StaticToken("tok".into())));
        let window = DateRange::trailing(Utc.with_ymd_and_hms(2024, 11, 30, 0, 0, 0).unwrap(), 90);

        let page = client.fetch_sales_orders_page(&window, 1, 200).await.unwrap();
        assert_eq!(page.orders[0].salesorder_id, "9");
        assert!(page.has_more_page);
        let lines = client.fetch_sales_order_lines("9").await.unwrap();
        assert_eq!(lines[0].quantity, dec!(2));
        assert_eq!(lines[0].item_total, dec!(119.9));

        let requests = server.requests();
        assert!(requests[0].starts_with("GET /salesorders?organization_id=20071&page=1&per_page=200&date_start=2024-09-01&date_end=2024-11-30"));
        assert!(requests[1].starts_with("GET /salesorders/9?organization_id=20071"));
    }
}
