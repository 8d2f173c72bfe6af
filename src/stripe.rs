//! Stripe payment intents.

use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use crate::checkout::{PaymentGateway, PaymentIntent};
use crate::http::HttpClient;
use crate::GatewayError;

pub const DEFAULT_API_URL: &str = "https://api.stripe.com";
const ENDPOINT: &str = "v1/payment_intents";
const METADATA_SOURCE: &str = "home_and_verse";

pub struct StripeClient {
    http: HttpClient,
    api_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(http: HttpClient, secret_key: impl Into<String>) -> Self {
        Self::with_api_url(http, DEFAULT_API_URL, secret_key)
    }

    pub fn with_api_url(http: HttpClient, api_url: &str, secret_key: impl Into<String>) -> Self {
        Self { http, api_url: api_url.trim_end_matches('/').to_string(), secret_key: secret_key.into() }
    }

    fn payment_intent_form(amount: i64, currency: &str) -> Vec<(&'static str, String)> {
        vec![
            ("amount", amount.to_string()),
            ("currency", currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[source]", METADATA_SOURCE.to_string()),
        ]
    }

    /// Each intent gets its own idempotency key so a resend of the same
    /// request never creates a second intent.
    fn payment_intent_request(&self, amount: i64, currency: &str) -> reqwest::RequestBuilder {
        self.http
            .request(Method::POST, &format!("{}/{ENDPOINT}", self.api_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&Self::payment_intent_form(amount, currency))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, GatewayError> {
        let request = self.payment_intent_request(amount, currency);
        let body = self.http.send_json(request, ENDPOINT).await?;
        serde_json::from_value(body).map_err(|e| GatewayError::Decode { endpoint: ENDPOINT.to_string(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::{local_client, TestServer};
    use crate::http::RetryPolicy;
    use serde_json::json;

    #[test]
    fn test_form_fields() {
        let form = StripeClient::payment_intent_form(6494, "gbp");
        assert!(form.contains(&("amount", "6494".to_string())));
        assert!(form.contains(&("automatic_payment_methods[enabled]", "true".to_string())));
        assert!(form.contains(&("metadata[source]", "home_and_verse".to_string())));
    }

    #[test]
    fn test_request_is_authenticated_form_post() {
        let client = StripeClient::new(HttpClient::new(&RetryPolicy::default()).unwrap(), "sk_test_123");
        let request = client.payment_intent_request(100, "gbp").build().unwrap();
        assert_eq!(request.url().as_str(), "https://api.stripe.com/v1/payment_intents");
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "Bearer sk_test_123");
        let key = request.headers()["Idempotency-Key"].to_str().unwrap();
        assert!(Uuid::parse_str(key).is_ok());
        let body = std::str::from_utf8(request.body().unwrap().as_bytes().unwrap()).unwrap().to_string();
        assert!(body.contains("amount=100"));
        assert!(body.contains("metadata%5Bsource%5D=home_and_verse"));
    }

    #[test]
    fn test_intent_response_shape() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_3Nabc",
            "object": "payment_intent",
            "client_secret": "pi_3Nabc_secret_xyz",
            "amount": 6494
        }))
        .unwrap();
        assert_eq!(intent.id, "pi_3Nabc");
        let out = serde_json::to_value(&intent).unwrap();
        assert_eq!(out, json!({"payment_intent_id": "pi_3Nabc", "client_secret": "pi_3Nabc_secret_xyz"}));
    }

    #[tokio::test]
    async fn test_failed_intent_is_not_resent() {
        let server = TestServer::start(vec![Some((500, r#"{"error": {"message": "Something went wrong"}}"#))]).await;
        let client = StripeClient::with_api_url(local_client(), &server.url, "sk_test_123");
        let err = client.create_payment_intent(6494, "gbp").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 500, ref message, .. } if message == "Something went wrong"));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(server.hits(), 1);
        let head = server.requests()[0].to_ascii_lowercase();
        assert!(head.starts_with("post /v1/payment_intents"));
        assert!(head.contains("idempotency-key: "));
    }
}
