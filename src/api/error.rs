use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::checkout::{CheckoutError, CheckoutStep};
use crate::config::ConfigError;
use crate::{GatewayError, StoreError};

#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    UnknownSku { sku: String, message: String },
    NotFound(String),
    ExternalService { step: Option<CheckoutStep>, sku: Option<String>, message: String },
    Configuration(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<CheckoutStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<&'a str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownSku { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, step, sku) = match &self {
            Self::InvalidRequest(m) | Self::NotFound(m) | Self::Configuration(m) | Self::Internal(m) => (m.as_str(), None, None),
            Self::UnknownSku { sku, message } => (message.as_str(), Some(CheckoutStep::Validate), Some(sku.as_str())),
            Self::ExternalService { step, sku, message } => (message.as_str(), *step, sku.as_deref()),
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), ?step, sku, error, "request failed");
        }
        (status, Json(ErrorBody { error, step, sku })).into_response()
    }
}

/// Malformed or mistyped bodies keep the JSON error shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured { .. } => Self::Configuration(err.to_string()),
            other => Self::ExternalService { step: None, sku: None, message: other.to_string() },
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::InvalidRequest(_) => Self::InvalidRequest(message),
            CheckoutError::UnknownSku { sku } => Self::UnknownSku { sku, message },
            CheckoutError::Gateway { source: GatewayError::NotConfigured { .. }, .. } => Self::Configuration(message),
            CheckoutError::ItemNotInInventory { step, sku } => Self::ExternalService { step: Some(step), sku: Some(sku), message },
            CheckoutError::Gateway { step, sku, .. } => Self::ExternalService { step: Some(step), sku, message },
            CheckoutError::State { .. } | CheckoutError::Store(_) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_error_statuses() {
        let cases = [
            (CheckoutError::InvalidRequest("cart is empty".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CheckoutError::UnknownSku { sku: "X".into() }, StatusCode::BAD_REQUEST),
            (
                CheckoutError::ItemNotInInventory { step: CheckoutStep::LookupItem, sku: "X".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                CheckoutError::Gateway {
                    step: CheckoutStep::Payment,
                    sku: None,
                    source: GatewayError::NotConfigured { service: "Stripe" },
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CheckoutError::Gateway {
                    step: CheckoutStep::CreateOrder,
                    sku: None,
                    source: GatewayError::Transport { endpoint: "salesorders".into(), message: "timed out".into() },
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_config_error_is_unavailable() {
        let err = ApiError::from(ConfigError::Missing { service: "Stripe", missing: vec!["STRIPE_SECRET_KEY"] });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
