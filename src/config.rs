//! Environment configuration.
//!
//! Only `PORT` can make loading fail. Missing Zoho or Stripe credentials are
//! reported when something actually needs them, so the catalog API keeps
//! serving without them.

use std::path::PathBuf;
use thiserror::Error;

use crate::zoho::{OAuthCredentials, DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),

    #[error("{service} not configured: missing {}", .missing.join(", "))]
    Missing { service: &'static str, missing: Vec<&'static str> },
}

#[derive(Debug, Clone)]
pub struct ZohoConfig {
    pub credentials: OAuthCredentials,
    pub organization_id: String,
    pub accounts_url: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub zoho_client_id: Option<String>,
    pub zoho_client_secret: Option<String>,
    pub zoho_refresh_token: Option<String>,
    pub zoho_org_id: Option<String>,
    pub zoho_accounts_url: Option<String>,
    pub zoho_api_url: Option<String>,
    pub stripe_secret_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            port,
            data_dir: get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()).into(),
            zoho_client_id: get("ZOHO_CLIENT_ID"),
            zoho_client_secret: get("ZOHO_CLIENT_SECRET"),
            zoho_refresh_token: get("ZOHO_REFRESH_TOKEN"),
            zoho_org_id: get("ZOHO_ORG_ID"),
            zoho_accounts_url: get("ZOHO_ACCOUNTS_URL"),
            zoho_api_url: get("ZOHO_API_URL"),
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
        })
    }

    pub fn zoho(&self) -> Result<ZohoConfig, ConfigError> {
        let required = [
            ("ZOHO_CLIENT_ID", &self.zoho_client_id),
            ("ZOHO_CLIENT_SECRET", &self.zoho_client_secret),
            ("ZOHO_REFRESH_TOKEN", &self.zoho_refresh_token),
            ("ZOHO_ORG_ID", &self.zoho_org_id),
        ];
        let missing: Vec<&'static str> = required.iter().filter(|(_, v)| v.is_none()).map(|(k, _)| *k).collect();
        match (&self.zoho_client_id, &self.zoho_client_secret, &self.zoho_refresh_token, &self.zoho_org_id) {
            (Some(client_id), Some(client_secret), Some(refresh_token), Some(org_id)) => Ok(ZohoConfig {
                credentials: OAuthCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                },
                organization_id: org_id.clone(),
                accounts_url: self.zoho_accounts_url.clone().unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
                api_url: self.zoho_api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            }),
            _ => Err(ConfigError::Missing { service: "Zoho", missing }),
        }
    }

    pub fn stripe_secret_key(&self) -> Result<&str, ConfigError> {
        self.stripe_secret_key
            .as_deref()
            .ok_or(ConfigError::Missing { service: "Stripe", missing: vec!["STRIPE_SECRET_KEY"] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(
            config.zoho().unwrap_err(),
            ConfigError::Missing {
                service: "Zoho",
                missing: vec!["ZOHO_CLIENT_ID", "ZOHO_CLIENT_SECRET", "ZOHO_REFRESH_TOKEN", "ZOHO_ORG_ID"],
            }
        );
        assert!(config.stripe_secret_key().is_err());
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(config(&[("PORT", "eighty")]).unwrap_err(), ConfigError::InvalidPort("eighty".into()));
    }

    #[test]
    fn test_zoho_complete() {
        let config = config(&[
            ("ZOHO_CLIENT_ID", "1000.ABC"),
            ("ZOHO_CLIENT_SECRET", "s3cret"),
            ("ZOHO_REFRESH_TOKEN", "1000.refresh"),
            ("ZOHO_ORG_ID", "20071"),
            ("ZOHO_API_URL", "https://www.zohoapis.com/inventory/v1"),
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("PORT", "9000"),
        ])
        .unwrap();
        let zoho = config.zoho().unwrap();
        assert_eq!(zoho.organization_id, "20071");
        assert_eq!(zoho.accounts_url, DEFAULT_ACCOUNTS_URL);
        assert_eq!(zoho.api_url, "https://www.zohoapis.com/inventory/v1");
        assert_eq!(config.stripe_secret_key(), Ok("sk_test_1"));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_blank_counts_as_missing() {
        let config = config(&[
            ("ZOHO_CLIENT_ID", "1000.ABC"),
            ("ZOHO_CLIENT_SECRET", "  "),
            ("ZOHO_REFRESH_TOKEN", "1000.refresh"),
            ("ZOHO_ORG_ID", "20071"),
        ])
        .unwrap();
        let err = config.zoho().unwrap_err();
        assert_eq!(err.to_string(), "Zoho not configured: missing ZOHO_CLIENT_SECRET");
    }
}
