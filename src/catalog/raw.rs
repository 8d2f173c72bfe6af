//! Typed view of an inventory item as the inventory API returns it.
//!
//! The API payload is loosely typed: ids arrive as strings or numbers, rates
//! as numbers or numeric strings, brand sits in either `brand` or
//! `manufacturer`. Everything is settled here so the rest of the importer
//! works on [`RawItem`] only.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub status: String,
    /// `brand`, falling back to `manufacturer`.
    pub brand: Option<String>,
    pub rate: Decimal,
    pub stock_on_hand: i64,
    pub description: String,
    /// `ean`, falling back to `upc`.
    pub ean: String,
    pub image_document_id: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RawItemError {
    #[error("item has no item_id")]
    MissingItemId,

    #[error("item {item_id}: field `{field}` has unusable value {value}")]
    InvalidField {
        item_id: String,
        field: &'static str,
        value: String,
    },
}

impl RawItem {
    pub fn from_value(value: &Value) -> Result<Self, RawItemError> {
        let item_id = value
            .get("item_id")
            .and_then(value_as_string)
            .ok_or(RawItemError::MissingItemId)?;

        let sku = text(value, "sku").unwrap_or_else(|| item_id.clone());
        let name = text(value, "name").unwrap_or_else(|| sku.clone());
        let brand = text(value, "brand").or_else(|| text(value, "manufacturer"));

        let rate = match value.get("rate") {
            None | Some(Value::Null) => Decimal::ZERO,
            Some(v) => value_as_decimal(v).ok_or_else(|| invalid(&item_id, "rate", v))?,
        };
        let stock_on_hand = match value.get("stock_on_hand") {
            None | Some(Value::Null) => 0,
            Some(v) => value_as_i64(v).ok_or_else(|| invalid(&item_id, "stock_on_hand", v))?,
        };

        Ok(Self {
            item_id,
            sku,
            name,
            status: text(value, "status").unwrap_or_default(),
            brand,
            rate,
            stock_on_hand,
            description: text(value, "description").unwrap_or_default(),
            ean: text(value, "ean").or_else(|| text(value, "upc")).unwrap_or_default(),
            image_document_id: value.get("image_document_id").and_then(value_as_string),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

fn invalid(item_id: &str, field: &'static str, value: &Value) -> RawItemError {
    RawItemError::InvalidField {
        item_id: item_id.to_owned(),
        field,
        value: value.to_string(),
    }
}

/// Non-empty string field; empty strings count as absent.
fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_decimal(value: &Value) -> Option<Decimal> {
    let repr = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => return Some(Decimal::ZERO),
        Value::String(s) => s.trim().to_owned(),
        _ => return None,
    };
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .ok()
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
