//! Consumer filtering: which inventory items are not retail goods.

use lazy_regex::{regex_captures, regex_is_match};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::raw::RawItem;

/// Smallest pack size treated as a wholesale multi-pack.
pub const MULTIPACK_THRESHOLD: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    ZeroPrice,
    DisplayItem,
    BulkTray,
    WholesaleMultipack,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroPrice => "zero_price",
            Self::DisplayItem => "display_item",
            Self::BulkTray => "bulk_tray",
            Self::WholesaleMultipack => "wholesale_multipack",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the first reason that keeps `item` off the consumer site.
pub fn should_exclude(item: &RawItem) -> Option<ExclusionReason> {
    let name = item.name.to_lowercase();
    let sku = item.sku.to_lowercase();

    if item.rate <= Decimal::ZERO {
        return Some(ExclusionReason::ZeroPrice);
    }
    if name.contains("display") || sku.contains("display") || sku.contains(".disp") {
        return Some(ExclusionReason::DisplayItem);
    }
    // tray.24, tray_24, ...
    if regex_is_match!(r"tray[._]\d+", &sku) {
        return Some(ExclusionReason::BulkTray);
    }
    // "72 stk", "16 pcs", "24 pieces", "12 units"
    if let Some((_, count, _)) = regex_captures!(r"(\d+)\s*(stk|pcs|pieces|units)", &name) {
        if count.parse::<u32>().map_or(true, |n| n >= MULTIPACK_THRESHOLD) {
            return Some(ExclusionReason::WholesaleMultipack);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(sku: &str, name: &str, rate: Decimal) -> RawItem {
        RawItem {
            item_id: "1".into(),
            sku: sku.into(),
            name: name.into(),
            status: "active".into(),
            brand: Some("Räder".into()),
            rate,
            stock_on_hand: 3,
            description: String::new(),
            ean: String::new(),
            image_document_id: None,
        }
    }

    #[test]
    fn test_exclusion_table() {
        let cases = [
            (item("RD-1", "Light House", dec!(0)), Some(ExclusionReason::ZeroPrice)),
            (item("RD-1", "Light House", dec!(-3)), Some(ExclusionReason::ZeroPrice)),
            (item("RD-2", "Counter Display Stars", dec!(40)), Some(ExclusionReason::DisplayItem)),
            (item("RD-2.DISP", "Stars", dec!(40)), Some(ExclusionReason::DisplayItem)),
            (item("RD-3.tray.24", "Tealight", dec!(2)), Some(ExclusionReason::BulkTray)),
            (item("RD-3_TRAY_6", "Tealight", dec!(2)), Some(ExclusionReason::BulkTray)),
            (item("RD-4", "Porcelain Stars 72 Stk", dec!(90)), Some(ExclusionReason::WholesaleMultipack)),
            (item("RD-4", "Matches 12pcs", dec!(9)), Some(ExclusionReason::WholesaleMultipack)),
            (item("RD-5", "Napkins 6 pcs", dec!(3)), None),
            (item("RD-6", "Christmas Star Tealight Holder", dec!(8.3)), None),
            (item("RD-7", "Traybake Dish", dec!(5)), None),
        ];
        for (raw, expected) in cases {
            assert_eq!(should_exclude(&raw), expected, "{} / {}", raw.sku, raw.name);
        }
    }

    #[test]
    fn test_zero_price_checked_first() {
        let raw = item("RD-9.disp", "Display 24 pcs", dec!(0));
        assert_eq!(should_exclude(&raw), Some(ExclusionReason::ZeroPrice));
    }
}
