//! Retail pricing policy.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Retail = trade × MARKUP before rounding.
pub const MARKUP: Decimal = dec!(2.4);

/// Rounds `trade × MARKUP` to whole pounds (ties to even) and prices it at
/// `.95` below. When that would not be positive the price becomes `x.95`
/// above the rounded amount instead. Non-positive trade prices yield zero;
/// such items never survive filtering.
pub fn compute_retail_price(trade_price: Decimal) -> Decimal {
    if trade_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rounded = (trade_price * MARKUP).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    let under = rounded - dec!(0.05);
    if under > Decimal::ZERO {
        under
    } else {
        rounded + dec!(0.95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_table() {
        let cases = [
            (dec!(8.30), dec!(19.95)),  // 19.92 -> 20
            (dec!(25.00), dec!(59.95)), // 60
            (dec!(1.00), dec!(1.95)),   // 2.4 -> 2
            (dec!(0.10), dec!(0.95)),   // 0.24 -> 0, so +0.95
            (dec!(0.25), dec!(0.95)),   // 0.6 -> 1 -> 0.95
            (dec!(1.875), dec!(3.95)),  // 4.5 -> 4 (ties to even)
            (dec!(2.2916666), dec!(4.95)),
        ];
        for (trade, retail) in cases {
            assert_eq!(compute_retail_price(trade), retail, "trade {trade}");
        }
    }

    #[test]
    fn test_always_positive_and_ends_in_95() {
        let mut trade = dec!(0.01);
        while trade < dec!(250) {
            let retail = compute_retail_price(trade);
            assert!(retail > Decimal::ZERO, "trade {trade}");
            assert_eq!(retail.fract(), dec!(0.95), "trade {trade}");
            assert_eq!(retail, compute_retail_price(trade));
            trade += dec!(0.37);
        }
    }

    #[test]
    fn test_non_positive_trade() {
        assert_eq!(compute_retail_price(dec!(0)), Decimal::ZERO);
        assert_eq!(compute_retail_price(dec!(-4)), Decimal::ZERO);
    }
}
