//! Derived pricing aggregates over an offer's variant set.
//!
//! Always computed from the variant rows handed in at read time; there is
//! no cache to invalidate, so the result reflects the latest committed
//! variant writes.

use rust_decimal::Decimal;

use crate::domain::offer::OfferVariant;

/// Minimum variant price, rescaled to exactly two decimal places.
/// `None` iff the variant set is empty.
pub fn min_price(variants: &[OfferVariant]) -> Option<Decimal> {
    variants.iter().map(|variant| variant.price).min().map(|price| price.round_dp(2))
}

/// Minimum delivery time in days across the variant set, or `None` iff
/// the set is empty.
pub fn min_delivery_time(variants: &[OfferVariant]) -> Option<i64> {
    variants.iter().map(|variant| variant.delivery_time_in_days).min()
}
