//! Review rating aggregation.
//!
//! Two call sites consume the average with different empty-set defaults:
//! the per-business profile payload renders the `"-"` sentinel, while the
//! global statistics payload reports `0.0`. Both round to one decimal.

/// Arithmetic mean of the ratings rounded to one decimal place, or `None`
/// when there are no reviews.
pub fn average_rating(ratings: &[i64]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let sum: i64 = ratings.iter().sum();
    let mean = sum as f64 / ratings.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// The global-statistics default: an empty review set contributes `0.0`,
/// not the per-business `"-"` sentinel.
pub fn global_average_rating(ratings: &[i64]) -> f64 {
    average_rating(ratings).unwrap_or(0.0)
}
