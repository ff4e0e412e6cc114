//! Public platform statistics.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use tradepost_core::ratings::global_average_rating;
use tradepost_db::repositories::{
    AccountRepository, OfferRepository, ReviewRepository, SqlAccountRepository,
    SqlOfferRepository, SqlReviewRepository,
};

use crate::errors::ApiError;
use crate::state::AppState;

/// `GET /base-info/` — open to anonymous callers. The global average uses
/// the `0.0` empty-set default, unlike the per-business `"-"` sentinel.
pub async fn base_info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let offer_repo = SqlOfferRepository::new(state.db_pool.clone());
    let review_repo = SqlReviewRepository::new(state.db_pool.clone());
    let account_repo = SqlAccountRepository::new(state.db_pool.clone());

    let offer_count = offer_repo.count().await?;
    let review_count = review_repo.count().await?;
    let business_profile_count = account_repo.count_business_profiles().await?;
    let ratings = review_repo.all_ratings().await?;
    let average_rating = global_average_rating(&ratings);

    Ok(Json(json!({
        "review_count": review_count,
        "average_rating": average_rating,
        "business_profile_count": business_profile_count,
        "offer_count": offer_count,
    })))
}
