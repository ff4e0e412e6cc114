//! Review endpoints. One review per (reviewer, business) pair, checked
//! proactively before insert; ratings are unclamped integers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tradepost_core::domain::account::AccountId;
use tradepost_core::domain::review::{Review, ReviewId};
use tradepost_core::pagination::{Page, PageParams};
use tradepost_db::repositories::{
    AccountRepository, ReviewListFilter, ReviewOrdering, ReviewRepository, SqlAccountRepository,
    SqlReviewRepository,
};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::state::AppState;

fn review_json(review: &Review) -> Value {
    json!({
        "id": review.id.0,
        "business_user": review.business_id.0,
        "reviewer": review.reviewer_id.0,
        "rating": review.rating,
        "description": review.description,
        "created_at": review.created_at.to_rfc3339(),
        "updated_at": review.updated_at.to_rfc3339(),
    })
}

fn parse_ordering(raw: Option<&str>) -> ReviewOrdering {
    match raw {
        Some("-updated_at") => ReviewOrdering::UpdatedAtDesc,
        Some("rating") => ReviewOrdering::RatingAsc,
        Some("-rating") => ReviewOrdering::RatingDesc,
        _ => ReviewOrdering::UpdatedAtAsc,
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub business_user_id: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Page<Value>>, ApiError> {
    let ordering = parse_ordering(query.ordering.as_deref());

    // A customer browsing without a business filter sees their own
    // reviews; everyone else sees the optionally filtered full list.
    let filter = if user.actor.is_customer() && query.business_user_id.is_none() {
        ReviewListFilter {
            reviewer_id: Some(user.account.id.clone()),
            business_id: None,
            ordering,
        }
    } else {
        ReviewListFilter {
            business_id: query.business_user_id.map(AccountId),
            reviewer_id: None,
            ordering,
        }
    };

    let repo = SqlReviewRepository::new(state.db_pool.clone());
    let reviews = repo.list(&filter).await?;

    let params = PageParams::resolve(query.page, query.page_size, state.pagination.reviews());
    let page = Page::from_items(reviews.iter().map(review_json).collect(), params);

    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct ReviewCreateBody {
    pub business_user: String,
    pub rating: i64,
    pub description: String,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ReviewCreateBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !user.actor.is_customer() {
        return Err(ApiError::Forbidden("Only customers can create reviews.".to_string()));
    }

    let account_repo = SqlAccountRepository::new(state.db_pool.clone());
    let business = account_repo
        .find_by_id(&AccountId(body.business_user))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    let business_actor = account_repo.load_actor(&business).await?;
    if !business_actor.is_business() {
        return Err(ApiError::Invalid("The specified user is not a business user.".to_string()));
    }

    let repo = SqlReviewRepository::new(state.db_pool.clone());
    if repo.exists_for_pair(&user.account.id, &business.id).await? {
        return Err(ApiError::Invalid("You have already reviewed this business user.".to_string()));
    }

    let now = Utc::now();
    let review = Review {
        id: ReviewId::generate(),
        rating: body.rating,
        description: body.description,
        reviewer_id: user.account.id.clone(),
        business_id: business.id.clone(),
        offer_id: None,
        created_at: now,
        updated_at: now,
    };
    repo.create(&review).await?;

    info!(
        event_name = "system.review.created",
        review_id = %review.id.0,
        business_id = %review.business_id.0,
        "review created"
    );

    Ok((StatusCode::CREATED, Json(review_json(&review))))
}

pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlReviewRepository::new(state.db_pool.clone());

    let review = repo
        .find(&ReviewId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    Ok(Json(review_json(&review)))
}

#[derive(Debug, Deserialize)]
pub struct ReviewUpdateBody {
    pub rating: Option<i64>,
    pub description: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ReviewUpdateBody>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlReviewRepository::new(state.db_pool.clone());

    let mut review = repo
        .find(&ReviewId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    if !user.actor.is_customer() {
        return Err(ApiError::Forbidden("Only customers can edit reviews.".to_string()));
    }
    if review.reviewer_id != user.account.id {
        return Err(ApiError::Forbidden("You are not authorized to edit this review.".to_string()));
    }

    if let Some(rating) = body.rating {
        review.rating = rating;
    }
    if let Some(description) = body.description {
        review.description = description;
    }
    review.updated_at = Utc::now();
    repo.update(&review).await?;

    Ok(Json(review_json(&review)))
}

pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let repo = SqlReviewRepository::new(state.db_pool.clone());

    let review = repo
        .find(&ReviewId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    if review.reviewer_id != user.account.id && !user.actor.is_staff {
        return Err(ApiError::Forbidden(
            "You are not authorized to delete this review.".to_string(),
        ));
    }

    repo.delete(&review.id).await?;
    info!(event_name = "system.review.deleted", review_id = %review.id.0, "review deleted");

    Ok(StatusCode::NO_CONTENT)
}
