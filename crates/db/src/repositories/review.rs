use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};

use tradepost_core::domain::account::AccountId;
use tradepost_core::domain::offer::OfferId;
use tradepost_core::domain::review::{Review, ReviewId};

use super::{RepositoryError, ReviewListFilter, ReviewOrdering, ReviewRepository};
use crate::DbPool;

pub struct SqlReviewRepository {
    pool: DbPool,
}

impl SqlReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn review_from_row(row: &SqliteRow) -> Result<Review, RepositoryError> {
    let offer_id: Option<String> = row.try_get("offer_id")?;

    Ok(Review {
        id: ReviewId(row.try_get("id")?),
        rating: row.try_get("rating")?,
        description: row.try_get("description")?,
        reviewer_id: AccountId(row.try_get("reviewer_id")?),
        business_id: AccountId(row.try_get("business_id")?),
        offer_id: offer_id.map(OfferId),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn order_clause(ordering: ReviewOrdering) -> &'static str {
    match ordering {
        ReviewOrdering::UpdatedAtAsc => " ORDER BY updated_at ASC",
        ReviewOrdering::UpdatedAtDesc => " ORDER BY updated_at DESC",
        ReviewOrdering::RatingAsc => " ORDER BY rating ASC",
        ReviewOrdering::RatingDesc => " ORDER BY rating DESC",
    }
}

#[async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn create(&self, review: &Review) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO review (id, rating, description, reviewer_id, business_id, offer_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&review.id.0)
        .bind(review.rating)
        .bind(&review.description)
        .bind(&review.reviewer_id.0)
        .bind(&review.business_id.0)
        .bind(review.offer_id.as_ref().map(|id| id.0.clone()))
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM review WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    async fn exists_for_pair(
        &self,
        reviewer: &AccountId,
        business: &AccountId,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM review WHERE reviewer_id = ? AND business_id = ?",
        )
        .bind(&reviewer.0)
        .bind(&business.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn list(&self, filter: &ReviewListFilter) -> Result<Vec<Review>, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT * FROM review WHERE 1 = 1");

        if let Some(business) = &filter.business_id {
            builder.push(" AND business_id = ").push_bind(&business.0);
        }
        if let Some(reviewer) = &filter.reviewer_id {
            builder.push(" AND reviewer_id = ").push_bind(&reviewer.0);
        }
        builder.push(order_clause(filter.ordering));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn update(&self, review: &Review) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE review SET rating = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(review.rating)
            .bind(&review.description)
            .bind(review.updated_at)
            .bind(&review.id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: &ReviewId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM review WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ratings_for_business(&self, id: &AccountId) -> Result<Vec<i64>, RepositoryError> {
        let ratings: Vec<i64> =
            sqlx::query_scalar("SELECT rating FROM review WHERE business_id = ?")
                .bind(&id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(ratings)
    }

    async fn all_ratings(&self) -> Result<Vec<i64>, RepositoryError> {
        let ratings: Vec<i64> =
            sqlx::query_scalar("SELECT rating FROM review").fetch_all(&self.pool).await?;
        Ok(ratings)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review").fetch_one(&self.pool).await?;
        Ok(count)
    }
}
