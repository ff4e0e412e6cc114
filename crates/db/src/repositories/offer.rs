use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};

use tradepost_core::domain::account::AccountId;
use tradepost_core::domain::offer::{Offer, OfferId, OfferType, OfferVariant, VariantId};
use tradepost_core::reconcile::{ReconcilePlan, VariantSpec, VariantWrite};

use super::{
    decode_decimal, decode_string_list, encode_string_list, OfferListFilter, OfferRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlOfferRepository {
    pool: DbPool,
}

impl SqlOfferRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn offer_from_row(row: &SqliteRow) -> Result<Offer, RepositoryError> {
    let base_price: Option<String> = row.try_get("base_price")?;

    Ok(Offer {
        id: OfferId(row.try_get("id")?),
        owner: AccountId(row.try_get("owner_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        base_price: base_price.as_deref().map(decode_decimal).transpose()?,
        base_delivery_time_in_days: row.try_get("base_delivery_time_in_days")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn variant_from_row(row: &SqliteRow) -> Result<OfferVariant, RepositoryError> {
    let offer_type: String = row.try_get("offer_type")?;
    let price: String = row.try_get("price")?;
    let features: String = row.try_get("features")?;

    Ok(OfferVariant {
        id: VariantId(row.try_get("id")?),
        offer_id: OfferId(row.try_get("offer_id")?),
        title: row.try_get("title")?,
        price: decode_decimal(&price)?,
        delivery_time_in_days: row.try_get("delivery_time_in_days")?,
        revisions: row.try_get("revisions")?,
        offer_type: OfferType::parse(&offer_type)
            .map_err(|_| RepositoryError::Decode(format!("bad offer_type `{offer_type}`")))?,
        features: decode_string_list(&features)?,
    })
}

async fn insert_variant(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    offer_id: &OfferId,
    id: &VariantId,
    spec: &VariantSpec,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO offer_variant (id, offer_id, title, price, delivery_time_in_days, revisions, offer_type, features)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id.0)
    .bind(&offer_id.0)
    .bind(&spec.title)
    .bind(spec.price.to_string())
    .bind(spec.delivery_time_in_days)
    .bind(spec.revisions)
    .bind(spec.offer_type.as_str())
    .bind(encode_string_list(&spec.features)?)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl OfferRepository for SqlOfferRepository {
    async fn create(
        &self,
        offer: &Offer,
        specs: &[VariantSpec],
    ) -> Result<Vec<OfferVariant>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO offer (id, owner_id, title, description, image, base_price, base_delivery_time_in_days, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&offer.id.0)
        .bind(&offer.owner.0)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.image)
        .bind(offer.base_price.map(|price| price.to_string()))
        .bind(offer.base_delivery_time_in_days)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut variants = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = VariantId::generate();
            insert_variant(&mut tx, &offer.id, &id, spec).await?;
            variants.push(OfferVariant {
                id,
                offer_id: offer.id.clone(),
                title: spec.title.clone(),
                price: spec.price,
                delivery_time_in_days: spec.delivery_time_in_days,
                revisions: spec.revisions,
                offer_type: spec.offer_type,
                features: spec.features.clone(),
            });
        }

        tx.commit().await?;
        Ok(variants)
    }

    async fn find(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM offer WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(offer_from_row).transpose()
    }

    async fn find_for_owner(
        &self,
        id: &OfferId,
        owner: &AccountId,
    ) -> Result<Option<Offer>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM offer WHERE id = ? AND owner_id = ?")
            .bind(&id.0)
            .bind(&owner.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(offer_from_row).transpose()
    }

    async fn list(&self, filter: &OfferListFilter) -> Result<Vec<Offer>, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT * FROM offer WHERE 1 = 1");

        if let Some(creator) = &filter.creator_id {
            builder.push(" AND owner_id = ").push_bind(&creator.0);
        }
        if let Some(search) = &filter.search {
            let needle = format!("%{search}%");
            builder
                .push(" AND (title LIKE ")
                .push_bind(needle.clone())
                .push(" OR description LIKE ")
                .push_bind(needle)
                .push(")");
        }
        builder.push(" ORDER BY updated_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(offer_from_row).collect()
    }

    async fn variants_for(&self, id: &OfferId) -> Result<Vec<OfferVariant>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM offer_variant WHERE offer_id = ?
             ORDER BY CASE offer_type
                 WHEN 'basic' THEN 0 WHEN 'standard' THEN 1 ELSE 2 END",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(variant_from_row).collect()
    }

    async fn variants_for_offers(
        &self,
        ids: &[OfferId],
    ) -> Result<Vec<OfferVariant>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new("SELECT * FROM offer_variant WHERE offer_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(&id.0);
        }
        builder.push(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(variant_from_row).collect()
    }

    async fn variant(&self, id: &VariantId) -> Result<Option<OfferVariant>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM offer_variant WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(variant_from_row).transpose()
    }

    async fn update(&self, offer: &Offer, plan: &ReconcilePlan) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE offer SET title = ?, description = ?, image = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.image)
        .bind(offer.updated_at)
        .bind(&offer.id.0)
        .execute(&mut *tx)
        .await?;

        for write in &plan.writes {
            match write {
                VariantWrite::Update { id, spec } => {
                    sqlx::query(
                        "UPDATE offer_variant
                         SET title = ?, price = ?, delivery_time_in_days = ?, revisions = ?, offer_type = ?, features = ?
                         WHERE id = ?",
                    )
                    .bind(&spec.title)
                    .bind(spec.price.to_string())
                    .bind(spec.delivery_time_in_days)
                    .bind(spec.revisions)
                    .bind(spec.offer_type.as_str())
                    .bind(encode_string_list(&spec.features)?)
                    .bind(&id.0)
                    .execute(&mut *tx)
                    .await?;
                }
                VariantWrite::Insert(spec) => {
                    insert_variant(&mut tx, &offer.id, &VariantId::generate(), spec).await?;
                }
            }
        }

        for id in &plan.deletes {
            sqlx::query("DELETE FROM offer_variant WHERE id = ?")
                .bind(&id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &OfferId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM offer WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offer").fetch_one(&self.pool).await?;
        Ok(count)
    }
}
