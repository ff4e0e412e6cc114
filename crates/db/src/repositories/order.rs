use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tradepost_core::domain::account::AccountId;
use tradepost_core::domain::offer::{OfferId, OfferType, VariantId};
use tradepost_core::domain::order::{Order, OrderId, OrderStatus};

use super::{decode_decimal, decode_string_list, encode_string_list, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let price: String = row.try_get("price")?;
    let features: String = row.try_get("features")?;
    let offer_type: String = row.try_get("offer_type")?;
    let status: String = row.try_get("status")?;
    let variant_id: Option<String> = row.try_get("variant_id")?;

    Ok(Order {
        id: OrderId(row.try_get("id")?),
        customer_id: AccountId(row.try_get("customer_id")?),
        business_id: AccountId(row.try_get("business_id")?),
        offer_id: OfferId(row.try_get("offer_id")?),
        variant_id: variant_id.map(VariantId),
        title: row.try_get("title")?,
        price: decode_decimal(&price)?,
        delivery_time_in_days: row.try_get("delivery_time_in_days")?,
        revisions: row.try_get("revisions")?,
        features: decode_string_list(&features)?,
        offer_type: OfferType::parse(&offer_type)
            .map_err(|_| RepositoryError::Decode(format!("bad offer_type `{offer_type}`")))?,
        status: OrderStatus::parse(&status)
            .map_err(|_| RepositoryError::Decode(format!("bad status `{status}`")))?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, business_id, offer_id, variant_id, title, price,
                                 delivery_time_in_days, revisions, features, offer_type, status,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id.0)
        .bind(&order.customer_id.0)
        .bind(&order.business_id.0)
        .bind(&order.offer_id.0)
        .bind(order.variant_id.as_ref().map(|id| id.0.clone()))
        .bind(&order.title)
        .bind(order.price.to_string())
        .bind(order.delivery_time_in_days)
        .bind(order.revisions)
        .bind(encode_string_list(&order.features)?)
        .bind(order.offer_type.as_str())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_for_customer(&self, id: &AccountId) -> Result<Vec<Order>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM orders WHERE customer_id = ? ORDER BY created_at DESC")
                .bind(&id.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn list_for_business(&self, id: &AccountId) -> Result<Vec<Order>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM orders WHERE business_id = ? ORDER BY created_at DESC")
                .bind(&id.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM orders WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_for_business(
        &self,
        id: &AccountId,
        status: OrderStatus,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE business_id = ? AND status = ?",
        )
        .bind(&id.0)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use tradepost_core::access::Actor;
    use tradepost_core::domain::offer::{Offer, OfferId, OfferType};
    use tradepost_core::domain::order::OrderStatus;
    use tradepost_core::reconcile::{plan_update, VariantPayload, VariantSpec};
    use tradepost_core::snapshot::{create_order, CreationPath};

    use crate::repositories::test_support::{seed_business, seed_customer, test_pool};
    use crate::repositories::{
        OfferRepository, OrderRepository, SqlOfferRepository, SqlOrderRepository,
    };
    use crate::DbPool;

    async fn seed_offer_with_variants(pool: &DbPool) -> (Offer, Vec<tradepost_core::OfferVariant>) {
        seed_business(pool, "b-1").await;
        let repo = SqlOfferRepository::new(pool.clone());
        let offer = Offer {
            id: OfferId("of-1".to_string()),
            owner: tradepost_core::AccountId("b-1".to_string()),
            title: "Shop build".to_string(),
            description: "Online shop in three sizes".to_string(),
            image: None,
            base_price: None,
            base_delivery_time_in_days: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let variants = repo
            .create(
                &offer,
                &[
                    VariantSpec {
                        offer_type: OfferType::Basic,
                        title: "Starter".to_string(),
                        price: Decimal::new(9900, 2),
                        revisions: 1,
                        delivery_time_in_days: 7,
                        features: vec!["Landing page".to_string()],
                    },
                    VariantSpec {
                        offer_type: OfferType::Standard,
                        title: "Shop".to_string(),
                        price: Decimal::new(24900, 2),
                        revisions: 2,
                        delivery_time_in_days: 14,
                        features: vec!["Catalog".to_string(), "Checkout".to_string()],
                    },
                    VariantSpec {
                        offer_type: OfferType::Premium,
                        title: "Shop Plus".to_string(),
                        price: Decimal::new(49900, 2),
                        revisions: 5,
                        delivery_time_in_days: 21,
                        features: vec!["Everything".to_string()],
                    },
                ],
            )
            .await
            .expect("create offer");
        (offer, variants)
    }

    fn customer_actor(id: &str) -> Actor {
        Actor {
            id: tradepost_core::AccountId(id.to_string()),
            is_staff: false,
            has_business_profile: false,
            has_customer_profile: true,
        }
    }

    #[tokio::test]
    async fn order_snapshot_round_trips_through_storage() {
        let pool = test_pool().await;
        let (offer, variants) = seed_offer_with_variants(&pool).await;
        seed_customer(&pool, "c-1").await;

        let order = create_order(
            &customer_actor("c-1"),
            &offer,
            &variants[1],
            CreationPath::Direct,
            Utc::now(),
        )
        .expect("create order");

        let repo = SqlOrderRepository::new(pool.clone());
        repo.create(&order).await.expect("persist order");

        let stored = repo.find(&order.id).await.expect("find").expect("exists");
        assert_eq!(stored.title, "Shop");
        assert_eq!(stored.price, Decimal::new(24900, 2));
        assert_eq!(stored.status, OrderStatus::InProgress);
        assert_eq!(stored.features, vec!["Catalog".to_string(), "Checkout".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_survives_deletion_of_the_source_variant() {
        let pool = test_pool().await;
        let (mut offer, variants) = seed_offer_with_variants(&pool).await;
        seed_customer(&pool, "c-1").await;

        let order_repo = SqlOrderRepository::new(pool.clone());
        let order = create_order(
            &customer_actor("c-1"),
            &offer,
            &variants[1],
            CreationPath::Direct,
            Utc::now(),
        )
        .expect("create order");
        order_repo.create(&order).await.expect("persist order");

        // Reconcile the offer down to basic only; standard and premium go away.
        let offer_repo = SqlOfferRepository::new(pool.clone());
        let plan = plan_update(&variants, &[VariantPayload {
            offer_type: OfferType::Basic,
            title: None,
            price: None,
            revisions: None,
            delivery_time_in_days: None,
            features: None,
        }])
        .expect("plan");
        offer.updated_at = Utc::now();
        offer_repo.update(&offer, &plan).await.expect("apply plan");

        let stored = order_repo.find(&order.id).await.expect("find").expect("exists");
        assert_eq!(stored.variant_id, None, "the source link is severed");
        assert_eq!(stored.title, "Shop", "the snapshot keeps its copied fields");
        assert_eq!(stored.price, Decimal::new(24900, 2));
    }

    #[tokio::test]
    async fn status_counts_are_scoped_to_the_business() {
        let pool = test_pool().await;
        let (offer, variants) = seed_offer_with_variants(&pool).await;
        seed_customer(&pool, "c-1").await;

        let repo = SqlOrderRepository::new(pool.clone());
        let order = create_order(
            &customer_actor("c-1"),
            &offer,
            &variants[0],
            CreationPath::Direct,
            Utc::now(),
        )
        .expect("create order");
        repo.create(&order).await.expect("persist order");

        let business = tradepost_core::AccountId("b-1".to_string());
        assert_eq!(
            repo.count_for_business(&business, OrderStatus::InProgress).await.expect("count"),
            1
        );
        assert_eq!(
            repo.count_for_business(&business, OrderStatus::Completed).await.expect("count"),
            0
        );

        repo.update_status(&order.id, OrderStatus::Completed, Utc::now())
            .await
            .expect("update status");
        assert_eq!(
            repo.count_for_business(&business, OrderStatus::Completed).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn order_lists_are_scoped_per_side() {
        let pool = test_pool().await;
        let (offer, variants) = seed_offer_with_variants(&pool).await;
        seed_customer(&pool, "c-1").await;
        seed_customer(&pool, "c-2").await;

        let repo = SqlOrderRepository::new(pool.clone());
        let order = create_order(
            &customer_actor("c-1"),
            &offer,
            &variants[0],
            CreationPath::Standard,
            Utc::now(),
        )
        .expect("create order");
        repo.create(&order).await.expect("persist order");

        let business = tradepost_core::AccountId("b-1".to_string());
        assert_eq!(repo.list_for_business(&business).await.expect("list").len(), 1);
        assert_eq!(
            repo.list_for_customer(&tradepost_core::AccountId("c-1".to_string()))
                .await
                .expect("list")
                .len(),
            1
        );
        assert!(repo
            .list_for_customer(&tradepost_core::AccountId("c-2".to_string()))
            .await
            .expect("list")
            .is_empty());
    }
}
