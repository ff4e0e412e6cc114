use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tradepost_core::access::Actor;
use tradepost_core::domain::account::{Account, AccountId, BusinessProfile, CustomerProfile};

use super::{AccountPatch, AccountRepository, ProfilePatch, RepositoryError};
use crate::DbPool;

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account, RepositoryError> {
    Ok(Account {
        id: AccountId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: row.try_get::<DateTime<Utc>, _>("date_joined")?,
    })
}

fn business_profile_from_row(row: &SqliteRow) -> Result<BusinessProfile, RepositoryError> {
    Ok(BusinessProfile {
        account_id: AccountId(row.try_get("account_id")?),
        company_name: row.try_get("company_name")?,
        company_address: row.try_get("company_address")?,
        description: row.try_get("description")?,
        tel: row.try_get("tel")?,
        location: row.try_get("location")?,
        working_hours: row.try_get("working_hours")?,
        email: row.try_get("email")?,
        file: row.try_get("file")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn customer_profile_from_row(row: &SqliteRow) -> Result<CustomerProfile, RepositoryError> {
    Ok(CustomerProfile {
        account_id: AccountId(row.try_get("account_id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        file: row.try_get("file")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, date_joined";

#[async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn create_account(
        &self,
        account: &Account,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO account (id, username, email, password_hash, first_name, last_name, is_staff, date_joined)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.id.0)
        .bind(&account.username)
        .bind(&account.email)
        .bind(password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.is_staff)
        .bind(account.date_joined)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM account WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let account = account_from_row(&row)?;
                let hash: String = row.try_get("password_hash")?;
                Ok(Some((account, hash)))
            }
            None => Ok(None),
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn upsert_token(
        &self,
        account_id: &AccountId,
        fresh: &str,
        now: DateTime<Utc>,
    ) -> Result<String, RepositoryError> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT token FROM auth_token WHERE account_id = ?")
                .bind(&account_id.0)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(token) = existing {
            return Ok(token);
        }

        sqlx::query("INSERT INTO auth_token (token, account_id, created_at) VALUES (?, ?, ?)")
            .bind(fresh)
            .bind(&account_id.0)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(fresh.to_string())
    }

    async fn account_for_token(&self, token: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            "SELECT a.id, a.username, a.email, a.first_name, a.last_name, a.is_staff, a.date_joined
             FROM account a
             JOIN auth_token t ON t.account_id = a.id
             WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn load_actor(&self, account: &Account) -> Result<Actor, RepositoryError> {
        let business: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM business_profile WHERE account_id = ?")
                .bind(&account.id.0)
                .fetch_one(&self.pool)
                .await?;
        let customer: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM customer_profile WHERE account_id = ?")
                .bind(&account.id.0)
                .fetch_one(&self.pool)
                .await?;

        Ok(Actor {
            id: account.id.clone(),
            is_staff: account.is_staff,
            has_business_profile: business > 0,
            has_customer_profile: customer > 0,
        })
    }

    async fn create_business_profile(
        &self,
        profile: &BusinessProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO business_profile (account_id, company_name, company_address, description, tel, location, working_hours, email, file, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.account_id.0)
        .bind(&profile.company_name)
        .bind(&profile.company_address)
        .bind(&profile.description)
        .bind(&profile.tel)
        .bind(&profile.location)
        .bind(&profile.working_hours)
        .bind(&profile.email)
        .bind(&profile.file)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_customer_profile(
        &self,
        profile: &CustomerProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer_profile (account_id, first_name, last_name, file, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&profile.account_id.0)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.file)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn business_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<BusinessProfile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM business_profile WHERE account_id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(business_profile_from_row).transpose()
    }

    async fn customer_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM customer_profile WHERE account_id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_profile_from_row).transpose()
    }

    async fn list_business_profiles(
        &self,
    ) -> Result<Vec<(BusinessProfile, Account)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.account_id, p.company_name, p.company_address, p.description, p.tel,
                    p.location, p.working_hours, p.email, p.file, p.created_at,
                    a.id, a.username, a.email AS account_email,
                    a.first_name AS account_first_name, a.last_name AS account_last_name,
                    a.is_staff, a.date_joined
             FROM business_profile p
             JOIN account a ON a.id = p.account_id
             ORDER BY p.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let profile = business_profile_from_row(row)?;
                let account = Account {
                    id: AccountId(row.try_get("id")?),
                    username: row.try_get("username")?,
                    email: row.try_get("account_email")?,
                    first_name: row.try_get("account_first_name")?,
                    last_name: row.try_get("account_last_name")?,
                    is_staff: row.try_get("is_staff")?,
                    date_joined: row.try_get::<DateTime<Utc>, _>("date_joined")?,
                };
                Ok((profile, account))
            })
            .collect()
    }

    async fn list_customer_profiles(
        &self,
    ) -> Result<Vec<(CustomerProfile, Account)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.account_id, p.first_name, p.last_name, p.file, p.created_at,
                    a.id, a.username, a.email, a.first_name AS account_first_name,
                    a.last_name AS account_last_name, a.is_staff, a.date_joined
             FROM customer_profile p
             JOIN account a ON a.id = p.account_id
             ORDER BY p.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let profile = customer_profile_from_row(row)?;
                let account = Account {
                    id: AccountId(row.try_get("id")?),
                    username: row.try_get("username")?,
                    email: row.try_get("email")?,
                    first_name: row.try_get("account_first_name")?,
                    last_name: row.try_get("account_last_name")?,
                    is_staff: row.try_get("is_staff")?,
                    date_joined: row.try_get::<DateTime<Utc>, _>("date_joined")?,
                };
                Ok((profile, account))
            })
            .collect()
    }

    async fn count_business_profiles(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM business_profile")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_account(
        &self,
        id: &AccountId,
        patch: &AccountPatch,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE account
             SET first_name = COALESCE(?, first_name),
                 last_name = COALESCE(?, last_name),
                 email = COALESCE(?, email)
             WHERE id = ?",
        )
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.email)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_business_profile(
        &self,
        id: &AccountId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE business_profile
             SET location = COALESCE(?, location),
                 tel = COALESCE(?, tel),
                 description = COALESCE(?, description),
                 working_hours = COALESCE(?, working_hours),
                 file = COALESCE(?, file)
             WHERE account_id = ?",
        )
        .bind(&patch.location)
        .bind(&patch.tel)
        .bind(&patch.description)
        .bind(&patch.working_hours)
        .bind(&patch.file)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_customer_profile(
        &self,
        id: &AccountId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE customer_profile SET file = COALESCE(?, file) WHERE account_id = ?",
        )
        .bind(&patch.file)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::repositories::test_support::{account, seed_business, seed_customer, test_pool};
    use crate::repositories::{AccountPatch, AccountRepository, SqlAccountRepository};

    #[tokio::test]
    async fn token_upsert_returns_the_existing_token() {
        let pool = test_pool().await;
        let repo = SqlAccountRepository::new(pool.clone());
        let account = account("a-1");
        repo.create_account(&account, "hash").await.expect("create");

        let first = repo.upsert_token(&account.id, "token-one", Utc::now()).await.expect("store");
        let second =
            repo.upsert_token(&account.id, "token-two", Utc::now()).await.expect("reuse");

        assert_eq!(first, "token-one");
        assert_eq!(second, "token-one", "a second login keeps the original token");

        let resolved = repo.account_for_token("token-one").await.expect("lookup");
        assert_eq!(resolved.map(|a| a.id), Some(account.id));
    }

    #[tokio::test]
    async fn actor_flags_follow_profile_rows() {
        let pool = test_pool().await;
        let repo = SqlAccountRepository::new(pool.clone());

        let business = seed_business(&pool, "b-1").await;
        let customer = seed_customer(&pool, "c-1").await;
        let bare = account("n-1");
        repo.create_account(&bare, "hash").await.expect("create");

        let actor = repo.load_actor(&business).await.expect("load");
        assert!(actor.is_business() && !actor.is_customer());

        let actor = repo.load_actor(&customer).await.expect("load");
        assert!(actor.is_customer() && !actor.is_business());

        let actor = repo.load_actor(&bare).await.expect("load");
        assert!(!actor.is_business() && !actor.is_customer());
    }

    #[tokio::test]
    async fn account_patch_only_touches_provided_fields() {
        let pool = test_pool().await;
        let repo = SqlAccountRepository::new(pool.clone());
        let account = account("a-2");
        repo.create_account(&account, "hash").await.expect("create");

        repo.update_account(
            &account.id,
            &AccountPatch { first_name: Some("Ada".to_string()), ..AccountPatch::default() },
        )
        .await
        .expect("patch");

        let stored = repo.find_by_id(&account.id).await.expect("find").expect("exists");
        assert_eq!(stored.first_name, "Ada");
        assert_eq!(stored.email, account.email, "unpatched fields keep their values");
    }

    #[tokio::test]
    async fn uniqueness_probes_see_existing_rows() {
        let pool = test_pool().await;
        let repo = SqlAccountRepository::new(pool.clone());
        let account = account("a-3");
        repo.create_account(&account, "hash").await.expect("create");

        assert!(repo.username_exists(&account.username).await.expect("probe"));
        assert!(repo.email_exists(&account.email).await.expect("probe"));
        assert!(!repo.username_exists("someone-else").await.expect("probe"));
    }
}
