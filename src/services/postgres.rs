use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AccountStatus, CompanyType, Identity, InvestmentStage, InvestorProfile, InvestorType,
    Submission, SubscriptionAccount, SubscriptionRecord,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid row data: {0}")]
    InvalidRow(String),
}

/// Fields needed to write a newly provisioned account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub identity_id: Uuid,
    pub email: String,
    pub company_name: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub plan_id: String,
    pub plan_name: String,
    pub provisioning_ref: Option<String>,
}

/// PostgreSQL client for accounts, subscriptions, the investor directory and
/// funding submissions.
///
/// All billing writes are keyed by the payment provider's stable identifiers
/// (customer id, subscription id, event id), never by arrival order, so
/// replaying an event cannot create duplicate rows. Status writes for one
/// subscription are serialized through a transaction-scoped advisory lock.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    // ---- identities ----

    /// Find the identity for an email, if one exists.
    pub async fn find_identity(&self, email: &str) -> Result<Option<Identity>, PostgresError> {
        let query = r#"
            SELECT id, email, display_name, created_at
            FROM identities
            WHERE email = $1
        "#;

        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Identity {
            id: row.get("id"),
            email: row.get("email"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
        }))
    }

    /// Get the identity for an email, creating it when absent.
    ///
    /// Safe under concurrent calls for the same email: the insert is
    /// `ON CONFLICT DO NOTHING`, and whoever loses the race re-reads the
    /// winner's row. Exactly one identity per email.
    pub async fn get_or_create_identity(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, PostgresError> {
        if let Some(identity) = self.find_identity(email).await? {
            return Ok(identity);
        }

        let query = r#"
            INSERT INTO identities (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(display_name)
            .execute(&self.pool)
            .await?;

        self.find_identity(email).await?.ok_or_else(|| {
            PostgresError::NotFound(format!("identity for {} after insert", email))
        })
    }

    // ---- accounts ----

    /// Find an account by provider customer id or email (checkout lookup).
    pub async fn find_account_for_customer(
        &self,
        customer_id: &str,
        email: &str,
    ) -> Result<Option<SubscriptionAccount>, PostgresError> {
        let query = r#"
            SELECT id, identity_id, email, company_name, customer_id, subscription_id,
                   plan_id, plan_name, provisioning_ref, status, created_at, updated_at
            FROM accounts
            WHERE customer_id = $1 OR email = $2
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(customer_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(account_from_row))
    }

    /// Find an account by email.
    pub async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<SubscriptionAccount>, PostgresError> {
        let query = r#"
            SELECT id, identity_id, email, company_name, customer_id, subscription_id,
                   plan_id, plan_name, provisioning_ref, status, created_at, updated_at
            FROM accounts
            WHERE email = $1
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(account_from_row))
    }

    /// Find an account by provider subscription id.
    pub async fn find_account_by_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionAccount>, PostgresError> {
        let query = r#"
            SELECT id, identity_id, email, company_name, customer_id, subscription_id,
                   plan_id, plan_name, provisioning_ref, status, created_at, updated_at
            FROM accounts
            WHERE subscription_id = $1
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(account_from_row))
    }

    /// Write the account row for a newly provisioned customer.
    ///
    /// Keyed by customer id: a replayed checkout event updates the existing
    /// row instead of inserting a second one.
    pub async fn create_account(&self, account: &NewAccount) -> Result<Uuid, PostgresError> {
        let query = r#"
            INSERT INTO accounts
                (id, identity_id, email, company_name, customer_id, subscription_id,
                 plan_id, plan_name, provisioning_ref, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active')
            ON CONFLICT (customer_id)
            DO UPDATE SET
                subscription_id = EXCLUDED.subscription_id,
                plan_id = EXCLUDED.plan_id,
                plan_name = EXCLUDED.plan_name,
                provisioning_ref = COALESCE(EXCLUDED.provisioning_ref, accounts.provisioning_ref),
                status = 'active',
                updated_at = NOW()
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(account.identity_id)
            .bind(&account.email)
            .bind(&account.company_name)
            .bind(&account.customer_id)
            .bind(&account.subscription_id)
            .bind(&account.plan_id)
            .bind(&account.plan_name)
            .bind(&account.provisioning_ref)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("id"))
    }

    /// Attach a new subscription id to an existing account and reactivate it.
    pub async fn attach_subscription(
        &self,
        account_id: Uuid,
        subscription_id: &str,
        plan_id: Option<&str>,
        plan_name: Option<&str>,
    ) -> Result<(), PostgresError> {
        let query = r#"
            UPDATE accounts
            SET subscription_id = $2,
                plan_id = COALESCE($3, plan_id),
                plan_name = COALESCE($4, plan_name),
                status = 'active',
                updated_at = NOW()
            WHERE id = $1
        "#;

        sqlx::query(query)
            .bind(account_id)
            .bind(subscription_id)
            .bind(plan_id)
            .bind(plan_name)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Attached subscription {} to account {}",
            subscription_id,
            account_id
        );

        Ok(())
    }

    /// Set the account status for a subscription id.
    ///
    /// Returns false when no account references the subscription; callers
    /// treat that as a no-op, not an error.
    pub async fn set_account_status_by_subscription(
        &self,
        subscription_id: &str,
        status: AccountStatus,
    ) -> Result<bool, PostgresError> {
        let mut tx = self.pool.begin().await?;

        lock_subscription(&mut tx, subscription_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET status = $2, updated_at = NOW()
            WHERE subscription_id = $1
        "#,
        )
        .bind(subscription_id)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    // ---- subscriptions ----

    /// Persist subscription metadata and, when the event demands it, move the
    /// account that references it.
    ///
    /// The write is an upsert keyed by the provider's subscription id, so it
    /// works the same whether the created or updated event arrives first.
    /// Runs under the per-subscription advisory lock so two concurrent events
    /// for the same id cannot interleave.
    pub async fn apply_subscription_update(
        &self,
        record: &SubscriptionRecord,
        account_status: Option<AccountStatus>,
    ) -> Result<(), PostgresError> {
        let mut tx = self.pool.begin().await?;

        lock_subscription(&mut tx, &record.subscription_id).await?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (subscription_id, customer_id, status, current_period_start,
                 current_period_end, price_id, amount, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (subscription_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                current_period_start = COALESCE(EXCLUDED.current_period_start, subscriptions.current_period_start),
                current_period_end = COALESCE(EXCLUDED.current_period_end, subscriptions.current_period_end),
                price_id = COALESCE(EXCLUDED.price_id, subscriptions.price_id),
                amount = COALESCE(EXCLUDED.amount, subscriptions.amount),
                currency = COALESCE(EXCLUDED.currency, subscriptions.currency),
                updated_at = NOW()
        "#,
        )
        .bind(&record.subscription_id)
        .bind(&record.customer_id)
        .bind(&record.status)
        .bind(record.current_period_start)
        .bind(record.current_period_end)
        .bind(&record.price_id)
        .bind(record.amount)
        .bind(&record.currency)
        .execute(&mut *tx)
        .await?;

        if let Some(status) = account_status {
            sqlx::query(
                r#"
                UPDATE accounts
                SET status = $2, updated_at = NOW()
                WHERE subscription_id = $1
            "#,
            )
            .bind(&record.subscription_id)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Mark a subscription and its account terminal.
    ///
    /// Safe to replay: both updates set the same end state.
    pub async fn mark_subscription_canceled(
        &self,
        subscription_id: &str,
    ) -> Result<(), PostgresError> {
        let mut tx = self.pool.begin().await?;

        lock_subscription(&mut tx, subscription_id).await?;

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'canceled', updated_at = NOW()
            WHERE subscription_id = $1
        "#,
        )
        .bind(subscription_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE accounts
            SET status = 'canceled', updated_at = NOW()
            WHERE subscription_id = $1
        "#,
        )
        .bind(subscription_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Marked subscription {} canceled", subscription_id);

        Ok(())
    }

    // ---- processed events ----

    /// Whether a provider event id has already been fully applied.
    pub async fn has_processed_event(&self, event_id: &str) -> Result<bool, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS present FROM processed_events WHERE event_id = $1
        "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Record an event id after its effects are fully applied.
    pub async fn record_processed_event(
        &self,
        event_id: &str,
        event_type: &str,
        subscription_id: Option<&str>,
    ) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO processed_events (event_id, event_type, subscription_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(event_id)
            .bind(event_type)
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- investor directory ----

    /// All active investor profiles, insertion order.
    pub async fn list_active_investors(&self) -> Result<Vec<InvestorProfile>, PostgresError> {
        let query = r#"
            SELECT id, name, investor_type, email, website, description,
                   investment_range_min, investment_range_max,
                   preferred_stages, preferred_industries,
                   preferred_company_types, geographic_focus, is_active
            FROM investors
            WHERE is_active = TRUE
            ORDER BY created_at
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.into_iter().map(investor_from_row).collect()
    }

    /// Create or update an investor profile.
    pub async fn upsert_investor(&self, investor: &InvestorProfile) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO investors
                (id, name, investor_type, email, website, description,
                 investment_range_min, investment_range_max, preferred_stages,
                 preferred_industries, preferred_company_types, geographic_focus,
                 is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                investor_type = EXCLUDED.investor_type,
                email = EXCLUDED.email,
                website = EXCLUDED.website,
                description = EXCLUDED.description,
                investment_range_min = EXCLUDED.investment_range_min,
                investment_range_max = EXCLUDED.investment_range_max,
                preferred_stages = EXCLUDED.preferred_stages,
                preferred_industries = EXCLUDED.preferred_industries,
                preferred_company_types = EXCLUDED.preferred_company_types,
                geographic_focus = EXCLUDED.geographic_focus,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
        "#;

        sqlx::query(query)
            .bind(investor.id)
            .bind(&investor.name)
            .bind(investor.investor_type.as_str())
            .bind(&investor.email)
            .bind(&investor.website)
            .bind(&investor.description)
            .bind(investor.investment_range_min)
            .bind(investor.investment_range_max)
            .bind(Json(&investor.preferred_stages))
            .bind(Json(&investor.preferred_industries))
            .bind(Json(&investor.preferred_company_types))
            .bind(Json(&investor.geographic_focus))
            .bind(investor.is_active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- submissions ----

    /// Persist a funding submission.
    pub async fn insert_submission(&self, submission: &Submission) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO submissions
                (id, company_name, company_type, category, funding_required,
                 investment_stage, business_description, country, state, city,
                 email, matches_sent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#;

        sqlx::query(query)
            .bind(submission.id)
            .bind(&submission.company_name)
            .bind(submission.company_type.as_str())
            .bind(&submission.category)
            .bind(submission.funding_required)
            .bind(submission.investment_stage.as_str())
            .bind(&submission.business_description)
            .bind(&submission.country)
            .bind(&submission.state)
            .bind(&submission.city)
            .bind(&submission.email)
            .bind(submission.matches_sent)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Load one submission by id.
    pub async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, PostgresError> {
        let query = r#"
            SELECT id, company_name, company_type, category, funding_required,
                   investment_stage, business_description, country, state, city,
                   email, matches_sent, created_at
            FROM submissions
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(submission_from_row).transpose()
    }
}

/// Acquire the transaction-scoped advisory lock for a subscription id.
async fn lock_subscription(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    subscription_id: &str,
) -> Result<(), PostgresError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
        .bind(subscription_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn account_from_row(row: sqlx::postgres::PgRow) -> SubscriptionAccount {
    SubscriptionAccount {
        id: row.get("id"),
        identity_id: row.get("identity_id"),
        email: row.get("email"),
        company_name: row.get("company_name"),
        customer_id: row.get("customer_id"),
        subscription_id: row.get("subscription_id"),
        plan_id: row.get("plan_id"),
        plan_name: row.get("plan_name"),
        provisioning_ref: row.get("provisioning_ref"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn investor_from_row(row: sqlx::postgres::PgRow) -> Result<InvestorProfile, PostgresError> {
    let investor_type: String = row.get("investor_type");
    let investor_type = InvestorType::from_str(&investor_type)
        .map_err(PostgresError::InvalidRow)?;

    let preferred_stages: Json<Vec<InvestmentStage>> = row.get("preferred_stages");
    let preferred_industries: Json<Vec<String>> = row.get("preferred_industries");
    let preferred_company_types: Json<Vec<CompanyType>> = row.get("preferred_company_types");
    let geographic_focus: Json<Vec<String>> = row.get("geographic_focus");

    Ok(InvestorProfile {
        id: row.get("id"),
        name: row.get("name"),
        investor_type,
        email: row.get("email"),
        website: row.get("website"),
        description: row.get("description"),
        investment_range_min: row.get("investment_range_min"),
        investment_range_max: row.get("investment_range_max"),
        preferred_stages: preferred_stages.0,
        preferred_industries: preferred_industries.0,
        preferred_company_types: preferred_company_types.0,
        geographic_focus: geographic_focus.0,
        is_active: row.get("is_active"),
    })
}

fn submission_from_row(row: sqlx::postgres::PgRow) -> Result<Submission, PostgresError> {
    let company_type: String = row.get("company_type");
    let company_type = CompanyType::from_str(&company_type).map_err(PostgresError::InvalidRow)?;

    let investment_stage: String = row.get("investment_stage");
    let investment_stage =
        InvestmentStage::from_str(&investment_stage).map_err(PostgresError::InvalidRow)?;

    Ok(Submission {
        id: row.get("id"),
        company_name: row.get("company_name"),
        company_type,
        category: row.get("category"),
        funding_required: row.get("funding_required"),
        investment_stage,
        business_description: row.get("business_description"),
        country: row.get("country"),
        state: row.get("state"),
        city: row.get("city"),
        email: row.get("email"),
        matches_sent: row.get("matches_sent"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_carries_provider_keys() {
        let account = NewAccount {
            identity_id: Uuid::new_v4(),
            email: "founder@example.com".to_string(),
            company_name: "Acme".to_string(),
            customer_id: "cus_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
            plan_id: "entrepreneur".to_string(),
            plan_name: "Entrepreneur".to_string(),
            provisioning_ref: None,
        };

        assert_eq!(account.customer_id, "cus_1");
        assert_eq!(account.subscription_id.as_deref(), Some("sub_1"));
    }
}
