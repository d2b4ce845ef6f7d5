use crate::errors::{AppError, ResultExt};
use crate::models::LeadRecord;
use async_trait::async_trait;
use sqlx::PgPool;

/// Persistence for accepted leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Store a lead, returning its row id when the store assigns one.
    async fn save(&self, lead: &LeadRecord) -> Result<Option<i64>, AppError>;

    /// Whether leads are actually kept.
    fn is_persistent(&self) -> bool;
}

/// Truncate to at most `max` characters (UTF-8 safe).
fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        value.chars().take(max).collect()
    } else {
        value.to_string()
    }
}

/// Column values for one `leads` row, cut to the widths in
/// `migrations/0001_create_leads.sql`.
#[derive(Debug, PartialEq, Eq)]
struct LeadRow {
    name: String,
    phone: String,
    email: Option<String>,
    unit_interest: Option<String>,
    budget_range: Option<String>,
    timeline: Option<String>,
    best_call_time: Option<String>,
    utm: [Option<String>; 5],
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl LeadRow {
    fn from_record(lead: &LeadRecord) -> Self {
        let bounded = |value: Option<&str>, max: usize| value.map(|v| truncate_chars(v, max));
        let utm = lead.utm();

        Self {
            name: truncate_chars(lead.name(), 200),
            phone: truncate_chars(lead.phone(), 40),
            email: bounded(lead.email(), 320),
            unit_interest: bounded(lead.unit_interest(), 50),
            budget_range: bounded(lead.budget_range(), 50),
            timeline: bounded(lead.timeline(), 50),
            best_call_time: bounded(lead.best_call_time(), 50),
            utm: [
                bounded(utm.source.as_deref(), 100),
                bounded(utm.medium.as_deref(), 100),
                bounded(utm.campaign.as_deref(), 100),
                bounded(utm.content.as_deref(), 100),
                bounded(utm.term.as_deref(), 100),
            ],
            ip_address: bounded(lead.ip_address(), 45),
            user_agent: bounded(lead.user_agent(), 500),
        }
    }
}

/// PostgreSQL-backed store writing to the `leads` table.
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn save(&self, lead: &LeadRecord) -> Result<Option<i64>, AppError> {
        let row = LeadRow::from_record(lead);
        let [utm_source, utm_medium, utm_campaign, utm_content, utm_term] = row.utm;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO leads (
                reference, name, phone, email, language,
                unit_interest, budget_range, timeline, best_call_time,
                whatsapp_optin, marketing_consent, kvkk_consent,
                utm_source, utm_medium, utm_campaign, utm_content, utm_term,
                ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
        )
        .bind(lead.reference())
        .bind(row.name)
        .bind(row.phone)
        .bind(row.email)
        .bind(lead.language().code())
        .bind(row.unit_interest)
        .bind(row.budget_range)
        .bind(row.timeline)
        .bind(row.best_call_time)
        .bind(lead.whatsapp_optin())
        .bind(lead.marketing_consent())
        .bind(lead.kvkk_consent())
        .bind(utm_source)
        .bind(utm_medium)
        .bind(utm_campaign)
        .bind(utm_content)
        .bind(utm_term)
        .bind(row.ip_address)
        .bind(row.user_agent)
        .bind(lead.created_at())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to store lead {}", lead.reference()))?;

        tracing::info!("✓ Lead {} stored (id={})", lead.reference(), id);
        Ok(Some(id))
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// Store used when no database is configured: leads only travel through
/// the notification channels.
pub struct NoopLeadStore;

#[async_trait]
impl LeadStore for NoopLeadStore {
    async fn save(&self, lead: &LeadRecord) -> Result<Option<i64>, AppError> {
        tracing::debug!("Persistence disabled, lead {} not stored", lead.reference());
        Ok(None)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
