use sqlx::{postgres::PgPoolOptions, PgPool};

/// Schema for the `leads` table, applied idempotently at startup.
const LEADS_SCHEMA: &str = include_str!("../migrations/0001_create_leads.sql");

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        sqlx::raw_sql(LEADS_SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }
}
