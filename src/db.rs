use sqlx::{PgPool, Row};

use crate::error::PersistenceError;
use crate::store::Backend;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Key/value storage in `frequencia.storage`, one row per key.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Backend for PgBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query("SELECT value FROM frequencia.storage WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO frequencia.storage (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        log::debug!("Wrote {} bytes under {key}", value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM frequencia.storage WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
