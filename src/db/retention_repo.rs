// src/db/retention_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{common::error::AppError, models::payout::RetentionRate};

#[derive(Clone)]
pub struct RetentionRepository {
    pool: PgPool,
}

impl RetentionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Taxa com o `effective_at` mais recente, se houver histórico.
    pub async fn current<'e, E>(&self, executor: E) -> Result<Option<RetentionRate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rate = sqlx::query_as::<_, RetentionRate>(
            "SELECT * FROM retention_rates ORDER BY effective_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(executor)
        .await?;
        Ok(rate)
    }

    pub async fn latest(&self) -> Result<Option<RetentionRate>, AppError> {
        self.current(&self.pool).await
    }

    pub async fn insert<'e, E>(&self, executor: E, rate: Decimal) -> Result<RetentionRate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, RetentionRate>(
            "INSERT INTO retention_rates (rate) VALUES ($1) RETURNING *",
        )
        .bind(rate)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }
}
