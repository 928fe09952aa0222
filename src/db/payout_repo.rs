// src/db/payout_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::{Money, RetentionSplit}},
    models::payout::{Payout, PayoutDetail},
};

const DETAIL_SELECT: &str = r#"
    SELECT po.*, a.name AS apartment_name
    FROM payouts po
    JOIN apartments a ON a.id = po.apartment_id
"#;

#[derive(Clone)]
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        apartment_id: Uuid,
        requested_by: Uuid,
        split: RetentionSplit,
        pix_key: &str,
    ) -> Result<Payout, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>(
            r#"
            INSERT INTO payouts
                (id, apartment_id, requested_by, gross_cents, net_cents, retention_cents, pix_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(apartment_id)
        .bind(requested_by)
        .bind(split.gross)
        .bind(split.net)
        .bind(split.retention)
        .bind(pix_key)
        .fetch_one(executor)
        .await?;
        Ok(payout)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(payout)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(payout)
    }

    pub async fn mark_approved<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        receipt_url: Option<&str>,
    ) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>(
            r#"
            UPDATE payouts
            SET status = 'PROCESSADO', receipt_url = COALESCE($2, receipt_url), resolved_at = now()
            WHERE id = $1 AND status = 'SOLICITADO'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(receipt_url)
        .fetch_optional(executor)
        .await?;
        Ok(payout)
    }

    pub async fn mark_rejected<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        reason: &str,
    ) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>(
            r#"
            UPDATE payouts
            SET status = 'FALHA', failure_reason = $2, resolved_at = now()
            WHERE id = $1 AND status = 'SOLICITADO'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(executor)
        .await?;
        Ok(payout)
    }

    /// `requested_by = None` lista todos (visão do financeiro).
    pub async fn list(
        &self,
        requested_by: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PayoutDetail>, AppError> {
        let sql = format!(
            "{DETAIL_SELECT} WHERE ($1::uuid IS NULL OR po.requested_by = $1)
             ORDER BY po.requested_at DESC, po.id LIMIT $2 OFFSET $3"
        );
        let payouts = sqlx::query_as::<_, PayoutDetail>(&sql)
            .bind(requested_by)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(payouts)
    }

    pub async fn count(&self, requested_by: Option<Uuid>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payouts WHERE ($1::uuid IS NULL OR requested_by = $1)",
        )
        .bind(requested_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Retenção efetivamente cobrada (payouts aprovados) na janela.
    pub async fn retention_collected(
        &self,
        apartment_id: Option<Uuid>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Money, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(retention_cents), 0)::BIGINT FROM payouts
            WHERE status = 'PROCESSADO'
              AND ($1::uuid IS NULL OR apartment_id = $1)
              AND ($2::timestamptz IS NULL OR resolved_at >= $2)
              AND ($3::timestamptz IS NULL OR resolved_at < $3)
            "#,
        )
        .bind(apartment_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(total))
    }

    /// Soma bruta dos pedidos ainda em aberto.
    pub async fn pending_total(&self, apartment_id: Option<Uuid>) -> Result<Money, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(gross_cents), 0)::BIGINT FROM payouts
            WHERE status = 'SOLICITADO' AND ($1::uuid IS NULL OR apartment_id = $1)
            "#,
        )
        .bind(apartment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(total))
    }
}
