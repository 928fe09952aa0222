// src/db/sale_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::Money},
    models::{
        payment::ProviderKind,
        sale::{Sale, SaleDetail, SaleStatus},
    },
};

const DETAIL_SELECT: &str = r#"
    SELECT s.*, p.name AS product_name, p.apartment_id, a.name AS apartment_name
    FROM sales s
    JOIN products p ON p.id = s.product_id
    JOIN apartments a ON a.id = p.apartment_id
"#;

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        product_id: Uuid,
        buyer_id: &str,
        amount: Money,
        provider: ProviderKind,
        payment_id: &str,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (id, product_id, buyer_id, amount_cents, provider, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(product_id)
        .bind(buyer_id)
        .bind(amount)
        .bind(provider)
        .bind(payment_id)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_detail<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<SaleDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{DETAIL_SELECT} WHERE s.id = $1");
        let detail = sqlx::query_as::<_, SaleDetail>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(detail)
    }

    /// Só altera vendas ainda pendentes. Retorna `None` se outra transação
    /// já finalizou a venda.
    pub async fn mark_confirmed<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET status = 'CONFIRMED', resolved_at = now()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    pub async fn mark_failed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET status = 'FAILED', rejection_reason = $2, resolved_at = now()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    pub async fn list(
        &self,
        status: Option<SaleStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SaleDetail>, AppError> {
        let sql = format!(
            "{DETAIL_SELECT} WHERE ($1::sale_status IS NULL OR s.status = $1)
             ORDER BY s.requested_at DESC, s.id LIMIT $2 OFFSET $3"
        );
        let sales = sqlx::query_as::<_, SaleDetail>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    pub async fn count(&self, status: Option<SaleStatus>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales WHERE ($1::sale_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Vendas pendentes cujo pagamento foi criado por um gateway (IDs sem `PIX_`).
    pub async fn list_pending_gateway(&self) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE status = 'PENDING' AND left(payment_id, 4) <> 'PIX_'
            ORDER BY requested_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn count_pending(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE status = 'PENDING'
              AND ($1::timestamptz IS NULL OR requested_at >= $1)
              AND ($2::timestamptz IS NULL OR requested_at < $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
