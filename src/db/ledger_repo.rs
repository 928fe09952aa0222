// src/db/ledger_repo.rs

//! Único ponto do sistema que altera `apartments.balance_cents`.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::{BalanceEntry, BalanceMovement},
};

#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Aplica o movimento ao saldo e grava a entrada correspondente.
    ///
    /// Débitos só passam se o saldo resultante não ficar negativo. A unicidade
    /// de (kind, reference_id) impede que a mesma venda ou payout mova o saldo
    /// duas vezes; a violação vira `Conflict` e a transação é desfeita.
    pub async fn post_entry(
        &self,
        conn: &mut PgConnection,
        apartment_id: Uuid,
        movement: BalanceMovement,
    ) -> Result<BalanceEntry, AppError> {
        let delta = movement.signed_amount();

        let balance_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE apartments
            SET balance_cents = balance_cents + $2
            WHERE id = $1 AND (NOT $3 OR balance_cents + $2 >= 0)
            RETURNING balance_cents
            "#,
        )
        .bind(apartment_id)
        .bind(delta)
        .bind(movement.is_debit())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(balance_after) = balance_after else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM apartments WHERE id = $1)")
                .bind(apartment_id)
                .fetch_one(&mut *conn)
                .await?;
            return Err(if exists {
                AppError::InsufficientBalance
            } else {
                AppError::NotFound("Apartamento")
            });
        };

        let entry = sqlx::query_as::<_, BalanceEntry>(
            r#"
            INSERT INTO balance_entries (apartment_id, kind, amount_cents, reference_id, balance_after_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(apartment_id)
        .bind(movement.kind())
        .bind(delta)
        .bind(movement.reference_id())
        .bind(balance_after)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(
            apartment_id = %apartment_id,
            kind = ?entry.kind,
            amount = %delta,
            balance_after = %entry.balance_after,
            "Saldo movimentado"
        );
        Ok(entry)
    }

    pub async fn entries_for(&self, apartment_id: Uuid) -> Result<Vec<BalanceEntry>, AppError> {
        let entries = sqlx::query_as::<_, BalanceEntry>(
            "SELECT * FROM balance_entries WHERE apartment_id = $1 ORDER BY created_at, id",
        )
        .bind(apartment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
