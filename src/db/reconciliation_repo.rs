// src/db/reconciliation_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::reconciliation::{
        DisputeType, ProtocolComment, ProtocolStatus, ProtocolTarget, ReconciliationProtocol,
    },
};

#[derive(Clone)]
pub struct ReconciliationRepository {
    pool: PgPool,
}

impl ReconciliationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_protocol<'e, E>(
        &self,
        executor: E,
        target_kind: ProtocolTarget,
        target_id: Uuid,
        dispute_type: DisputeType,
        initiator_id: Uuid,
        owner_id: Uuid,
    ) -> Result<ReconciliationProtocol, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocol = sqlx::query_as::<_, ReconciliationProtocol>(
            r#"
            INSERT INTO reconciliation_protocols
                (target_kind, target_id, dispute_type, initiator_id, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(target_kind)
        .bind(target_id)
        .bind(dispute_type)
        .bind(initiator_id)
        .bind(owner_id)
        .fetch_one(executor)
        .await?;
        Ok(protocol)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<ReconciliationProtocol>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocol = sqlx::query_as::<_, ReconciliationProtocol>(
            "SELECT * FROM reconciliation_protocols WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(protocol)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<ReconciliationProtocol>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocol = sqlx::query_as::<_, ReconciliationProtocol>(
            "SELECT * FROM reconciliation_protocols WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(protocol)
    }

    /// Nunca reabre um protocolo fechado.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ProtocolStatus,
    ) -> Result<Option<ReconciliationProtocol>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let protocol = sqlx::query_as::<_, ReconciliationProtocol>(
            r#"
            UPDATE reconciliation_protocols SET status = $2
            WHERE id = $1 AND status <> 'CLOSED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(protocol)
    }

    pub async fn insert_comment<'e, E>(
        &self,
        executor: E,
        protocol_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ProtocolComment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comment = sqlx::query_as::<_, ProtocolComment>(
            r#"
            INSERT INTO protocol_comments (protocol_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(protocol_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(executor)
        .await?;
        Ok(comment)
    }

    pub async fn comments(&self, protocol_id: Uuid) -> Result<Vec<ProtocolComment>, AppError> {
        let comments = sqlx::query_as::<_, ProtocolComment>(
            "SELECT * FROM protocol_comments WHERE protocol_id = $1 ORDER BY created_at, id",
        )
        .bind(protocol_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// `user_id = None` lista todos (visão do financeiro).
    pub async fn list_visible(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReconciliationProtocol>, AppError> {
        let protocols = sqlx::query_as::<_, ReconciliationProtocol>(
            r#"
            SELECT * FROM reconciliation_protocols
            WHERE $1::uuid IS NULL OR initiator_id = $1 OR owner_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(protocols)
    }

    pub async fn count_visible(&self, user_id: Option<Uuid>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reconciliation_protocols
            WHERE $1::uuid IS NULL OR initiator_id = $1 OR owner_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
