// src/db/access_repo.rs

//! Verificações de capacidade: papel global (financeiro) e vínculo
//! usuário <-> apartamento.

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::auth::Role;

#[derive(Clone)]
pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn has_capability(&self, user_id: Uuid, apartment_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_apartments WHERE user_id = $1 AND apartment_id = $2)",
        )
        .bind(user_id)
        .bind(apartment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn roles_of(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_scalar::<_, Role>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn apartments_of(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT apartment_id FROM user_apartments WHERE user_id = $1 ORDER BY linked_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Donos do apartamento, na ordem em que foram vinculados.
    pub async fn owners_of<'e, E>(&self, executor: E, apartment_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM user_apartments WHERE apartment_id = $1 ORDER BY linked_at, user_id",
        )
        .bind(apartment_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn users_in_role<'e, E>(&self, executor: E, role: Role) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM user_roles WHERE role = $1")
            .bind(role)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    // Vínculos são administrados fora do back office; estes dois existem para seeds.
    pub async fn grant_role<'e, E>(&self, executor: E, user_id: Uuid, role: Role) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn link_apartment<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        apartment_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO user_apartments (user_id, apartment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(apartment_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
