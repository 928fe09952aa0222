// src/db/apartment_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::Money},
    models::apartment::{Apartment, Product},
};

#[derive(Clone)]
pub struct ApartmentRepository {
    pool: PgPool,
}

impl ApartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  APARTAMENTOS
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Apartment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let apartment = sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(apartment)
    }

    /// Trava a linha do apartamento até o fim da transação.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Apartment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let apartment =
            sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(apartment)
    }

    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Apartment>, AppError> {
        let apartment =
            sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE lower(identifier) = lower($1)")
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await?;
        Ok(apartment)
    }

    pub async fn total_balance(&self) -> Result<Money, AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(balance_cents), 0)::BIGINT FROM apartments")
                .fetch_one(&self.pool)
                .await?;
        Ok(Money::from_cents(total))
    }

    pub async fn create_apartment<'e, E>(
        &self,
        executor: E,
        name: &str,
        identifier: &str,
        pix_key: &str,
    ) -> Result<Apartment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let apartment = sqlx::query_as::<_, Apartment>(
            r#"
            INSERT INTO apartments (name, identifier, pix_key)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(identifier)
        .bind(pix_key)
        .fetch_one(executor)
        .await?;
        Ok(apartment)
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn list_available_products(&self, apartment_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE apartment_id = $1 AND is_available
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(apartment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn find_product<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn find_product_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn set_product_availability<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        is_available: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE products SET is_available = $2 WHERE id = $1")
            .bind(product_id)
            .bind(is_available)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        apartment_id: Uuid,
        name: &str,
        price: Money,
        lock_code: &str,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (apartment_id, name, price_cents, lock_code)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(apartment_id)
        .bind(name)
        .bind(price)
        .bind(lock_code)
        .fetch_one(executor)
        .await?;
        Ok(product)
    }
}
