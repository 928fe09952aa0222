// src/models/apartment.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::Money;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Apartment {
    pub id: Uuid,

    #[schema(example = "Apartamento 101")]
    pub name: String,

    // Chave usada pela vitrine para localizar o apartamento (ex.: "apt101")
    #[schema(example = "apt101")]
    pub identifier: String,

    #[sqlx(rename = "balance_cents")]
    #[schema(value_type = f64, example = 100.0)]
    pub balance: Money,

    #[schema(example = "financeiro@pix.com.br")]
    pub pix_key: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub apartment_id: Uuid,

    #[schema(example = "Cerveja artesanal")]
    pub name: String,
    pub description: String,

    #[sqlx(rename = "price_cents")]
    #[schema(value_type = f64, example = 25.0)]
    pub price: Money,

    pub is_available: bool,

    // Segredo entregue ao comprador; nunca sai pela API.
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub lock_code: String,

    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentSummary {
    pub apartment_id: Uuid,
    pub name: String,
    #[schema(value_type = f64)]
    pub balance: Money,
    #[schema(value_type = f64)]
    pub retention_paid: Money,
    #[schema(value_type = f64)]
    pub pending_payouts: Money,
}
