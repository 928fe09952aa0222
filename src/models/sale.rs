// src/models/sale.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::Money;
use crate::models::payment::{is_manual_payment_id, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Confirmed, // credita o saldo do apartamento uma única vez
    Failed,    // libera o produto
}

impl SaleStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SaleStatus::Pending)
    }
}

/// Venda de um produto (a "Transaction" da vitrine).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,

    #[schema(example = "telegram:1074263794")]
    pub buyer_id: String,

    // Copiado do preço no momento da venda
    #[sqlx(rename = "amount_cents")]
    #[schema(value_type = f64, example = 25.0)]
    pub amount: Money,

    pub provider: ProviderKind,

    #[schema(example = "PIX_6f1c0f4e-2b1a-4f43-9a55-6a7d1a0b9c11")]
    pub payment_id: String,

    pub status: SaleStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Sale {
    pub fn is_manual(&self) -> bool {
        is_manual_payment_id(&self.payment_id)
    }
}

/// Venda com o contexto de produto/apartamento (listagens e notificações).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sale: Sale,
    pub product_name: String,
    pub apartment_id: Uuid,
    pub apartment_name: String,
}

/// Resultado de uma consulta ao gateway sobre uma venda pendente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PollOutcome {
    Confirmed,
    StillPending,
    AlreadyFinal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub checked: usize,
    pub confirmed: usize,
    pub provider_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!SaleStatus::Pending.is_terminal());
        assert!(SaleStatus::Confirmed.is_terminal());
        assert!(SaleStatus::Failed.is_terminal());
    }
}
