// src/models/payout.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::Money;

/// Taxa aplicada quando o histórico de taxas está vazio (5%).
pub fn default_retention_rate() -> Decimal {
    Decimal::new(5, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payout_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Solicitado, // Requested: saldo já debitado
    Processado, // Approved
    Falha,      // Rejected: saldo re-creditado
}

impl PayoutStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PayoutStatus::Solicitado)
    }
}

/// Pedido de recebimento (o "AdminTransaction" do back office).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub requested_by: Uuid,

    #[sqlx(rename = "gross_cents")]
    #[schema(value_type = f64, example = 40.0)]
    pub gross: Money,

    #[sqlx(rename = "net_cents")]
    #[schema(value_type = f64, example = 38.0)]
    pub net: Money,

    #[sqlx(rename = "retention_cents")]
    #[schema(value_type = f64, example = 2.0)]
    pub retention: Money,

    // Snapshot da chave no momento do pedido
    pub pix_key: String,

    pub status: PayoutStatus,
    pub failure_reason: Option<String>,
    pub receipt_url: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payout: Payout,
    pub apartment_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRate {
    pub id: Uuid,
    #[schema(value_type = f64, example = 0.05)]
    pub rate: Decimal,
    pub effective_at: DateTime<Utc>,
}

/// Taxa vigente, com indicação se veio do histórico ou do padrão.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRetentionRate {
    #[schema(value_type = f64, example = 0.05)]
    pub rate: Decimal,
    pub effective_at: Option<DateTime<Utc>>,
    pub is_default: bool,
}

impl From<Option<RetentionRate>> for CurrentRetentionRate {
    fn from(row: Option<RetentionRate>) -> Self {
        match row {
            Some(r) => Self { rate: r.rate, effective_at: Some(r.effective_at), is_default: false },
            None => Self { rate: default_retention_rate(), effective_at: None, is_default: true },
        }
    }
}

/// Taxa em [0, 1], com no máximo 4 casas (NUMERIC(5,4)).
pub fn validate_rate(rate: Decimal) -> Result<Decimal, String> {
    if rate.is_sign_negative() || rate > Decimal::ONE {
        return Err(format!("{} deve estar entre 0 e 1 (ex.: 0.05 para 5%)", rate));
    }
    if rate.normalize().scale() > 4 {
        return Err(format!("{} tem mais de 4 casas decimais", rate));
    }
    Ok(rate.normalize())
}

/// Aceita "0,05" ou "0.05", como os formulários do financeiro.
pub fn parse_rate(input: &str) -> Result<Decimal, String> {
    let cleaned = input.trim().replace(',', ".");
    cleaned
        .parse::<Decimal>()
        .or_else(|_| {
            cleaned
                .parse::<f64>()
                .ok()
                .and_then(Decimal::from_f64)
                .ok_or(())
        })
        .map_err(|_| format!("'{}' não é um número válido", input))
        .and_then(validate_rate)
}
