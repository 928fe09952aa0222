// src/models/ledger.rs

//! Razão de saldo: cada alteração de saldo de um apartamento é uma entrada
//! imutável. Só existem três movimentos possíveis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "balance_entry_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceEntryKind {
    SaleConfirmed,
    PayoutRequested,
    PayoutRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceMovement {
    /// +amount quando a venda é confirmada
    SaleConfirmed { sale_id: Uuid, amount: Money },
    /// -gross quando o payout é solicitado (débito pessimista)
    PayoutRequested { payout_id: Uuid, gross: Money },
    /// +gross quando o payout é rejeitado
    PayoutRejected { payout_id: Uuid, gross: Money },
}

impl BalanceMovement {
    pub fn kind(&self) -> BalanceEntryKind {
        match self {
            BalanceMovement::SaleConfirmed { .. } => BalanceEntryKind::SaleConfirmed,
            BalanceMovement::PayoutRequested { .. } => BalanceEntryKind::PayoutRequested,
            BalanceMovement::PayoutRejected { .. } => BalanceEntryKind::PayoutRejected,
        }
    }

    pub fn reference_id(&self) -> Uuid {
        match *self {
            BalanceMovement::SaleConfirmed { sale_id, .. } => sale_id,
            BalanceMovement::PayoutRequested { payout_id, .. }
            | BalanceMovement::PayoutRejected { payout_id, .. } => payout_id,
        }
    }

    /// Valor com sinal aplicado ao saldo.
    pub fn signed_amount(&self) -> Money {
        match *self {
            BalanceMovement::SaleConfirmed { amount, .. } => amount,
            BalanceMovement::PayoutRequested { gross, .. } => -gross,
            BalanceMovement::PayoutRejected { gross, .. } => gross,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.signed_amount() < Money::ZERO
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub kind: BalanceEntryKind,
    #[sqlx(rename = "amount_cents")]
    #[schema(value_type = f64)]
    pub amount: Money,
    pub reference_id: Uuid,
    #[sqlx(rename = "balance_after_cents")]
    #[schema(value_type = f64)]
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}


#[cfg(test)]
mod tests {
    use super::*;

    fn cents(v: i64) -> Money {
        Money::from_cents(v)
    }

    #[test]
    fn movement_signs() {
        let sale = BalanceMovement::SaleConfirmed { sale_id: Uuid::new_v4(), amount: cents(2500) };
        let req = BalanceMovement::PayoutRequested { payout_id: Uuid::new_v4(), gross: cents(4000) };
        let rej = BalanceMovement::PayoutRejected { payout_id: Uuid::new_v4(), gross: cents(4000) };

        assert_eq!(sale.signed_amount(), cents(2500));
        assert_eq!(req.signed_amount(), cents(-4000));
        assert_eq!(rej.signed_amount(), cents(4000));
        assert!(req.is_debit());
        assert!(!rej.is_debit());
    }

    #[test]
    fn request_then_reject_restores_balance() {
        let payout_id = Uuid::new_v4();
        let history = [
            BalanceMovement::PayoutRequested { payout_id, gross: cents(4000) },
            BalanceMovement::PayoutRejected { payout_id, gross: cents(4000) },
        ];
        let replay = |movements: &[BalanceMovement]| {
            movements.iter().fold(cents(10_000), |balance, m| balance + m.signed_amount())
        };
        assert_eq!(replay(&history[..1]), cents(6000));
        assert_eq!(replay(&history), cents(10_000));
    }

    #[test]
    fn request_and_reject_share_reference_but_not_kind() {
        let payout_id = Uuid::new_v4();
        let req = BalanceMovement::PayoutRequested { payout_id, gross: cents(1) };
        let rej = BalanceMovement::PayoutRejected { payout_id, gross: cents(1) };
        assert_eq!(req.reference_id(), rej.reference_id());
        assert_ne!(req.kind(), rej.kind());
    }
}
