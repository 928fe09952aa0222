// src/models/reconciliation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "dispute_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeType {
    Products,
    Payout,
    Questions,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "protocol_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolStatus {
    Open,
    InProgress,
    Closed,
}

impl ProtocolStatus {
    /// Status após um novo comentário. `None` quando o protocolo já está fechado.
    pub fn after_comment(self) -> Option<ProtocolStatus> {
        match self {
            ProtocolStatus::Open | ProtocolStatus::InProgress => Some(ProtocolStatus::InProgress),
            ProtocolStatus::Closed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProtocolStatus::Closed)
    }
}

/// Tipo da transação contestada: venda ou payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "protocol_target", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolTarget {
    Sale,
    Payout,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationProtocol {
    pub id: Uuid,
    pub target_kind: ProtocolTarget,
    pub target_id: Uuid,
    pub dispute_type: DisputeType,
    pub status: ProtocolStatus,
    pub initiator_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ReconciliationProtocol {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.initiator_id == user_id || self.owner_id == user_id
    }

    /// Quem deve ser avisado de um comentário de `author_id`.
    pub fn comment_recipients(&self, author_id: Uuid) -> Vec<Uuid> {
        let mut recipients = Vec::with_capacity(2);
        if author_id != self.initiator_id {
            recipients.push(self.initiator_id);
        }
        if author_id != self.owner_id && self.owner_id != self.initiator_id {
            recipients.push(self.owner_id);
        }
        recipients
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolComment {
    pub id: Uuid,
    pub protocol_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolView {
    #[serde(flatten)]
    pub protocol: ReconciliationProtocol,
    pub comments: Vec<ProtocolComment>,
}
