// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Quem executou a operação auditada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    Buyer(String),
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{}", id),
            Actor::Buyer(id) => write!(f, "buyer:{}", id),
            Actor::System => f.write_str("system"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RecordSale,
    ConfirmPayment,
    RejectPayment,
    RequestPayout,
    ApprovePayout,
    RejectPayout,
    UpdateRetentionRate,
    OpenProtocol,
    AddComment,
    CloseProtocol,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::RecordSale => "RecordSale",
            AuditAction::ConfirmPayment => "ConfirmPayment",
            AuditAction::RejectPayment => "RejectPayment",
            AuditAction::RequestPayout => "RequestPayout",
            AuditAction::ApprovePayout => "ApprovePayout",
            AuditAction::RejectPayout => "RejectPayout",
            AuditAction::UpdateRetentionRate => "UpdateRetentionRate",
            AuditAction::OpenProtocol => "OpenProtocol",
            AuditAction::AddComment => "AddComment",
            AuditAction::CloseProtocol => "CloseProtocol",
        }
    }

    pub fn entity_type(self) -> &'static str {
        match self {
            AuditAction::RecordSale | AuditAction::ConfirmPayment | AuditAction::RejectPayment => "Sale",
            AuditAction::RequestPayout | AuditAction::ApprovePayout | AuditAction::RejectPayout => "Payout",
            AuditAction::UpdateRetentionRate => "RetentionRate",
            AuditAction::OpenProtocol | AuditAction::CloseProtocol => "ReconciliationProtocol",
            AuditAction::AddComment => "ProtocolComment",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    #[schema(example = "user:550e8400-e29b-41d4-a716-446655440000")]
    pub actor: String,
    #[schema(example = "RequestPayout")]
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_formats_with_kind_prefix() {
        let id = Uuid::nil();
        assert_eq!(Actor::User(id).to_string(), format!("user:{}", id));
        assert_eq!(Actor::Buyer("42".into()).to_string(), "buyer:42");
        assert_eq!(Actor::System.to_string(), "system");
    }

    #[test]
    fn comment_audits_target_the_comment_entity() {
        assert_eq!(AuditAction::AddComment.entity_type(), "ProtocolComment");
        assert_eq!(AuditAction::RejectPayment.entity_type(), "Sale");
    }
}
