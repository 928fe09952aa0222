// src/services/reconciliation_service.rs

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
    },
    db::{AccessRepository, AuditRepository, PayoutRepository, ReconciliationRepository, SaleRepository},
    models::{
        audit::{Actor, AuditAction},
        auth::Role,
        reconciliation::{
            DisputeType, ProtocolComment, ProtocolStatus, ProtocolTarget, ProtocolView,
            ReconciliationProtocol,
        },
    },
    services::notifier::Notifier,
};

#[derive(Clone)]
pub struct ReconciliationService {
    pool: PgPool,
    protocol_repo: ReconciliationRepository,
    sale_repo: SaleRepository,
    payout_repo: PayoutRepository,
    access_repo: AccessRepository,
    audit_repo: AuditRepository,
    notifier: Arc<dyn Notifier>,
}

impl ReconciliationService {
    pub fn new(
        pool: PgPool,
        protocol_repo: ReconciliationRepository,
        sale_repo: SaleRepository,
        payout_repo: PayoutRepository,
        access_repo: AccessRepository,
        audit_repo: AuditRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { pool, protocol_repo, sale_repo, payout_repo, access_repo, audit_repo, notifier }
    }

    async fn is_finance(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.access_repo.has_role(user_id, Role::Finance).await
    }

    async fn require_finance(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.is_finance(user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden("operação restrita ao financeiro".into()))
        }
    }

    /// Apartamento dono da transação contestada.
    async fn resolve_apartment(&self, target_kind: ProtocolTarget, target_id: Uuid) -> Result<Uuid, AppError> {
        match target_kind {
            ProtocolTarget::Sale => self
                .sale_repo
                .find_detail(&self.pool, target_id)
                .await?
                .map(|d| d.apartment_id)
                .ok_or(AppError::NotFound("Venda")),
            ProtocolTarget::Payout => self
                .payout_repo
                .find_by_id(&self.pool, target_id)
                .await?
                .map(|p| p.apartment_id)
                .ok_or(AppError::NotFound("Payout")),
        }
    }

    pub async fn open(
        &self,
        target_kind: ProtocolTarget,
        target_id: Uuid,
        dispute_type: DisputeType,
        initiator_id: Uuid,
        initial_comment: Option<&str>,
    ) -> Result<ReconciliationProtocol, AppError> {
        self.require_finance(initiator_id).await?;

        let apartment_id = self.resolve_apartment(target_kind, target_id).await?;

        let mut tx = self.pool.begin().await?;

        let owner_id = self
            .access_repo
            .owners_of(&mut *tx, apartment_id)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NoOwnerAssociated)?;

        let protocol = self
            .protocol_repo
            .insert_protocol(&mut *tx, target_kind, target_id, dispute_type, initiator_id, owner_id)
            .await?;

        if let Some(body) = initial_comment.map(str::trim).filter(|b| !b.is_empty()) {
            self.protocol_repo.insert_comment(&mut *tx, protocol.id, initiator_id, body).await?;
        }

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(initiator_id),
                AuditAction::OpenProtocol,
                Some(protocol.id),
                &format!("Protocolo {:?} aberto para {:?} {}", dispute_type, target_kind, target_id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(protocol_id = %protocol.id, %target_id, %owner_id, "Protocolo de reconciliação aberto");
        self.notifier.notify(
            owner_id,
            &format!("Um protocolo de reconciliação foi aberto (ID: {}).", protocol.id),
        );
        Ok(protocol)
    }

    pub async fn add_comment(&self, protocol_id: Uuid, author_id: Uuid, text: &str) -> Result<ProtocolComment, AppError> {
        let body = text.trim();
        if body.is_empty() {
            return Err(AppError::InvalidInput("o comentário não pode ser vazio".into()));
        }

        let is_finance = self.is_finance(author_id).await?;

        let mut tx = self.pool.begin().await?;

        let protocol = self
            .protocol_repo
            .find_by_id_for_update(&mut *tx, protocol_id)
            .await?
            .ok_or(AppError::NotFound("Protocolo"))?;

        if !protocol.is_party(author_id) && !is_finance {
            return Err(AppError::Forbidden("usuário não participa deste protocolo".into()));
        }

        let next = protocol.status.after_comment().ok_or(AppError::ProtocolClosed)?;

        let comment = self.protocol_repo.insert_comment(&mut *tx, protocol_id, author_id, body).await?;

        if next != protocol.status {
            self.protocol_repo
                .update_status(&mut *tx, protocol_id, next)
                .await?
                .ok_or_else(|| AppError::Conflict("protocolo alterado por outra operação".into()))?;
        }

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(author_id),
                AuditAction::AddComment,
                Some(comment.id),
                &format!("Comentário adicionado ao protocolo {}", protocol_id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(%protocol_id, %author_id, status = ?next, "Comentário registrado");
        self.notifier.notify_all(
            &protocol.comment_recipients(author_id),
            &format!("Novo comentário no protocolo {}.", protocol_id),
        );
        Ok(comment)
    }

    pub async fn close(&self, protocol_id: Uuid, actor_id: Uuid) -> Result<ReconciliationProtocol, AppError> {
        self.require_finance(actor_id).await?;

        let mut tx = self.pool.begin().await?;

        let protocol = self
            .protocol_repo
            .find_by_id_for_update(&mut *tx, protocol_id)
            .await?
            .ok_or(AppError::NotFound("Protocolo"))?;
        if protocol.status.is_terminal() {
            return Err(AppError::AlreadyTerminal("Protocolo"));
        }

        let closed = self
            .protocol_repo
            .update_status(&mut *tx, protocol_id, ProtocolStatus::Closed)
            .await?
            .ok_or_else(|| AppError::Conflict("protocolo alterado por outra operação".into()))?;

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(actor_id),
                AuditAction::CloseProtocol,
                Some(protocol_id),
                &format!("Protocolo {} fechado", protocol_id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(%protocol_id, "Protocolo fechado");
        self.notifier.notify(closed.owner_id, &format!("O protocolo {} foi fechado.", protocol_id));
        Ok(closed)
    }

    pub async fn view(&self, protocol_id: Uuid, viewer_id: Uuid) -> Result<ProtocolView, AppError> {
        let protocol = self
            .protocol_repo
            .find_by_id(&self.pool, protocol_id)
            .await?
            .ok_or(AppError::NotFound("Protocolo"))?;
        if !protocol.is_party(viewer_id) && !self.is_finance(viewer_id).await? {
            return Err(AppError::Forbidden("usuário não participa deste protocolo".into()));
        }
        let comments = self.protocol_repo.comments(protocol_id).await?;
        Ok(ProtocolView { protocol, comments })
    }

    pub async fn list_for_user(
        &self,
        viewer_id: Uuid,
        page: &PageQuery,
    ) -> Result<Paginated<ReconciliationProtocol>, AppError> {
        let filter = if self.is_finance(viewer_id).await? { None } else { Some(viewer_id) };
        let items = self.protocol_repo.list_visible(filter, page.limit(), page.offset()).await?;
        let total = self.protocol_repo.count_visible(filter).await?;
        Ok(Paginated::new(items, page.page(), total))
    }
}
