// src/services/payout_service.rs

//! Pedidos de recebimento dos donos de apartamento.
//!
//! O saldo é debitado no pedido (pessimista) e devolvido só em caso de
//! rejeição. A retenção é calculada com a taxa vigente no momento do pedido.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
        money::{Money, RetentionSplit},
    },
    db::{
        AccessRepository, ApartmentRepository, AuditRepository, LedgerRepository, PayoutRepository,
        RetentionRepository,
    },
    models::{
        audit::{Actor, AuditAction},
        auth::Role,
        ledger::BalanceMovement,
        payout::{validate_rate, CurrentRetentionRate, Payout, PayoutDetail, RetentionRate},
    },
    services::{blob_store::BlobStore, notifier::Notifier},
};

/// Comprovante anexado à aprovação.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub bytes: Vec<u8>,
    pub extension: String,
}

#[derive(Clone)]
pub struct PayoutService {
    pool: PgPool,
    apartment_repo: ApartmentRepository,
    payout_repo: PayoutRepository,
    retention_repo: RetentionRepository,
    ledger_repo: LedgerRepository,
    access_repo: AccessRepository,
    audit_repo: AuditRepository,
    blob_store: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
}

impl PayoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        apartment_repo: ApartmentRepository,
        payout_repo: PayoutRepository,
        retention_repo: RetentionRepository,
        ledger_repo: LedgerRepository,
        access_repo: AccessRepository,
        audit_repo: AuditRepository,
        blob_store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            apartment_repo,
            payout_repo,
            retention_repo,
            ledger_repo,
            access_repo,
            audit_repo,
            blob_store,
            notifier,
        }
    }

    async fn require_finance(&self, actor_id: Uuid) -> Result<(), AppError> {
        if self.access_repo.has_role(actor_id, Role::Finance).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden("operação restrita ao financeiro".into()))
        }
    }

    // =========================================================================
    //  PEDIDO
    // =========================================================================

    pub async fn request(&self, apartment_id: Uuid, requester_id: Uuid, gross: Money) -> Result<Payout, AppError> {
        if !gross.is_positive() {
            return Err(AppError::InvalidAmount(format!("{} deve ser maior que zero", gross)));
        }
        if !self.access_repo.has_capability(requester_id, apartment_id).await? {
            tracing::warn!(%requester_id, %apartment_id, "Pedido de recebimento sem vínculo com o apartamento");
            return Err(AppError::Forbidden("usuário sem acesso a este apartamento".into()));
        }

        let mut tx = self.pool.begin().await?;

        // Trava o apartamento antes de ler a taxa: pedidos concorrentes do
        // mesmo apartamento passam a ser serializados aqui.
        let apartment = self
            .apartment_repo
            .find_by_id_for_update(&mut *tx, apartment_id)
            .await?
            .ok_or(AppError::NotFound("Apartamento"))?;

        let rate = CurrentRetentionRate::from(self.retention_repo.current(&mut *tx).await?).rate;
        let split = RetentionSplit::compute(gross, rate);
        let payout_id = Uuid::new_v4();

        self.ledger_repo
            .post_entry(&mut *tx, apartment_id, BalanceMovement::PayoutRequested { payout_id, gross })
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::InsufficientBalance) {
                    tracing::warn!(%apartment_id, balance = %apartment.balance, requested = %gross, "Saldo insuficiente");
                }
            })?;

        let payout = self
            .payout_repo
            .insert(&mut *tx, payout_id, apartment_id, requester_id, split, &apartment.pix_key)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(requester_id),
                AuditAction::RequestPayout,
                Some(payout_id),
                &format!(
                    "Solicitado payout de {} (líquido: {}, taxa: {}) para {}",
                    split.gross, split.net, split.retention, apartment.name
                ),
            )
            .await?;

        // Destinatários resolvidos antes do commit: nada depois dele pode falhar.
        let finance = self.access_repo.users_in_role(&mut *tx, Role::Finance).await?;

        tx.commit().await?;

        tracing::info!(%payout_id, %apartment_id, gross = %split.gross, net = %split.net, %rate, "Payout solicitado");

        self.notifier.notify_all(
            &finance,
            &format!(
                "Novo pedido de payout de {} (líquido: {}) para {} (ID: {})",
                split.gross, split.net, apartment.name, payout_id
            ),
        );

        Ok(payout)
    }

    // =========================================================================
    //  APROVAÇÃO / REJEIÇÃO
    // =========================================================================

    /// Aprova o payout. O comprovante (se houver) é gravado antes da
    /// alteração de status; falha ao gravar aborta a aprovação.
    pub async fn approve(&self, payout_id: Uuid, receipt: Option<Receipt>, actor_id: Uuid) -> Result<Payout, AppError> {
        self.require_finance(actor_id).await?;

        // Checagem prévia para não gravar arquivo de um payout já finalizado
        let current = self
            .payout_repo
            .find_by_id(&self.pool, payout_id)
            .await?
            .ok_or(AppError::NotFound("Payout"))?;
        if current.status.is_terminal() {
            return Err(AppError::AlreadyTerminal("Payout"));
        }

        let new_receipt = match receipt.filter(|r| !r.bytes.is_empty()) {
            Some(r) => Some(self.blob_store.store(&r.bytes, &r.extension).await?),
            None => None,
        };

        let result = self.approve_in_tx(payout_id, new_receipt.as_deref(), actor_id).await;

        let (approved, previous_receipt) = match result {
            Ok(ok) => ok,
            Err(e) => {
                // Arquivo gravado para uma aprovação que não aconteceu
                if let Some(url) = &new_receipt {
                    if let Err(cleanup) = self.blob_store.delete(url).await {
                        tracing::warn!(%url, error = %cleanup, "Falha ao remover comprovante órfão");
                    }
                }
                return Err(e);
            }
        };

        if let (Some(old), Some(_)) = (&previous_receipt, &new_receipt) {
            if let Err(e) = self.blob_store.delete(old).await {
                tracing::warn!(url = %old, error = %e, "Falha ao remover comprovante antigo");
            }
        }

        tracing::info!(%payout_id, receipt = ?approved.receipt_url, "Payout aprovado");
        self.notifier.notify(
            approved.requested_by,
            &format!(
                "Seu pedido de payout de {} (líquido: {}) foi aprovado.",
                approved.gross, approved.net
            ),
        );
        Ok(approved)
    }

    async fn approve_in_tx(
        &self,
        payout_id: Uuid,
        receipt_url: Option<&str>,
        actor_id: Uuid,
    ) -> Result<(Payout, Option<String>), AppError> {
        let mut tx = self.pool.begin().await?;

        let payout = self
            .payout_repo
            .find_by_id_for_update(&mut *tx, payout_id)
            .await?
            .ok_or(AppError::NotFound("Payout"))?;
        if payout.status.is_terminal() {
            return Err(AppError::AlreadyTerminal("Payout"));
        }

        let approved = self
            .payout_repo
            .mark_approved(&mut *tx, payout_id, receipt_url)
            .await?
            .ok_or_else(|| AppError::Conflict("payout alterado por outra operação".into()))?;

        let apartment_name = self
            .apartment_repo
            .find_by_id(&mut *tx, payout.apartment_id)
            .await?
            .map(|a| a.name)
            .unwrap_or_default();

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(actor_id),
                AuditAction::ApprovePayout,
                Some(payout_id),
                &format!(
                    "Payout de {} (líquido: {}) para {} aprovado",
                    payout.gross, payout.net, apartment_name
                ),
            )
            .await?;

        tx.commit().await?;
        Ok((approved, payout.receipt_url))
    }

    /// Rejeita o payout e devolve o valor bruto ao saldo do apartamento.
    pub async fn reject(&self, payout_id: Uuid, reason: &str, actor_id: Uuid) -> Result<Payout, AppError> {
        self.require_finance(actor_id).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput("o motivo da rejeição é obrigatório".into()));
        }

        let mut tx = self.pool.begin().await?;

        let payout = self
            .payout_repo
            .find_by_id_for_update(&mut *tx, payout_id)
            .await?
            .ok_or(AppError::NotFound("Payout"))?;
        if payout.status.is_terminal() {
            return Err(AppError::AlreadyTerminal("Payout"));
        }

        let rejected = self
            .payout_repo
            .mark_rejected(&mut *tx, payout_id, reason)
            .await?
            .ok_or_else(|| AppError::Conflict("payout alterado por outra operação".into()))?;

        self.ledger_repo
            .post_entry(
                &mut *tx,
                payout.apartment_id,
                BalanceMovement::PayoutRejected { payout_id, gross: payout.gross },
            )
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(actor_id),
                AuditAction::RejectPayout,
                Some(payout_id),
                &format!(
                    "Payout de {} (líquido: {}) rejeitado. Motivo: {}",
                    payout.gross, payout.net, reason
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(%payout_id, %reason, "Payout rejeitado; saldo devolvido");
        self.notifier.notify(
            rejected.requested_by,
            &format!("Seu pedido de payout de {} foi rejeitado. Motivo: {}", rejected.gross, reason),
        );
        Ok(rejected)
    }

    // =========================================================================
    //  TAXA DE RETENÇÃO
    // =========================================================================

    pub async fn current_retention_rate(&self) -> Result<CurrentRetentionRate, AppError> {
        Ok(self.retention_repo.latest().await?.into())
    }

    pub async fn set_retention_rate(&self, rate: Decimal, actor_id: Uuid) -> Result<RetentionRate, AppError> {
        self.require_finance(actor_id).await?;
        let rate = validate_rate(rate).map_err(AppError::InvalidRate)?;

        let mut tx = self.pool.begin().await?;
        let row = self.retention_repo.insert(&mut *tx, rate).await?;
        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(actor_id),
                AuditAction::UpdateRetentionRate,
                Some(row.id),
                &format!("Taxa de retenção atualizada para {}%", (rate * Decimal::ONE_HUNDRED).normalize()),
            )
            .await?;
        tx.commit().await?;

        tracing::info!(%rate, "Taxa de retenção atualizada");
        Ok(row)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    /// Financeiro vê todos os pedidos; os demais, só os que fizeram.
    pub async fn list_payouts(&self, viewer_id: Uuid, page: &PageQuery) -> Result<Paginated<PayoutDetail>, AppError> {
        let filter = if self.access_repo.has_role(viewer_id, Role::Finance).await? {
            None
        } else {
            Some(viewer_id)
        };
        let items = self.payout_repo.list(filter, page.limit(), page.offset()).await?;
        let total = self.payout_repo.count(filter).await?;
        Ok(Paginated::new(items, page.page(), total))
    }

    pub async fn find_payout(&self, payout_id: Uuid, viewer_id: Uuid) -> Result<Payout, AppError> {
        let payout = self
            .payout_repo
            .find_by_id(&self.pool, payout_id)
            .await?
            .ok_or(AppError::NotFound("Payout"))?;
        let allowed = payout.requested_by == viewer_id
            || self.access_repo.has_capability(viewer_id, payout.apartment_id).await?
            || self.access_repo.has_role(viewer_id, Role::Finance).await?;
        if !allowed {
            return Err(AppError::Forbidden("usuário sem acesso a este payout".into()));
        }
        Ok(payout)
    }
}
