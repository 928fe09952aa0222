// src/services/ledger_service.rs

//! Ciclo de vida das vendas: registro (produto reservado), confirmação do
//! pagamento (crédito único no saldo do apartamento) e rejeição.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
    },
    db::{AccessRepository, ApartmentRepository, AuditRepository, LedgerRepository, SaleRepository},
    models::{
        audit::{Actor, AuditAction},
        auth::Role,
        ledger::BalanceMovement,
        sale::{PollOutcome, Sale, SaleDetail, SaleStatus, SyncReport},
    },
    services::{notifier::Notifier, payment::PaymentRouter},
};

/// O que a consulta ao provedor decidiu para uma venda pendente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Confirm,
    Fail,
}

#[derive(Clone)]
pub struct LedgerService {
    pool: PgPool,
    apartment_repo: ApartmentRepository,
    sale_repo: SaleRepository,
    ledger_repo: LedgerRepository,
    access_repo: AccessRepository,
    audit_repo: AuditRepository,
    router: PaymentRouter,
    notifier: Arc<dyn Notifier>,
    // Chave PIX do financeiro, destino das cobranças
    pix_admin_key: String,
}

impl LedgerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        apartment_repo: ApartmentRepository,
        sale_repo: SaleRepository,
        ledger_repo: LedgerRepository,
        access_repo: AccessRepository,
        audit_repo: AuditRepository,
        router: PaymentRouter,
        notifier: Arc<dyn Notifier>,
        pix_admin_key: String,
    ) -> Self {
        Self {
            pool,
            apartment_repo,
            sale_repo,
            ledger_repo,
            access_repo,
            audit_repo,
            router,
            notifier,
            pix_admin_key,
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
    //  REGISTRO
    // =========================================================================

    /// Reserva o produto e cria a venda pendente.
    ///
    /// A cobrança é criada no provedor antes de abrir a transação; dentro dela
    /// o produto é travado e a disponibilidade conferida de novo.
    pub async fn record_sale(&self, product_id: Uuid, buyer_id: &str) -> Result<SaleDetail, AppError> {
        let product = self
            .apartment_repo
            .find_product(&self.pool, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        if !product.is_available {
            return Err(AppError::ProductUnavailable);
        }

        let payment = self.router.create_payment(product.price, &self.pix_admin_key).await?;

        let mut tx = self.pool.begin().await?;

        let locked = self
            .apartment_repo
            .find_product_for_update(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        if !locked.is_available {
            tracing::warn!(
                %product_id,
                payment_id = %payment.payment_id,
                "Produto reservado por outra compra; cobrança criada fica sem venda"
            );
            return Err(AppError::ProductUnavailable);
        }
        if locked.price != product.price {
            return Err(AppError::Conflict("preço do produto mudou durante a compra".into()));
        }

        self.apartment_repo
            .set_product_availability(&mut *tx, product_id, false)
            .await?;

        let sale = self
            .sale_repo
            .insert(
                &mut *tx,
                Uuid::new_v4(),
                product_id,
                buyer_id,
                locked.price,
                payment.provider,
                &payment.payment_id,
            )
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::Buyer(buyer_id.to_string()),
                AuditAction::RecordSale,
                Some(sale.id),
                &format!(
                    "Venda de {} por {} registrada (provedor {}, pagamento {})",
                    locked.name, sale.amount, sale.provider, sale.payment_id
                ),
            )
            .await?;

        let detail = self
            .sale_repo
            .find_detail(&mut *tx, sale.id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;
        let finance = self.access_repo.users_in_role(&mut *tx, Role::Finance).await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, %product_id, provider = %sale.provider, "Venda registrada");

        self.notifier.notify_all(
            &finance,
            &format!(
                "Nova transação: {} comprado por {} (ID: {}, PaymentId: {}).",
                detail.product_name, detail.sale.amount, detail.sale.id, detail.sale.payment_id
            ),
        );

        Ok(detail)
    }

    // =========================================================================
    //  CONFIRMAÇÃO / REJEIÇÃO
    // =========================================================================

    /// Confirmação pedida pelo financeiro.
    ///
    /// PIX manual: a própria aprovação humana confirma. Gateway: consulta o
    /// provedor que criou o pagamento; `false` marca a venda como falha e
    /// libera o produto. Erro do provedor deixa a venda pendente.
    pub async fn confirm_sale(&self, sale_id: Uuid, actor_id: Uuid) -> Result<Sale, AppError> {
        self.require_finance(actor_id).await?;

        let sale = self
            .sale_repo
            .find_by_id(&self.pool, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;
        if sale.status.is_terminal() {
            return Ok(sale);
        }

        let verdict = if sale.is_manual() {
            Verdict::Confirm
        } else {
            match self.router.confirm_payment_via(sale.provider, &sale.payment_id).await {
                Ok(true) => Verdict::Confirm,
                Ok(false) => Verdict::Fail,
                Err(e) => {
                    tracing::warn!(%sale_id, error = %e, "Provedor indisponível; venda continua pendente");
                    return Err(e);
                }
            }
        };

        match self.finalize(sale_id, verdict, &Actor::User(actor_id)).await? {
            Some(sale) => Ok(sale),
            // Finalizada por outra operação enquanto o provedor respondia
            None => self
                .sale_repo
                .find_by_id(&self.pool, sale_id)
                .await?
                .ok_or(AppError::NotFound("Venda")),
        }
    }

    /// Rejeição manual de um PIX que não chegou. Não mexe no saldo.
    pub async fn reject_manual_sale(&self, sale_id: Uuid, reason: &str, actor_id: Uuid) -> Result<Sale, AppError> {
        self.require_finance(actor_id).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput("o motivo da rejeição é obrigatório".into()));
        }

        let mut tx = self.pool.begin().await?;

        let sale = self
            .sale_repo
            .find_by_id_for_update(&mut *tx, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;
        if !sale.is_manual() {
            return Err(AppError::NotManualPayment);
        }
        if sale.status.is_terminal() {
            return Err(AppError::AlreadyTerminal("Venda"));
        }

        let failed = self
            .sale_repo
            .mark_failed(&mut *tx, sale_id, Some(reason))
            .await?
            .ok_or_else(|| AppError::Conflict("venda alterada por outra operação".into()))?;
        self.apartment_repo
            .set_product_availability(&mut *tx, sale.product_id, true)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &Actor::User(actor_id),
                AuditAction::RejectPayment,
                Some(sale_id),
                &format!("Pagamento de {} rejeitado. Motivo: {}", sale.amount, reason),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(%sale_id, %reason, "Pagamento PIX manual rejeitado; produto liberado");
        Ok(failed)
    }

    /// Consulta o gateway e confirma apenas se o pagamento foi concluído.
    /// Nunca marca falha: uma venda ainda não paga continua pendente.
    pub async fn poll_sale(&self, sale_id: Uuid) -> Result<PollOutcome, AppError> {
        let sale = self
            .sale_repo
            .find_by_id(&self.pool, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;
        if sale.status.is_terminal() {
            return Ok(PollOutcome::AlreadyFinal);
        }
        if sale.is_manual() {
            return Ok(PollOutcome::StillPending);
        }

        if !self.router.confirm_payment_via(sale.provider, &sale.payment_id).await? {
            return Ok(PollOutcome::StillPending);
        }

        match self.finalize(sale_id, Verdict::Confirm, &Actor::System).await? {
            Some(s) if s.status == SaleStatus::Confirmed => Ok(PollOutcome::Confirmed),
            _ => Ok(PollOutcome::AlreadyFinal),
        }
    }

    /// Varre as vendas de gateway pendentes. Falhas de provedor são contadas
    /// e a varredura segue.
    pub async fn sync_pending_gateway_sales(&self, actor_id: Uuid) -> Result<SyncReport, AppError> {
        self.require_finance(actor_id).await?;

        let pending = self.sale_repo.list_pending_gateway().await?;
        let mut report = SyncReport { checked: pending.len(), confirmed: 0, provider_failures: 0 };

        for sale in pending {
            match self.poll_sale(sale.id).await {
                Ok(PollOutcome::Confirmed) => report.confirmed += 1,
                Ok(_) => {}
                Err(e @ (AppError::ProviderError(_) | AppError::NoProviderAvailable)) => {
                    tracing::warn!(sale_id = %sale.id, error = %e, "Falha ao consultar provedor");
                    report.provider_failures += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            checked = report.checked,
            confirmed = report.confirmed,
            failures = report.provider_failures,
            "Sincronização de vendas pendentes concluída"
        );
        Ok(report)
    }

    /// Aplica o veredito sob lock. Retorna `None` se outra operação já
    /// finalizou a venda (nada é alterado nesse caso).
    async fn finalize(&self, sale_id: Uuid, verdict: Verdict, actor: &Actor) -> Result<Option<Sale>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = self
            .sale_repo
            .find_by_id_for_update(&mut *tx, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;
        if sale.status.is_terminal() {
            tracing::debug!(%sale_id, status = ?sale.status, "Venda já finalizada por outra operação");
            return Ok(None);
        }

        let detail = self
            .sale_repo
            .find_detail(&mut *tx, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;

        let mut owners = Vec::new();
        let updated = match verdict {
            Verdict::Confirm => {
                let confirmed = self
                    .sale_repo
                    .mark_confirmed(&mut *tx, sale_id)
                    .await?
                    .ok_or_else(|| AppError::Conflict("venda alterada por outra operação".into()))?;
                self.ledger_repo
                    .post_entry(
                        &mut *tx,
                        detail.apartment_id,
                        BalanceMovement::SaleConfirmed { sale_id, amount: sale.amount },
                    )
                    .await?;
                self.audit_repo
                    .record(
                        &mut *tx,
                        actor,
                        AuditAction::ConfirmPayment,
                        Some(sale_id),
                        &format!("Pagamento de {} para {} confirmado", sale.amount, detail.product_name),
                    )
                    .await?;
                owners = self.access_repo.owners_of(&mut *tx, detail.apartment_id).await?;
                confirmed
            }
            Verdict::Fail => {
                let failed = self
                    .sale_repo
                    .mark_failed(&mut *tx, sale_id, Some("pagamento não aprovado pelo provedor"))
                    .await?
                    .ok_or_else(|| AppError::Conflict("venda alterada por outra operação".into()))?;
                self.apartment_repo
                    .set_product_availability(&mut *tx, sale.product_id, true)
                    .await?;
                self.audit_repo
                    .record(
                        &mut *tx,
                        actor,
                        AuditAction::ConfirmPayment,
                        Some(sale_id),
                        &format!("Falha ao confirmar pagamento de {} para {}", sale.amount, detail.product_name),
                    )
                    .await?;
                failed
            }
        };

        tx.commit().await?;

        tracing::info!(%sale_id, status = ?updated.status, %actor, "Venda finalizada");

        if updated.status == SaleStatus::Confirmed {
            self.notifier.notify_all(
                &owners,
                &format!("Pagamento de {} para {} confirmado.", updated.amount, detail.product_name),
            );
        }

        Ok(Some(updated))
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn list_sales(
        &self,
        status: Option<SaleStatus>,
        page: &PageQuery,
    ) -> Result<Paginated<SaleDetail>, AppError> {
        let items = self.sale_repo.list(status, page.limit(), page.offset()).await?;
        let total = self.sale_repo.count(status).await?;
        Ok(Paginated::new(items, page.page(), total))
    }
}
