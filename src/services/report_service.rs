// src/services/report_service.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
    },
    db::{AccessRepository, ApartmentRepository, AuditRepository, PayoutRepository, RetentionRepository, SaleRepository},
    models::{
        apartment::ApartmentSummary,
        audit::AuditLog,
        auth::Role,
        payout::CurrentRetentionRate,
        reports::FinanceSummary,
    },
};

#[derive(Clone)]
pub struct ReportService {
    apartment_repo: ApartmentRepository,
    sale_repo: SaleRepository,
    payout_repo: PayoutRepository,
    retention_repo: RetentionRepository,
    access_repo: AccessRepository,
    audit_repo: AuditRepository,
}

impl ReportService {
    pub fn new(
        apartment_repo: ApartmentRepository,
        sale_repo: SaleRepository,
        payout_repo: PayoutRepository,
        retention_repo: RetentionRepository,
        access_repo: AccessRepository,
        audit_repo: AuditRepository,
    ) -> Self {
        Self { apartment_repo, sale_repo, payout_repo, retention_repo, access_repo, audit_repo }
    }

    /// Visão consolidada do financeiro. A janela filtra apenas os valores
    /// com data (retenção cobrada e vendas pendentes).
    pub async fn finance_summary(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<FinanceSummary, AppError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::InvalidInput("o início do período é posterior ao fim".into()));
            }
        }

        let total_balance = self.apartment_repo.total_balance().await?;
        let retention_collected = self.payout_repo.retention_collected(None, start, end).await?;
        let pending_payouts = self.payout_repo.pending_total(None).await?;
        let pending_sales = self.sale_repo.count_pending(start, end).await?;
        let current = CurrentRetentionRate::from(self.retention_repo.latest().await?);

        Ok(FinanceSummary {
            total_balance,
            retention_collected,
            pending_payouts,
            pending_sales,
            current_retention_rate: current.rate,
            start,
            end,
        })
    }

    pub async fn apartment_summary(&self, apartment_id: Uuid, viewer_id: Uuid) -> Result<ApartmentSummary, AppError> {
        let allowed = self.access_repo.has_capability(viewer_id, apartment_id).await?
            || self.access_repo.has_role(viewer_id, Role::Finance).await?;
        if !allowed {
            return Err(AppError::Forbidden("usuário sem acesso a este apartamento".into()));
        }

        let apartment = self
            .apartment_repo
            .find_by_id(self.apartment_repo.pool(), apartment_id)
            .await?
            .ok_or(AppError::NotFound("Apartamento"))?;

        Ok(ApartmentSummary {
            apartment_id,
            name: apartment.name,
            balance: apartment.balance,
            retention_paid: self.payout_repo.retention_collected(Some(apartment_id), None, None).await?,
            pending_payouts: self.payout_repo.pending_total(Some(apartment_id)).await?,
        })
    }

    pub async fn audit_logs(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        page: &PageQuery,
    ) -> Result<Paginated<AuditLog>, AppError> {
        let items = self.audit_repo.list(start, end, page.limit(), page.offset()).await?;
        let total = self.audit_repo.count(start, end).await?;
        Ok(Paginated::new(items, page.page(), total))
    }
}
