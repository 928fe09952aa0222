// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireFinance},
    models::{
        apartment::ApartmentSummary,
        reports::{DateRangeQuery, FinanceSummary},
    },
};

// GET /api/reports/summary
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    tag = "Reports",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Resumo financeiro consolidado", body = FinanceSummary),
        (status = 403, description = "Restrito ao financeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn finance_summary(
    State(app_state): State<AppState>,
    _finance: RequireFinance,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<FinanceSummary>, AppError> {
    let summary = app_state
        .report_service
        .finance_summary(query.start, query.end)
        .await?;
    Ok(Json(summary))
}

// GET /api/apartments/{id}/summary
#[utoipa::path(
    get,
    path = "/api/apartments/{id}/summary",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "ID do apartamento")),
    responses(
        (status = 200, description = "Saldo, retenção paga e pedidos em aberto", body = ApartmentSummary),
        (status = 403, description = "Sem vínculo com o apartamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn apartment_summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(apartment_id): Path<Uuid>,
) -> Result<Json<ApartmentSummary>, AppError> {
    let summary = app_state
        .report_service
        .apartment_summary(apartment_id, user.id)
        .await?;
    Ok(Json(summary))
}
