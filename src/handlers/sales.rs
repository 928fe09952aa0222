// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
    },
    config::AppState,
    middleware::rbac::RequireFinance,
    models::sale::{Sale, SaleDetail, SaleStatus, SyncReport},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SalesQuery {
    pub status: Option<SaleStatus>,
    #[param(example = 1)]
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectSalePayload {
    #[validate(length(min = 1, max = 500, message = "O motivo da rejeição é obrigatório."))]
    #[schema(example = "PIX não identificado no extrato")]
    pub reason: String,
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(SalesQuery),
    responses(
        (status = 200, description = "Vendas, mais recentes primeiro", body = Paginated<SaleDetail>),
        (status = 403, description = "Restrito ao financeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    _finance: RequireFinance,
    Query(query): Query<SalesQuery>,
) -> Result<Json<Paginated<SaleDetail>>, AppError> {
    let page = PageQuery { page: query.page };
    let sales = app_state.ledger_service.list_sales(query.status, &page).await?;
    Ok(Json(sales))
}

// POST /api/sales/sync
#[utoipa::path(
    post,
    path = "/api/sales/sync",
    tag = "Sales",
    responses(
        (status = 200, description = "Vendas pendentes de gateway consultadas", body = SyncReport),
        (status = 403, description = "Restrito ao financeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_pending(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
) -> Result<Json<SyncReport>, AppError> {
    let report = app_state.ledger_service.sync_pending_gateway_sales(user.id).await?;
    Ok(Json(report))
}

// POST /api/sales/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/sales/{id}/confirm",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda após a confirmação", body = Sale),
        (status = 404, description = "Venda não encontrada"),
        (status = 502, description = "Falha no provedor de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_sale(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<Sale>, AppError> {
    let sale = app_state.ledger_service.confirm_sale(sale_id, user.id).await?;
    Ok(Json(sale))
}

// POST /api/sales/{id}/reject
#[utoipa::path(
    post,
    path = "/api/sales/{id}/reject",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    request_body = RejectSalePayload,
    responses(
        (status = 200, description = "Venda rejeitada; produto liberado", body = Sale),
        (status = 400, description = "Venda não é PIX manual"),
        (status = 409, description = "Venda já finalizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_sale(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Path(sale_id): Path<Uuid>,
    Json(payload): Json<RejectSalePayload>,
) -> Result<Json<Sale>, AppError> {
    payload.validate()?;
    let sale = app_state
        .ledger_service
        .reject_manual_sale(sale_id, &payload.reason, user.id)
        .await?;
    Ok(Json(sale))
}
