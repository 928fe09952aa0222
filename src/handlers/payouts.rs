// src/handlers/payouts.rs

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
        money::Money,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireFinance},
    models::payout::{Payout, PayoutDetail},
    services::payout_service::Receipt,
};

/// Campo do formulário multipart com o comprovante.
const RECEIPT_FIELD: &str = "receipt";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayoutPayload {
    pub apartment_id: Uuid,
    #[schema(value_type = f64, example = 40.0)]
    pub amount: Money,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectPayoutPayload {
    #[validate(length(min = 1, max = 500, message = "O motivo da rejeição é obrigatório."))]
    #[schema(example = "Chave PIX divergente")]
    pub reason: String,
}

/// Documentação do formulário de aprovação (o comprovante é opcional).
#[derive(ToSchema)]
pub struct ApprovePayoutForm {
    #[schema(value_type = Option<String>, format = Binary)]
    pub receipt: Option<Vec<u8>>,
}

// GET /api/payouts
#[utoipa::path(
    get,
    path = "/api/payouts",
    tag = "Payouts",
    params(PageQuery),
    responses(
        (status = 200, description = "Pedidos visíveis ao usuário", body = Paginated<PayoutDetail>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payouts(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<PayoutDetail>>, AppError> {
    let payouts = app_state.payout_service.list_payouts(user.id, &page).await?;
    Ok(Json(payouts))
}

// POST /api/payouts
#[utoipa::path(
    post,
    path = "/api/payouts",
    tag = "Payouts",
    request_body = RequestPayoutPayload,
    responses(
        (status = 201, description = "Pedido criado; saldo debitado", body = Payout),
        (status = 400, description = "Valor inválido"),
        (status = 403, description = "Sem vínculo com o apartamento"),
        (status = 422, description = "Saldo insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_payout(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RequestPayoutPayload>,
) -> Result<(StatusCode, Json<Payout>), AppError> {
    let payout = app_state
        .payout_service
        .request(payload.apartment_id, user.id, payload.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(payout)))
}

// GET /api/payouts/{id}
#[utoipa::path(
    get,
    path = "/api/payouts/{id}",
    tag = "Payouts",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido de recebimento", body = Payout),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payout(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(payout_id): Path<Uuid>,
) -> Result<Json<Payout>, AppError> {
    Ok(Json(app_state.payout_service.find_payout(payout_id, user.id).await?))
}

// POST /api/payouts/{id}/approve
#[utoipa::path(
    post,
    path = "/api/payouts/{id}/approve",
    tag = "Payouts",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body(content = ApprovePayoutForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Pedido aprovado", body = Payout),
        (status = 409, description = "Pedido já finalizado"),
        (status = 500, description = "Falha ao gravar o comprovante")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_payout(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Path(payout_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Payout>, AppError> {
    let mut receipt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.body_text()))?
    {
        if field.name() != Some(RECEIPT_FIELD) {
            continue;
        }
        let extension = field
            .file_name()
            .and_then(|name| FsPath::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        receipt = Some(Receipt { bytes: bytes.to_vec(), extension });
    }

    let payout = app_state.payout_service.approve(payout_id, receipt, user.id).await?;
    Ok(Json(payout))
}

// POST /api/payouts/{id}/reject
#[utoipa::path(
    post,
    path = "/api/payouts/{id}/reject",
    tag = "Payouts",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = RejectPayoutPayload,
    responses(
        (status = 200, description = "Pedido rejeitado; saldo devolvido", body = Payout),
        (status = 409, description = "Pedido já finalizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_payout(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Path(payout_id): Path<Uuid>,
    Json(payload): Json<RejectPayoutPayload>,
) -> Result<Json<Payout>, AppError> {
    payload.validate()?;
    let payout = app_state
        .payout_service
        .reject(payout_id, &payload.reason, user.id)
        .await?;
    Ok(Json(payout))
}
