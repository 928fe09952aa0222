// src/handlers/protocols.rs

use axum::{
    extract::{Path, Query, State},
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
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireFinance},
    models::reconciliation::{
        DisputeType, ProtocolComment, ProtocolTarget, ProtocolView, ReconciliationProtocol,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenProtocolPayload {
    pub target_kind: ProtocolTarget,
    pub target_id: Uuid,
    pub dispute_type: DisputeType,
    #[validate(length(max = 2000, message = "O comentário deve ter no máximo 2000 caracteres."))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCommentPayload {
    #[validate(length(min = 1, max = 2000, message = "O comentário não pode ser vazio."))]
    #[schema(example = "O valor recebido não confere com o extrato.")]
    pub text: String,
}

// GET /api/protocols
#[utoipa::path(
    get,
    path = "/api/protocols",
    tag = "Protocols",
    params(PageQuery),
    responses(
        (status = 200, description = "Protocolos visíveis ao usuário", body = Paginated<ReconciliationProtocol>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_protocols(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ReconciliationProtocol>>, AppError> {
    Ok(Json(app_state.reconciliation_service.list_for_user(user.id, &page).await?))
}

// POST /api/protocols
#[utoipa::path(
    post,
    path = "/api/protocols",
    tag = "Protocols",
    request_body = OpenProtocolPayload,
    responses(
        (status = 201, description = "Protocolo aberto", body = ReconciliationProtocol),
        (status = 404, description = "Transação não encontrada"),
        (status = 422, description = "Nenhum dono associado à transação")
    ),
    security(("api_jwt" = []))
)]
pub async fn open_protocol(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Json(payload): Json<OpenProtocolPayload>,
) -> Result<(StatusCode, Json<ReconciliationProtocol>), AppError> {
    payload.validate()?;
    let protocol = app_state
        .reconciliation_service
        .open(
            payload.target_kind,
            payload.target_id,
            payload.dispute_type,
            user.id,
            payload.comment.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(protocol)))
}

// GET /api/protocols/{id}
#[utoipa::path(
    get,
    path = "/api/protocols/{id}",
    tag = "Protocols",
    params(("id" = Uuid, Path, description = "ID do protocolo")),
    responses(
        (status = 200, description = "Protocolo com comentários", body = ProtocolView),
        (status = 403, description = "Usuário não participa do protocolo")
    ),
    security(("api_jwt" = []))
)]
pub async fn view_protocol(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(protocol_id): Path<Uuid>,
) -> Result<Json<ProtocolView>, AppError> {
    Ok(Json(app_state.reconciliation_service.view(protocol_id, user.id).await?))
}

// POST /api/protocols/{id}/comments
#[utoipa::path(
    post,
    path = "/api/protocols/{id}/comments",
    tag = "Protocols",
    params(("id" = Uuid, Path, description = "ID do protocolo")),
    request_body = AddCommentPayload,
    responses(
        (status = 201, description = "Comentário registrado", body = ProtocolComment),
        (status = 409, description = "Protocolo fechado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(protocol_id): Path<Uuid>,
    Json(payload): Json<AddCommentPayload>,
) -> Result<(StatusCode, Json<ProtocolComment>), AppError> {
    payload.validate()?;
    let comment = app_state
        .reconciliation_service
        .add_comment(protocol_id, user.id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// POST /api/protocols/{id}/close
#[utoipa::path(
    post,
    path = "/api/protocols/{id}/close",
    tag = "Protocols",
    params(("id" = Uuid, Path, description = "ID do protocolo")),
    responses(
        (status = 200, description = "Protocolo fechado", body = ReconciliationProtocol),
        (status = 409, description = "Protocolo já fechado")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_protocol(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Path(protocol_id): Path<Uuid>,
) -> Result<Json<ReconciliationProtocol>, AppError> {
    Ok(Json(app_state.reconciliation_service.close(protocol_id, user.id).await?))
}
