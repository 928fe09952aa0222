// src/handlers/retention.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireFinance},
    models::payout::{parse_rate, CurrentRetentionRate, RetentionRate},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRetentionRatePayload {
    /// Fração entre 0 e 1; aceita vírgula ou ponto.
    #[schema(example = "0,05")]
    pub rate: String,
}

// GET /api/retention-rates
#[utoipa::path(
    get,
    path = "/api/retention-rates",
    tag = "Retention",
    responses(
        (status = 200, description = "Taxa vigente (5% quando não há histórico)", body = CurrentRetentionRate)
    ),
    security(("api_jwt" = []))
)]
pub async fn current_rate(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<CurrentRetentionRate>, AppError> {
    Ok(Json(app_state.payout_service.current_retention_rate().await?))
}

// POST /api/retention-rates
#[utoipa::path(
    post,
    path = "/api/retention-rates",
    tag = "Retention",
    request_body = SetRetentionRatePayload,
    responses(
        (status = 201, description = "Nova taxa registrada", body = RetentionRate),
        (status = 400, description = "Taxa fora de [0, 1]"),
        (status = 403, description = "Restrito ao financeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_rate(
    State(app_state): State<AppState>,
    RequireFinance(user): RequireFinance,
    Json(payload): Json<SetRetentionRatePayload>,
) -> Result<(StatusCode, Json<RetentionRate>), AppError> {
    let rate = parse_rate(&payload.rate).map_err(AppError::InvalidRate)?;
    let row = app_state.payout_service.set_retention_rate(rate, user.id).await?;
    Ok((StatusCode::CREATED, Json(row)))
}
