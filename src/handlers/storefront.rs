// src/handlers/storefront.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::storefront::{StorefrontResponse, StorefrontUpdate},
};

// POST /api/storefront/updates
// Recebe uma mensagem (ou clique) do comprador e devolve as respostas do bot.
#[utoipa::path(
    post,
    path = "/api/storefront/updates",
    tag = "Storefront",
    request_body = StorefrontUpdate,
    responses(
        (status = 200, description = "Respostas a enviar ao comprador", body = StorefrontResponse),
        (status = 400, description = "Atualização inválida")
    )
)]
pub async fn handle_update(
    State(app_state): State<AppState>,
    Json(update): Json<StorefrontUpdate>,
) -> Result<Json<StorefrontResponse>, AppError> {
    update.validate()?;

    let replies = app_state.storefront_service.handle(&update).await?;
    Ok(Json(StorefrontResponse { replies }))
}
