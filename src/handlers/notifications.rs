// src/handlers/notifications.rs

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};

use crate::{config::AppState, middleware::auth::AuthenticatedUser, services::notifier::Notification};

// GET /api/notifications/stream
// Server-sent events com os avisos do usuário autenticado, a partir da conexão.
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    tag = "Notifications",
    responses(
        (status = 200, description = "Stream SSE (evento `notification`)", body = Notification, content_type = "text/event-stream")
    ),
    security(("api_jwt" = []))
)]
pub async fn stream(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!(user_id = %user.id, "Stream de avisos aberto");

    let events = app_state
        .notifier
        .stream_for(user.id)
        .map(|notification| Event::default().event("notification").json_data(notification));

    Sse::new(events).keep_alive(KeepAlive::default())
}
