// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::{
        db_utils::{PageQuery, Paginated},
        error::AppError,
    },
    config::AppState,
    middleware::rbac::RequireFinance,
    models::{audit::AuditLog, reports::DateRangeQuery},
};

// GET /api/audit-logs
#[utoipa::path(
    get,
    path = "/api/audit-logs",
    tag = "Audit",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Trilha de auditoria, mais recentes primeiro", body = Paginated<AuditLog>),
        (status = 403, description = "Restrito ao financeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    _finance: RequireFinance,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Paginated<AuditLog>>, AppError> {
    let page = PageQuery { page: query.page };
    let logs = app_state
        .report_service
        .audit_logs(query.start, query.end, &page)
        .await?;
    Ok(Json(logs))
}
