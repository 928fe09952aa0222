// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Storefront ---
        handlers::storefront::handle_update,

        // --- Sales ---
        handlers::sales::list_sales,
        handlers::sales::sync_pending,
        handlers::sales::confirm_sale,
        handlers::sales::reject_sale,

        // --- Payouts ---
        handlers::payouts::list_payouts,
        handlers::payouts::request_payout,
        handlers::payouts::get_payout,
        handlers::payouts::approve_payout,
        handlers::payouts::reject_payout,

        // --- Retention ---
        handlers::retention::current_rate,
        handlers::retention::set_rate,

        // --- Protocols ---
        handlers::protocols::list_protocols,
        handlers::protocols::open_protocol,
        handlers::protocols::view_protocol,
        handlers::protocols::add_comment,
        handlers::protocols::close_protocol,

        // --- Audit / Reports ---
        handlers::audit::list_audit_logs,
        handlers::reports::finance_summary,
        handlers::reports::apartment_summary,

        // --- Notifications ---
        handlers::notifications::stream,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::Role,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::MeResponse,

            // --- Apartments ---
            models::apartment::Apartment,
            models::apartment::Product,
            models::apartment::ApartmentSummary,

            // --- Sales / Payments ---
            models::payment::ProviderKind,
            models::sale::SaleStatus,
            models::sale::Sale,
            models::sale::SaleDetail,
            models::sale::SyncReport,
            models::ledger::BalanceEntryKind,
            models::ledger::BalanceEntry,

            // --- Payouts ---
            models::payout::PayoutStatus,
            models::payout::Payout,
            models::payout::PayoutDetail,
            models::payout::RetentionRate,
            models::payout::CurrentRetentionRate,

            // --- Protocols ---
            models::reconciliation::DisputeType,
            models::reconciliation::ProtocolStatus,
            models::reconciliation::ProtocolTarget,
            models::reconciliation::ReconciliationProtocol,
            models::reconciliation::ProtocolComment,
            models::reconciliation::ProtocolView,

            // --- Audit / Reports ---
            models::audit::AuditLog,
            models::reports::FinanceSummary,

            // --- Storefront ---
            models::storefront::StorefrontUpdate,
            models::storefront::StorefrontReply,
            models::storefront::ReplyButton,
            models::storefront::StorefrontResponse,

            // --- Notifications ---
            services::notifier::Notification,

            // --- Payloads ---
            handlers::sales::RejectSalePayload,
            handlers::payouts::RequestPayoutPayload,
            handlers::payouts::RejectPayoutPayload,
            handlers::payouts::ApprovePayoutForm,
            handlers::retention::SetRetentionRatePayload,
            handlers::protocols::OpenProtocolPayload,
            handlers::protocols::AddCommentPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Dados do Usuário, Papéis e Apartamentos"),
        (name = "Storefront", description = "Vitrine conversacional dos compradores"),
        (name = "Sales", description = "Vendas e Confirmação de Pagamentos"),
        (name = "Payouts", description = "Pedidos de Recebimento dos Donos"),
        (name = "Retention", description = "Taxa de Retenção"),
        (name = "Protocols", description = "Protocolos de Reconciliação"),
        (name = "Audit", description = "Trilha de Auditoria"),
        (name = "Reports", description = "Indicadores Financeiros"),
        (name = "Notifications", description = "Avisos em tempo real (SSE)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/storefront/updates",
            "/api/payouts/{id}/approve",
            "/api/protocols/{id}/comments",
            "/api/notifications/stream",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} sem documentação");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("api_jwt"));
    }
}
