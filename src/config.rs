// src/config.rs

pub mod settings;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::{
    config::settings::Settings,
    db::{
        AccessRepository, ApartmentRepository, AuditRepository, LedgerRepository, PayoutRepository,
        ReconciliationRepository, RetentionRepository, SaleRepository, UserRepository,
    },
    services::{
        auth::AuthService,
        blob_store::{BlobStore, LocalBlobStore},
        notifier::{BroadcastNotifier, Notifier},
        payment::PaymentRouter,
        session_store::SessionStore,
        storefront::Step,
        LedgerService, PayoutService, ReconciliationService, ReportService, StorefrontService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub ledger_service: LedgerService,
    pub payout_service: PayoutService,
    pub reconciliation_service: ReconciliationService,
    pub report_service: ReportService,
    pub storefront_service: StorefrontService,
    // O SSE precisa do tipo concreto para assinar o canal
    pub notifier: BroadcastNotifier,
    pub sessions: Arc<SessionStore<Step>>,
    pub uploads: LocalBlobStore,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(db_pool, settings)
    }

    /// Monta o gráfico de dependências sobre um pool já aberto.
    pub fn build(db_pool: PgPool, settings: &Settings) -> anyhow::Result<Self> {
        let router = PaymentRouter::from_settings(&settings.payment)?;
        let notifier = BroadcastNotifier::default();
        let shared_notifier: Arc<dyn Notifier> = Arc::new(notifier.clone());
        let uploads = LocalBlobStore::new(settings.uploads_dir.clone());
        let blob_store: Arc<dyn BlobStore> = Arc::new(uploads.clone());
        let sessions = Arc::new(SessionStore::new(settings.session_ttl));

        let user_repo = UserRepository::new(db_pool.clone());
        let access_repo = AccessRepository::new(db_pool.clone());
        let apartment_repo = ApartmentRepository::new(db_pool.clone());
        let sale_repo = SaleRepository::new(db_pool.clone());
        let payout_repo = PayoutRepository::new(db_pool.clone());
        let retention_repo = RetentionRepository::new(db_pool.clone());
        let ledger_repo = LedgerRepository::new(db_pool.clone());
        let protocol_repo = ReconciliationRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, access_repo.clone(), settings.jwt_secret.clone());

        let ledger_service = LedgerService::new(
            db_pool.clone(),
            apartment_repo.clone(),
            sale_repo.clone(),
            ledger_repo.clone(),
            access_repo.clone(),
            audit_repo.clone(),
            router,
            shared_notifier.clone(),
            settings.pix_admin_key.clone(),
        );

        let payout_service = PayoutService::new(
            db_pool.clone(),
            apartment_repo.clone(),
            payout_repo.clone(),
            retention_repo.clone(),
            ledger_repo,
            access_repo.clone(),
            audit_repo.clone(),
            blob_store,
            shared_notifier.clone(),
        );

        let reconciliation_service = ReconciliationService::new(
            db_pool.clone(),
            protocol_repo,
            sale_repo.clone(),
            payout_repo.clone(),
            access_repo.clone(),
            audit_repo.clone(),
            shared_notifier,
        );

        let report_service = ReportService::new(
            apartment_repo.clone(),
            sale_repo,
            payout_repo,
            retention_repo,
            access_repo,
            audit_repo,
        );

        let storefront_service = StorefrontService::new(
            apartment_repo,
            ledger_service.clone(),
            sessions.clone(),
            settings.pix_admin_key.clone(),
        );

        Ok(Self {
            db_pool,
            auth_service,
            ledger_service,
            payout_service,
            reconciliation_service,
            report_service,
            storefront_service,
            notifier,
            sessions,
            uploads,
        })
    }
}

impl FromRef<AppState> for AccessRepository {
    fn from_ref(state: &AppState) -> Self {
        AccessRepository::new(state.db_pool.clone())
    }
}
