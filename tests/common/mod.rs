// tests/common/mod.rs
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use backoffice::{
    common::{error::AppError, money::Money},
    config::{settings::Settings, AppState},
    db::{
        AccessRepository, ApartmentRepository, AuditRepository, LedgerRepository, SaleRepository,
        UserRepository,
    },
    models::{apartment::Product, auth::Role, payment::ProviderKind},
    services::{
        payment::{PaymentProvider, PaymentRouter},
        LedgerService,
    },
};
use sqlx::PgPool;
use uuid::Uuid;

/// O que o gateway de teste responde ao consultar um pagamento.
#[derive(Debug, Clone, Copy)]
pub enum Answer {
    Paid,
    Unpaid,
    Down,
}

/// Gateway em memória com respostas programadas por ID de pagamento.
#[derive(Default)]
pub struct ScriptedGateway {
    created: AtomicUsize,
    answers: Mutex<HashMap<String, Answer>>,
}

impl ScriptedGateway {
    pub fn answer(&self, payment_id: &str, answer: Answer) {
        self.answers.lock().unwrap().insert(payment_id.to_string(), answer);
    }
}

#[async_trait]
impl PaymentProvider for ScriptedGateway {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MercadoPago
    }

    fn requires_manual_confirmation(&self) -> bool {
        false
    }

    async fn create_payment(&self, _amount: Money, _destination_key: &str) -> Result<String, AppError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mp-{n}"))
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<bool, AppError> {
        let answer = self.answers.lock().unwrap().get(payment_id).copied().unwrap_or(Answer::Unpaid);
        match answer {
            Answer::Paid => Ok(true),
            Answer::Unpaid => Ok(false),
            Answer::Down => Err(AppError::ProviderError("mercado_pago: tempo esgotado".into())),
        }
    }
}

pub struct Fixture {
    pub state: AppState,
    pub pool: PgPool,
    pub finance_id: Uuid,
    pub owner_id: Uuid,
    pub apartment_id: Uuid,
    pub uploads: tempfile::TempDir,
}

pub async fn setup(pool: PgPool) -> Fixture {
    let uploads = tempfile::tempdir().unwrap();
    let uploads_dir = uploads.path().to_string_lossy().to_string();
    let settings = Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/ignorado".into()),
        "JWT_SECRET" => Some("segredo-de-teste".into()),
        "UPLOADS_DIR" => Some(uploads_dir.clone()),
        "PIX_ADMIN_KEY" => Some("financeiro@pix.com.br".into()),
        _ => None,
    })
    .unwrap();
    let state = AppState::build(pool.clone(), &settings).unwrap();

    let users = UserRepository::new(pool.clone());
    let access = AccessRepository::new(pool.clone());
    let apartments = ApartmentRepository::new(pool.clone());

    let finance = users.create_user(&pool, "financeiro@exemplo.com", "hash").await.unwrap();
    let owner = users.create_user(&pool, "dono@exemplo.com", "hash").await.unwrap();
    access.grant_role(&pool, finance.id, Role::Finance).await.unwrap();

    let apartment = apartments
        .create_apartment(&pool, "Apartamento 101", "apt101", "dono@pix.com.br")
        .await
        .unwrap();
    access.link_apartment(&pool, owner.id, apartment.id).await.unwrap();

    Fixture {
        state,
        pool,
        finance_id: finance.id,
        owner_id: owner.id,
        apartment_id: apartment.id,
        uploads,
    }
}

impl Fixture {
    pub async fn product(&self, apartment_id: Uuid, name: &str, cents: i64) -> Product {
        ApartmentRepository::new(self.pool.clone())
            .create_product(&self.pool, apartment_id, name, Money::from_cents(cents), "4321")
            .await
            .unwrap()
    }

    pub async fn balance(&self, apartment_id: Uuid) -> Money {
        ApartmentRepository::new(self.pool.clone())
            .find_by_id(&self.pool, apartment_id)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    /// Serviço de vendas sobre o mesmo banco, com o gateway de teste como único provedor.
    pub fn gateway_ledger(&self, gateway: Arc<ScriptedGateway>) -> LedgerService {
        let router = PaymentRouter::new(vec![gateway as Arc<dyn PaymentProvider>]).unwrap();
        LedgerService::new(
            self.pool.clone(),
            ApartmentRepository::new(self.pool.clone()),
            SaleRepository::new(self.pool.clone()),
            LedgerRepository::new(self.pool.clone()),
            AccessRepository::new(self.pool.clone()),
            AuditRepository::new(self.pool.clone()),
            router,
            Arc::new(self.state.notifier.clone()),
            "financeiro@pix.com.br".into(),
        )
    }

    pub async fn is_available(&self, product_id: Uuid) -> bool {
        ApartmentRepository::new(self.pool.clone())
            .find_product(&self.pool, product_id)
            .await
            .unwrap()
            .unwrap()
            .is_available
    }

    /// Vende um produto via PIX manual e confirma, creditando o apartamento.
    pub async fn credit(&self, cents: i64) -> Uuid {
        let product = self.product(self.apartment_id, "Crédito", cents).await;
        let detail = self
            .state
            .ledger_service
            .record_sale(product.id, "comprador-1")
            .await
            .unwrap();
        self.state
            .ledger_service
            .confirm_sale(detail.sale.id, self.finance_id)
            .await
            .unwrap();
        detail.sale.id
    }
}
