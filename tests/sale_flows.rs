// tests/sale_flows.rs
// Requerem Postgres: DATABASE_URL=postgres://... cargo test

mod common;

use std::sync::Arc;

use backoffice::{
    common::{error::AppError, money::Money},
    db::{ApartmentRepository, LedgerRepository},
    models::{
        ledger::BalanceEntryKind,
        sale::{PollOutcome, SaleStatus},
    },
};
use common::{Answer, ScriptedGateway};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn manual_sale_credits_once(pool: PgPool) {
    let fx = common::setup(pool).await;
    let product = fx.product(fx.apartment_id, "Cerveja artesanal", 2500).await;
    let ledger = &fx.state.ledger_service;

    let detail = ledger.record_sale(product.id, "1074263794").await.unwrap();
    assert_eq!(detail.sale.status, SaleStatus::Pending);
    assert!(detail.sale.is_manual());
    assert_eq!(detail.apartment_id, fx.apartment_id);

    // produto reservado
    let again = ledger.record_sale(product.id, "outro").await;
    assert!(matches!(again, Err(AppError::ProductUnavailable)));

    // consulta ao provedor nunca confirma PIX manual
    assert_eq!(ledger.poll_sale(detail.sale.id).await.unwrap(), PollOutcome::StillPending);

    let confirmed = ledger.confirm_sale(detail.sale.id, fx.finance_id).await.unwrap();
    assert_eq!(confirmed.status, SaleStatus::Confirmed);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::from_cents(2500));

    // segunda confirmação devolve a venda sem creditar de novo
    let twice = ledger.confirm_sale(detail.sale.id, fx.finance_id).await.unwrap();
    assert_eq!(twice.status, SaleStatus::Confirmed);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::from_cents(2500));
    assert_eq!(ledger.poll_sale(detail.sale.id).await.unwrap(), PollOutcome::AlreadyFinal);
}

#[sqlx::test(migrations = "./migrations")]
async fn rejected_manual_sale_releases_product(pool: PgPool) {
    let fx = common::setup(pool).await;
    let product = fx.product(fx.apartment_id, "Vinho", 8000).await;
    let ledger = &fx.state.ledger_service;

    let detail = ledger.record_sale(product.id, "1074263794").await.unwrap();

    let empty = ledger.reject_manual_sale(detail.sale.id, "  ", fx.finance_id).await;
    assert!(matches!(empty, Err(AppError::InvalidInput(_))));

    let rejected = ledger
        .reject_manual_sale(detail.sale.id, "PIX não identificado", fx.finance_id)
        .await
        .unwrap();
    assert_eq!(rejected.status, SaleStatus::Failed);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::ZERO);

    let released = ApartmentRepository::new(fx.pool.clone())
        .find_product(&fx.pool, product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(released.is_available);

    let confirm_after = ledger.confirm_sale(detail.sale.id, fx.finance_id).await.unwrap();
    assert_eq!(confirm_after.status, SaleStatus::Failed);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::ZERO);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_finance_confirms(pool: PgPool) {
    let fx = common::setup(pool).await;
    let product = fx.product(fx.apartment_id, "Água", 500).await;
    let detail = fx.state.ledger_service.record_sale(product.id, "b").await.unwrap();

    let result = fx.state.ledger_service.confirm_sale(detail.sale.id, fx.owner_id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(fx.balance(fx.apartment_id).await, Money::ZERO);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_confirmations_credit_once(pool: PgPool) {
    let fx = common::setup(pool).await;
    let product = fx.product(fx.apartment_id, "Kit churrasco", 4200).await;
    let ledger = &fx.state.ledger_service;
    let detail = ledger.record_sale(product.id, "comprador-2").await.unwrap();

    let (a, b) = tokio::join!(
        ledger.confirm_sale(detail.sale.id, fx.finance_id),
        ledger.confirm_sale(detail.sale.id, fx.finance_id),
    );
    assert_eq!(a.unwrap().status, SaleStatus::Confirmed);
    assert_eq!(b.unwrap().status, SaleStatus::Confirmed);

    assert_eq!(fx.balance(fx.apartment_id).await, Money::from_cents(4200));
    let credits = LedgerRepository::new(fx.pool.clone())
        .entries_for(fx.apartment_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == BalanceEntryKind::SaleConfirmed)
        .count();
    assert_eq!(credits, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn unpaid_gateway_sale_fails_and_releases_product(pool: PgPool) {
    let fx = common::setup(pool).await;
    let gateway = Arc::new(ScriptedGateway::default());
    let ledger = fx.gateway_ledger(gateway.clone());
    let product = fx.product(fx.apartment_id, "Vinho tinto", 9000).await;

    let detail = ledger.record_sale(product.id, "comprador-3").await.unwrap();
    assert!(!detail.sale.is_manual());
    assert!(!fx.is_available(product.id).await);

    // provedor fora do ar: venda continua pendente
    gateway.answer(&detail.sale.payment_id, Answer::Down);
    let down = ledger.confirm_sale(detail.sale.id, fx.finance_id).await;
    assert!(matches!(down, Err(AppError::ProviderError(_))));
    assert!(ledger.poll_sale(detail.sale.id).await.is_err());

    gateway.answer(&detail.sale.payment_id, Answer::Unpaid);
    assert_eq!(ledger.poll_sale(detail.sale.id).await.unwrap(), PollOutcome::StillPending);

    let failed = ledger.confirm_sale(detail.sale.id, fx.finance_id).await.unwrap();
    assert_eq!(failed.status, SaleStatus::Failed);
    assert!(fx.is_available(product.id).await);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::ZERO);
}

#[sqlx::test(migrations = "./migrations")]
async fn sync_confirms_paid_sales_and_skips_provider_failures(pool: PgPool) {
    let fx = common::setup(pool).await;
    let gateway = Arc::new(ScriptedGateway::default());
    let ledger = fx.gateway_ledger(gateway.clone());

    let mut sales = Vec::new();
    for (name, cents, answer) in [
        ("Pago", 1000, Answer::Paid),
        ("Fora do ar", 2000, Answer::Down),
        ("Aguardando", 3000, Answer::Unpaid),
    ] {
        let product = fx.product(fx.apartment_id, name, cents).await;
        let detail = ledger.record_sale(product.id, "comprador-4").await.unwrap();
        gateway.answer(&detail.sale.payment_id, answer);
        sales.push(detail.sale.id);
    }

    let forbidden = ledger.sync_pending_gateway_sales(fx.owner_id).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let report = ledger.sync_pending_gateway_sales(fx.finance_id).await.unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.confirmed, 1);
    assert_eq!(report.provider_failures, 1);
    assert_eq!(fx.balance(fx.apartment_id).await, Money::from_cents(1000));

    // a sincronização nunca marca falha
    let pending = ledger.poll_sale(sales[2]).await.unwrap();
    assert_eq!(pending, PollOutcome::StillPending);
}
