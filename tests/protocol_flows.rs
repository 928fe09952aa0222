// tests/protocol_flows.rs
// Requerem Postgres: DATABASE_URL=postgres://... cargo test

mod common;

use backoffice::{
    common::error::AppError,
    db::ApartmentRepository,
    models::reconciliation::{DisputeType, ProtocolStatus, ProtocolTarget},
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn protocol_lifecycle(pool: PgPool) {
    let fx = common::setup(pool).await;
    let sale_id = fx.credit(3000).await;
    let service = &fx.state.reconciliation_service;

    let protocol = service
        .open(ProtocolTarget::Sale, sale_id, DisputeType::Products, fx.finance_id, Some("Produto veio errado"))
        .await
        .unwrap();
    assert_eq!(protocol.status, ProtocolStatus::Open);
    assert_eq!(protocol.owner_id, fx.owner_id);

    service.add_comment(protocol.id, fx.owner_id, "Vou verificar").await.unwrap();
    let view = service.view(protocol.id, fx.owner_id).await.unwrap();
    assert_eq!(view.protocol.status, ProtocolStatus::InProgress);
    assert_eq!(view.comments.len(), 2);

    let closed = service.close(protocol.id, fx.finance_id).await.unwrap();
    assert_eq!(closed.status, ProtocolStatus::Closed);

    let late = service.add_comment(protocol.id, fx.owner_id, "Mais uma coisa").await;
    assert!(matches!(late, Err(AppError::ProtocolClosed)));

    let view = service.view(protocol.id, fx.finance_id).await.unwrap();
    assert_eq!(view.protocol.status, ProtocolStatus::Closed);
    assert_eq!(view.comments.len(), 2);

    let reclose = service.close(protocol.id, fx.finance_id).await;
    assert!(matches!(reclose, Err(AppError::AlreadyTerminal(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn apartment_without_owner_cannot_be_disputed(pool: PgPool) {
    let fx = common::setup(pool).await;
    let orphan = ApartmentRepository::new(fx.pool.clone())
        .create_apartment(&fx.pool, "Apartamento 202", "apt202", "sem-dono@pix.com.br")
        .await
        .unwrap();
    let product = fx.product(orphan.id, "Toalha", 1500).await;
    let detail = fx.state.ledger_service.record_sale(product.id, "b").await.unwrap();

    let result = fx
        .state
        .reconciliation_service
        .open(ProtocolTarget::Sale, detail.sale.id, DisputeType::Other, fx.finance_id, None)
        .await;
    assert!(matches!(result, Err(AppError::NoOwnerAssociated)));
}

#[sqlx::test(migrations = "./migrations")]
async fn outsiders_cannot_read_or_open(pool: PgPool) {
    let fx = common::setup(pool).await;
    let sale_id = fx.credit(1000).await;
    let service = &fx.state.reconciliation_service;

    let by_owner = service
        .open(ProtocolTarget::Sale, sale_id, DisputeType::Questions, fx.owner_id, None)
        .await;
    assert!(matches!(by_owner, Err(AppError::Forbidden(_))));

    let missing = service
        .open(ProtocolTarget::Payout, uuid::Uuid::new_v4(), DisputeType::Payout, fx.finance_id, None)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
