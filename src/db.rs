pub mod access_repo;
pub use access_repo::AccessRepository;
pub mod apartment_repo;
pub use apartment_repo::ApartmentRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod ledger_repo;
pub use ledger_repo::LedgerRepository;
pub mod payout_repo;
pub use payout_repo::PayoutRepository;
pub mod reconciliation_repo;
pub use reconciliation_repo::ReconciliationRepository;
pub mod retention_repo;
pub use retention_repo::RetentionRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
