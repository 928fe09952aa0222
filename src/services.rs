pub mod auth;
pub mod blob_store;
pub mod ledger_service;
pub use ledger_service::LedgerService;
pub mod notifier;
pub mod payment;
pub mod payout_service;
pub use payout_service::PayoutService;
pub mod reconciliation_service;
pub use reconciliation_service::ReconciliationService;
pub mod report_service;
pub use report_service::ReportService;
pub mod session_store;
pub mod storefront;
pub use storefront::StorefrontService;
