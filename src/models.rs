pub mod apartment;
pub mod audit;
pub mod auth;
pub mod ledger;
pub mod payment;
pub mod payout;
pub mod reconciliation;
pub mod reports;
pub mod sale;
pub mod storefront;
