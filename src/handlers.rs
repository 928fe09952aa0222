pub mod audit;
pub mod auth;
pub mod notifications;
pub mod payouts;
pub mod protocols;
pub mod reports;
pub mod retention;
pub mod sales;
pub mod storefront;
pub mod uploads;
