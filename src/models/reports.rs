// src/models/reports.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::money::Money;

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    #[schema(value_type = f64)]
    pub total_balance: Money,
    #[schema(value_type = f64)]
    pub retention_collected: Money,
    #[schema(value_type = f64)]
    pub pending_payouts: Money,
    pub pending_sales: i64,
    #[schema(value_type = f64, example = 0.05)]
    pub current_retention_rate: Decimal,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}
