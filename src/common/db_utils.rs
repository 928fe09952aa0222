// src/common/db_utils.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Tamanho de página usado nas listagens do back office.
pub const PAGE_SIZE: i64 = 20;

// ---
// Paginação: `?page=N` (1-based)
// ---
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
    #[param(example = 1)]
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(PAGE_SIZE)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: i64, total_items: i64) -> Self {
        Self {
            items,
            page,
            total_pages: total_pages(total_items),
            total_items,
        }
    }
}

pub fn total_pages(total_items: i64) -> i64 {
    (total_items + PAGE_SIZE - 1) / PAGE_SIZE
}
