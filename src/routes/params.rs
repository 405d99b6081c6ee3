use serde::Deserialize;
use utoipa::ToSchema;

use crate::entity::orders::OrderStatus;

const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)` with page >= 1 and per_page in 1..=100.
    /// The offset is capped at `MAX_OFFSET` so it always binds as a SQL bigint.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page).min(MAX_OFFSET);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
