/// Common types shared across entities, services and handlers
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::ledger_entry::OriginKind;

/// Unit of stock tracking: one product in one size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub struct Variant {
    pub product_id: Uuid,
    pub size_id: Uuid,
}

impl Variant {
    pub fn new(product_id: Uuid, size_id: Uuid) -> Self {
        Self {
            product_id,
            size_id,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product_id, self.size_id)
    }
}

/// Aggregate that caused a ledger entry, e.g. `receipt:<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct OriginReference {
    pub kind: OriginKind,
    pub id: Uuid,
}

impl OriginReference {
    pub fn receipt(id: Uuid) -> Self {
        Self {
            kind: OriginKind::Receipt,
            id,
        }
    }

    pub fn purchase_order(id: Uuid) -> Self {
        Self {
            kind: OriginKind::PurchaseOrder,
            id,
        }
    }

    pub fn adjustment(id: Uuid) -> Self {
        Self {
            kind: OriginKind::Adjustment,
            id,
        }
    }
}

impl fmt::Display for OriginReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

pub const MAX_PER_PAGE: u64 = 100;

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps page to at least 1 and page size to 1..=MAX_PER_PAGE.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Zero-based page index as expected by sea-orm paginators
    pub fn page_index(&self) -> u64 {
        self.page.saturating_sub(1)
    }
}

/// Page of results plus totals
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: PaginationParams, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + params.per_page - 1) / params.per_page
        };
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let params = PaginationParams {
            page: 0,
            per_page: 500,
        }
        .normalized();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PER_PAGE);
        assert_eq!(params.page_index(), 0);
    }

    #[test]
    fn page_counts_partial_pages() {
        let params = PaginationParams {
            page: 2,
            per_page: 20,
        };
        let page = Page::new(vec![1, 2, 3], params, 43);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn origin_reference_renders_kind_and_id() {
        let id = Uuid::nil();
        assert_eq!(
            OriginReference::receipt(id).to_string(),
            format!("receipt:{}", id)
        );
    }
}
