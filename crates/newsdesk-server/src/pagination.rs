use newsdesk_shared::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use newsdesk_store::Query;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// `?page=&limit=` as sent by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn validate(self) -> ApiResult<Page> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        if page < 1 {
            return Err(ApiError::validation("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ApiError::validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(Page { page, limit })
    }
}

impl Page {
    /// Restrict `query` to this window, offset = (page - 1) * limit.
    pub fn apply(&self, query: Query) -> Query {
        query.page(self.page, self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}
