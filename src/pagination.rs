use serde::Serialize;

use crate::error::{AppError, Result};
use crate::routes::validation::QueryParams;

/// Page-number pagination parsed from `page` and `limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page` is 1-based; `limit` overrides the listing's default size up to `max_size`
    ///
    /// A `page` that is not a positive integer is reported as an invalid page.
    pub fn from_query(params: &QueryParams, default_size: u32, max_size: u32) -> Result<Self> {
        let page = match params.get("page").filter(|v| !v.is_empty()) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(AppError::InvalidPage),
            },
            None => 1,
        };

        let page_size = match params.get("limit").filter(|v| !v.is_empty()) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(limit) if limit >= 1 => limit.min(max_size),
                _ => default_size,
            },
            None => default_size,
        };

        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// Fails when the page lies past the last one; page 1 of nothing is allowed
    pub fn ensure_in_range(&self, count: i64) -> Result<()> {
        if self.page > 1 && self.offset() >= count {
            return Err(AppError::InvalidPage);
        }
        Ok(())
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build the envelope; `next`/`previous` keep every other query parameter
    pub fn new(request: PageRequest, count: i64, results: Vec<T>, params: &QueryParams) -> Self {
        let has_next = request.offset() + request.limit() < count;
        let next = has_next.then(|| page_link(params, Some(request.page + 1)));

        let previous = match request.page {
            1 => None,
            // Like the first page link, page 2's previous omits `page`
            2 => Some(page_link(params, None)),
            page => Some(page_link(params, Some(page - 1))),
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(params: &QueryParams, page: Option<u32>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.pairs().iter().filter(|(k, _)| k != "page") {
        query.append_pair(key, value);
    }
    if let Some(page) = page {
        query.append_pair("page", &page.to_string());
    }

    let query = query.finish();
    if query.is_empty() {
        params.path().to_string()
    } else {
        format!("{}?{}", params.path(), query)
    }
}
