use serde::{Deserialize, Serialize};

/// Stories per page for both listing endpoints
pub const PER_PAGE: i64 = 10;

/// `?page=N`; anything missing, non-numeric or below 1 means page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self, per_page: i64) -> PageRequest {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        PageRequest { page, per_page }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// A page of results in the length-aware paginator layout
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub first_page_url: String,
    pub from: Option<i64>,
    pub last_page: i64,
    pub last_page_url: String,
    pub next_page_url: Option<String>,
    pub path: String,
    pub per_page: i64,
    pub prev_page_url: Option<String>,
    pub to: Option<i64>,
    pub total: i64,
}

impl<T> Page<T> {
    /// `path` is the absolute URL of the listing without a query string
    pub fn new(data: Vec<T>, total: i64, request: PageRequest, path: impl Into<String>) -> Self {
        let path = path.into();
        let page_url = |page: i64| format!("{}?page={}", path, page);

        let last_page = ((total + request.per_page - 1) / request.per_page).max(1);
        let count = data.len() as i64;
        let (from, to) = if count > 0 {
            let first = request.offset() + 1;
            (Some(first), Some(first + count - 1))
        } else {
            (None, None)
        };

        Self {
            current_page: request.page,
            first_page_url: page_url(1),
            from,
            last_page,
            last_page_url: page_url(last_page),
            next_page_url: (request.page < last_page).then(|| page_url(request.page + 1)),
            prev_page_url: (request.page > 1).then(|| page_url(request.page - 1)),
            per_page: request.per_page,
            to,
            total,
            data,
            path,
        }
    }
}
