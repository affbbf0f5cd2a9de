use crate::error::ApiError;
use serde::Deserialize;

pub mod beneficiaries;
pub mod benefits;
pub mod health;
pub mod processing;
pub mod scheme;

/// `?q=` on the search endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn term(self) -> Result<String, ApiError> {
        self.q.ok_or_else(|| ApiError::bad_request("Query parameter 'q' is required"))
    }
}
