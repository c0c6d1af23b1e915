pub mod analytics;
pub mod appointments;
pub mod campaigns;
pub mod contacts;
pub mod courses;
pub mod deals;
pub mod forms;
pub mod health;
pub mod organization;
pub mod pipelines;
pub mod workflows;

use serde::Deserialize;

use leadkit_duckdb::{PageRequest, SortOrder};

use crate::error::AppError;

/// Common pagination query parameters shared by every list endpoint.
///
/// Kept as strings because the struct is `#[serde(flatten)]`ed into the
/// per-endpoint query structs, and urlencoded flattening only round-trips
/// string values.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

fn parse_int(raw: Option<&str>, field: &str) -> Result<Option<i64>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{field} must be an integer"))),
    }
}

impl PageQuery {
    pub fn to_request(&self) -> Result<PageRequest, AppError> {
        let order = SortOrder::parse(self.order.as_deref())?;
        Ok(PageRequest {
            page: parse_int(self.page.as_deref(), "page")?.unwrap_or(1),
            limit: parse_int(self.limit.as_deref(), "limit")?.unwrap_or(20),
            order_by: self.order_by.clone(),
            order,
        })
    }
}
