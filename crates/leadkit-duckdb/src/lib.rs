pub mod appointment;
pub mod backend;
pub mod campaign;
pub mod contact;
pub mod course;
pub mod deal;
pub mod event;
pub mod form;
pub mod organization;
pub mod pipeline;
pub mod queries;
pub mod schema;
pub mod store;
pub mod user;
pub mod workflow;

pub use backend::LeadStore;
pub use campaign::EngagementKind;
pub use contact::ContactFilter;
pub use deal::DealFilter;
pub use store::{Page, PageRequest, Pagination, SortOrder};

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `leadkit_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
