//! Analytics aggregation queries.
//!
//! Each report is a handful of single SQL statements run under one lock
//! acquisition. All numeric work (rates, averages, window functions) stays in
//! the engine: `ROUND` for decimal places, `NULLIF(denom, 0)` to turn
//! division-by-zero into NULL, `COALESCE` to map that NULL to 0 before the
//! row mapper sees it. Time bucketing interpolates only the enum-constrained
//! `Period::trunc_unit` keyword into SQL text; everything user-supplied is
//! bound as a parameter.

pub mod campaigns;
pub mod contacts;
pub mod deals;
pub mod funnel;
pub mod organization;
pub mod roi;
pub mod user_activity;
