//! Loading and aggregation of patient counts per pathology, age bracket, sex,
//! region and year.
//!
//! The library has no UI dependency: the dashboard binary only consumes the
//! values produced by [`data::aggregate`] and [`report`].

pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use config::DashboardConfig;
pub use error::{DataSourceError, EmptySeriesError};
