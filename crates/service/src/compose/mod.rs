//! Compose charts: domain types, access control and the chart service.

pub mod access;
pub mod actions;
pub mod changes;
pub mod chart;
pub mod domain;
pub mod loader;

pub use access::{AllowAll, ChartAccessController};
pub use chart::ChartService;
pub use domain::{Chart, ChartConfig, ChartFilter, FilterState, Namespace};
