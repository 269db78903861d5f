//! Service layer for compose charts on top of the `models` entities.
//! - Orchestrates access control, validation, persistence, translations,
//!   labels and audit records per chart verb.
//! - Talks to storage only through the repository traits in [`store`].
//! - Provides clear error types and documented interfaces.

pub mod actionlog;
pub mod compose;
pub mod context;
pub mod errors;
pub mod handle;
pub mod ids;
pub mod label;
pub mod locale;
pub mod runtime;
pub mod stale;
pub mod store;
#[cfg(test)]
pub mod test_support;

pub use compose::{ChartAccessController, ChartService};
pub use context::Context;
pub use errors::{ErrorKind, ServiceError};
