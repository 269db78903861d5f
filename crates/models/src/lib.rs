//! SeaORM entities backing the compose service layer.

pub mod errors;
pub mod db;
pub mod namespace;
pub mod chart;
pub mod label;
pub mod resource_translation;
pub mod actionlog;

#[cfg(test)]
mod tests;
