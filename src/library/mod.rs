//! Library data model shared by sources, aggregation and persistence.

pub mod identity;
mod models;

pub use models::*;
