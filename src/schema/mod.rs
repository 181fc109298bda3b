//! Schema model: tables, columns and foreign-key relationships.

mod types;

pub use types::*;
