//! Core types shared across the transfer engine.

pub mod identifier;
mod schema;
mod value;

pub use schema::{ColumnDef, Schema};
pub use value::{CellValue, RowBatch};
