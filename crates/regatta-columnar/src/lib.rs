//! Column model for the Regatta scalar function executor.
//!
//! Columns are immutable once built and shared by reference count
//! ([`ColumnRef`]). Three encodings wrap the plain payload variants:
//! constants, nullable columns, and dictionary-encoded (low-cardinality)
//! columns.

mod bitmap;
mod block;
mod column;
mod dictionary;
mod index;

pub use bitmap::NullBitmap;
pub use block::{Block, BlockSlot};
pub use column::decode::{convert_to_full_column_if_const, remove_low_cardinality, remove_nullable};
pub use column::{A64, Column, ColumnRef};
pub use dictionary::{Dictionary, DictionaryBuilder};
pub use index::IndexColumn;
