//! Regatta - the scalar function execution layer of a columnar analytic
//! query engine.
//!
//! The wrapper sits between the query executor and individual scalar
//! function implementations. It transparently handles three orthogonal
//! input encodings - constant columns, nullable columns, and
//! dictionary-encoded (low-cardinality) columns - so functions only ever
//! implement the plain case:
//!
//! ```text
//! execute -> dictionary peel -> constant peel -> null peel -> execute_impl
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use regatta::scalar_functions::math::Plus;
//! use regatta::{Block, BlockSlot, Column, DataType, PreparedFunction, Value};
//!
//! let prepared = PreparedFunction::new(Arc::new(Plus));
//!
//! let mut block = Block::new();
//! let lhs = Column::constant(Value::Int64(2), &DataType::Int64, 100).unwrap();
//! let rhs = Column::constant(Value::Int64(3), &DataType::Int64, 100).unwrap();
//! block.insert(BlockSlot::new(Some(Arc::new(lhs)), DataType::Int64, "lhs"));
//! block.insert(BlockSlot::new(Some(Arc::new(rhs)), DataType::Int64, "rhs"));
//! block.insert(BlockSlot::new(None, DataType::Int64, "sum"));
//!
//! prepared.execute(&mut block, &[0, 1], 2, 100).unwrap();
//! let result = block.slot(2).column.clone().unwrap();
//! assert!(result.is_const());
//! assert_eq!(result.value_at(99), Value::Int64(5));
//! ```

pub use regatta_columnar::{
    convert_to_full_column_if_const, remove_low_cardinality, remove_nullable, Block, BlockSlot,
    Column, ColumnRef, Dictionary, DictionaryBuilder, IndexColumn, NullBitmap,
};
pub use regatta_common::types::{DataType, Value};
pub use regatta_common::{Error, Result};
pub use regatta_executor::scalar_functions;
pub use regatta_executor::{
    jit, CachedValues, ColumnWithType, DictionaryKey, LowCardinalityResultCache,
    PreparedFunction, ScalarFunction,
};
