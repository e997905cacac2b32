//! Scalar function execution wrapper for the Regatta columnar engine.
//!
//! [`PreparedFunction`] sits between the query executor and individual
//! scalar functions. It peels the three column encodings off the input
//! batch (constants, null maps, dictionaries), invokes the function's
//! `execute_impl` on the remaining plain columns, and rewraps the result.
//! Dictionary invocations over shared dictionaries are cached so repeated
//! batches over the same dictionary are evaluated once.

pub mod function;
pub mod jit;
pub mod result_cache;
pub mod scalar_functions;
mod wrapper;

pub use function::{ColumnWithType, ScalarFunction};
pub use result_cache::{CachedValues, DictionaryKey, LowCardinalityResultCache};
pub use wrapper::nullable::wrap_in_nullable;
pub use wrapper::PreparedFunction;
