mod access;
pub mod decode;
mod serde;

use std::sync::Arc;

use ::serde::{Deserialize, Serialize};
use aligned_vec::AVec;
use chrono::NaiveDate;
use regatta_common::types::DataType;
use regatta_common::{Error, Result};

pub use self::serde::A64;
use crate::bitmap::NullBitmap;
use crate::dictionary::Dictionary;
use crate::index::IndexColumn;

pub type ColumnRef = Arc<Column>;

/// Immutable column. Plain payload variants hold the data directly; the
/// `Const`, `Nullable`, and `LowCardinality` variants wrap another column
/// with one encoding layer each.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Column {
    Nothing {
        len: usize,
    },
    Bool {
        data: Vec<bool>,
    },
    Int64 {
        #[serde(
            serialize_with = "serde::serialize_avec_i64",
            deserialize_with = "serde::deserialize_avec_i64"
        )]
        data: AVec<i64, A64>,
    },
    UInt64 {
        #[serde(
            serialize_with = "serde::serialize_avec_u64",
            deserialize_with = "serde::deserialize_avec_u64"
        )]
        data: AVec<u64, A64>,
    },
    Float64 {
        #[serde(
            serialize_with = "serde::serialize_avec_f64",
            deserialize_with = "serde::deserialize_avec_f64"
        )]
        data: AVec<f64, A64>,
    },
    String {
        data: Vec<String>,
    },
    Date {
        data: Vec<NaiveDate>,
    },
    /// A single-row `values` column logically repeated `len` times.
    Const {
        values: ColumnRef,
        len: usize,
    },
    /// A plain `values` column paired with its null map.
    Nullable {
        values: ColumnRef,
        nulls: NullBitmap,
    },
    /// `offsets[i]` is the end offset of row `i` within `values`.
    Array {
        offsets: Vec<usize>,
        values: ColumnRef,
    },
    Tuple {
        columns: Vec<ColumnRef>,
    },
    /// Dictionary-encoded column: positions into a shared dictionary of
    /// distinct values.
    LowCardinality {
        dictionary: Arc<Dictionary>,
        indices: IndexColumn,
        shared_dictionary: bool,
    },
}

impl Column {
    pub fn low_cardinality(
        dictionary: Arc<Dictionary>,
        indices: IndexColumn,
        shared_dictionary: bool,
    ) -> Result<Column> {
        if !indices.is_empty() && indices.max_position() >= dictionary.len() as u64 {
            return Err(Error::logic(format!(
                "dictionary index {} out of bounds (dictionary size: {})",
                indices.max_position(),
                dictionary.len()
            )));
        }
        Ok(Column::LowCardinality {
            dictionary,
            indices,
            shared_dictionary,
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Nothing { len } => *len,
            Column::Bool { data } => data.len(),
            Column::Int64 { data } => data.len(),
            Column::UInt64 { data } => data.len(),
            Column::Float64 { data } => data.len(),
            Column::String { data } => data.len(),
            Column::Date { data } => data.len(),
            Column::Const { len, .. } => *len,
            Column::Nullable { values, .. } => values.len(),
            Column::Array { offsets, .. } => offsets.len(),
            Column::Tuple { columns } => columns.first().map_or(0, |c| c.len()),
            Column::LowCardinality { indices, .. } => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Nothing { .. } => DataType::Nothing,
            Column::Bool { .. } => DataType::Bool,
            Column::Int64 { .. } => DataType::Int64,
            Column::UInt64 { .. } => DataType::UInt64,
            Column::Float64 { .. } => DataType::Float64,
            Column::String { .. } => DataType::String,
            Column::Date { .. } => DataType::Date,
            Column::Const { values, .. } => values.data_type(),
            Column::Nullable { values, .. } => DataType::Nullable(Box::new(values.data_type())),
            Column::Array { values, .. } => DataType::Array(Box::new(values.data_type())),
            Column::Tuple { columns } => DataType::Tuple {
                elements: columns.iter().map(|c| c.data_type()).collect(),
                names: None,
            },
            Column::LowCardinality { dictionary, .. } => {
                DataType::LowCardinality(Box::new(dictionary.value_type().clone()))
            }
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Column::Const { .. })
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Column::Nullable { .. })
    }

    pub fn is_low_cardinality(&self) -> bool {
        matches!(self, Column::LowCardinality { .. })
    }

    /// A column that holds nothing but NULL: a constant whose single row is
    /// NULL, or a `Nothing`-typed nullable column.
    pub fn is_only_null(&self) -> bool {
        match self {
            Column::Const { values, .. } => values.value_at(0).is_null(),
            Column::Nullable { values, .. } => matches!(**values, Column::Nothing { .. }),
            _ => false,
        }
    }
}
