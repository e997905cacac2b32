use std::sync::Arc;

use chrono::Datelike;
use once_cell::sync::OnceCell;
use regatta_common::types::{DataType, Value};
use regatta_common::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::column::{Column, ColumnRef};
use crate::index::IndexColumn;

/// Immutable column of distinct values shared by dictionary-encoded columns.
///
/// Engine-built dictionaries reserve the type's default row at index 0
/// ([`Dictionary::from_values`] callers follow that convention); result
/// dictionaries built by [`DictionaryBuilder`] hold values in first-seen
/// order.
#[derive(Debug, Serialize, Deserialize)]
pub struct Dictionary {
    values: ColumnRef,
    value_type: DataType,
    #[serde(skip)]
    hash: OnceCell<u128>,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type && self.values == other.values
    }
}

impl Dictionary {
    pub fn from_values(values: &[Value], value_type: DataType) -> Result<Dictionary> {
        if values.is_empty() {
            return Err(Error::logic("a dictionary must hold at least one row"));
        }
        let column = Column::from_values(values, &value_type)?;
        Ok(Dictionary {
            values: Arc::new(column),
            value_type,
            hash: OnceCell::new(),
        })
    }

    fn from_column(values: ColumnRef, value_type: DataType) -> Dictionary {
        Dictionary {
            values,
            value_type,
            hash: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_type(&self) -> &DataType {
        &self.value_type
    }

    /// The full values column, including the reserved default row if the
    /// dictionary carries one.
    pub fn nested_column(&self) -> &ColumnRef {
        &self.values
    }

    pub fn value_at(&self, row: usize) -> Value {
        self.values.value_at(row)
    }

    /// Content hash, computed once per dictionary. Two dictionaries with
    /// the same hash and size are assumed equal.
    pub fn content_hash(&self) -> u128 {
        *self.hash.get_or_init(|| {
            let mut hasher = Xxh3::new();
            for row in 0..self.values.len() {
                write_value(&mut hasher, &self.values.value_at(row));
            }
            hasher.digest128()
        })
    }
}

fn write_value(hasher: &mut Xxh3, value: &Value) {
    match value {
        Value::Null => hasher.update(&[0]),
        Value::Bool(v) => hasher.update(&[1, *v as u8]),
        Value::Int64(v) => {
            hasher.update(&[2]);
            hasher.update(&v.to_le_bytes());
        }
        Value::UInt64(v) => {
            hasher.update(&[3]);
            hasher.update(&v.to_le_bytes());
        }
        Value::Float64(v) => {
            hasher.update(&[4]);
            hasher.update(&v.0.to_bits().to_le_bytes());
        }
        Value::String(s) => {
            hasher.update(&[5]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Value::Date(d) => {
            hasher.update(&[6]);
            hasher.update(&d.num_days_from_ce().to_le_bytes());
        }
        Value::Array(items) => {
            hasher.update(&[7]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_value(hasher, item);
            }
        }
        Value::Tuple(items) => {
            hasher.update(&[8]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_value(hasher, item);
            }
        }
    }
}

/// Interning builder for dictionaries. `insert` returns the position of the
/// value, deduplicating repeats.
pub struct DictionaryBuilder {
    value_type: DataType,
    values: Vec<Value>,
    positions: FxHashMap<Value, u64>,
}

impl DictionaryBuilder {
    pub fn new(value_type: DataType) -> Self {
        Self {
            value_type,
            values: Vec::new(),
            positions: FxHashMap::default(),
        }
    }

    /// Builder pre-seeded with the type's default row at index 0, the
    /// engine-side dictionary convention.
    pub fn with_default_row(value_type: DataType) -> Self {
        let mut builder = Self::new(value_type);
        let default = Value::default_for(&builder.value_type);
        builder.insert(default);
        builder
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn insert(&mut self, value: Value) -> u64 {
        if let Some(&pos) = self.positions.get(&value) {
            return pos;
        }
        let pos = self.values.len() as u64;
        self.positions.insert(value.clone(), pos);
        self.values.push(value);
        pos
    }

    /// Inserts every row of `column` and returns the deduplicating index
    /// mapping: `mapping[row] = position of column[row] in the dictionary`.
    pub fn insert_range(&mut self, column: &Column) -> IndexColumn {
        let mut positions = Vec::with_capacity(column.len());
        for row in 0..column.len() {
            positions.push(self.insert(column.value_at(row)));
        }
        IndexColumn::from_positions(positions)
    }

    pub fn finish(mut self) -> Result<Dictionary> {
        if self.values.is_empty() {
            // A dictionary holds at least one row even for empty batches.
            let default = Value::default_for(&self.value_type);
            self.insert(default);
        }
        let column = Column::from_values(&self.values, &self.value_type)?;
        Ok(Dictionary::from_column(Arc::new(column), self.value_type))
    }
}

impl Column {
    /// Restriction of a dictionary-encoded column to the dictionary rows it
    /// actually references, in first-seen order, plus the rewritten indices.
    pub fn minimal_dictionary_encoding(&self) -> Result<(ColumnRef, IndexColumn)> {
        match self {
            Column::LowCardinality {
                dictionary,
                indices,
                ..
            } => {
                let mut remap: FxHashMap<u64, u64> = FxHashMap::default();
                let mut referenced: Vec<usize> = Vec::new();
                let mut outer = Vec::with_capacity(indices.len());
                for pos in indices.iter() {
                    let new_pos = *remap.entry(pos).or_insert_with(|| {
                        referenced.push(pos as usize);
                        (referenced.len() - 1) as u64
                    });
                    outer.push(new_pos);
                }
                let minimal = dictionary.nested_column().gather(&referenced);
                Ok((Arc::new(minimal), IndexColumn::from_positions(outer)))
            }
            _ => Err(Error::illegal_column(format!(
                "minimal dictionary encoding expects a dictionary-encoded column, got {}",
                self.data_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_values(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::String(s.to_string())).collect()
    }

    #[test]
    fn test_from_values_rejects_empty() {
        let err = Dictionary::from_values(&[], DataType::String).unwrap_err();
        assert!(matches!(err, Error::LogicError(_)));
    }

    #[test]
    fn test_value_access() {
        let dict =
            Dictionary::from_values(&string_values(&["", "a", "b"]), DataType::String).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.value_type(), &DataType::String);
        assert_eq!(dict.value_at(1), Value::String("a".to_string()));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let dict =
            Dictionary::from_values(&string_values(&["", "a"]), DataType::String).unwrap();
        assert_eq!(dict.content_hash(), dict.content_hash());

        let same =
            Dictionary::from_values(&string_values(&["", "a"]), DataType::String).unwrap();
        assert_eq!(dict.content_hash(), same.content_hash());
    }

    #[test]
    fn test_content_hash_discriminates() {
        let a = Dictionary::from_values(&string_values(&["", "a"]), DataType::String).unwrap();
        let b = Dictionary::from_values(&string_values(&["", "b"]), DataType::String).unwrap();
        assert_ne!(a.content_hash(), b.content_hash());

        // Same bytes under different framing must not collide.
        let split =
            Dictionary::from_values(&string_values(&["ab", "c"]), DataType::String).unwrap();
        let joined =
            Dictionary::from_values(&string_values(&["a", "bc"]), DataType::String).unwrap();
        assert_ne!(split.content_hash(), joined.content_hash());
    }

    #[test]
    fn test_builder_first_seen_order() {
        let mut builder = DictionaryBuilder::new(DataType::Bool);
        assert_eq!(builder.insert(Value::Bool(true)), 0);
        assert_eq!(builder.insert(Value::Bool(false)), 1);
        assert_eq!(builder.insert(Value::Bool(false)), 1);
        let dict = builder.finish().unwrap();
        assert_eq!(dict.value_at(0), Value::Bool(true));
        assert_eq!(dict.value_at(1), Value::Bool(false));
    }

    #[test]
    fn test_builder_with_default_row() {
        let mut builder = DictionaryBuilder::with_default_row(DataType::String);
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.insert(Value::String(String::new())), 0);
        assert_eq!(builder.insert(Value::String("x".to_string())), 1);
        let dict = builder.finish().unwrap();
        assert_eq!(dict.value_at(0), Value::String(String::new()));
    }

    #[test]
    fn test_builder_insert_range() {
        let column = Column::from_values(
            &[
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(false),
            ],
            &DataType::Bool,
        )
        .unwrap();
        let mut builder = DictionaryBuilder::new(DataType::Bool);
        let mapping = builder.insert_range(&column);
        assert_eq!(mapping.to_vec(), vec![0, 1, 1]);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_builder_finish_empty_seeds_default() {
        let dict = DictionaryBuilder::new(DataType::UInt64).finish().unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.value_at(0), Value::UInt64(0));
    }

    #[test]
    fn test_minimal_dictionary_encoding() {
        let dict = Arc::new(
            Dictionary::from_values(&string_values(&["x", "y", "z"]), DataType::String).unwrap(),
        );
        let indices = IndexColumn::from_positions(vec![1, 2, 2]);
        let column = Column::low_cardinality(dict, indices, false).unwrap();
        let (minimal, outer) = column.minimal_dictionary_encoding().unwrap();
        assert_eq!(minimal.len(), 2);
        assert_eq!(minimal.value_at(0), Value::String("y".to_string()));
        assert_eq!(minimal.value_at(1), Value::String("z".to_string()));
        assert_eq!(outer.to_vec(), vec![0, 1, 1]);
    }

    #[test]
    fn test_minimal_dictionary_encoding_rejects_plain() {
        let column = Column::from_values(&[Value::Int64(1)], &DataType::Int64).unwrap();
        assert!(matches!(
            column.minimal_dictionary_encoding(),
            Err(Error::IllegalColumn(_))
        ));
    }
}
