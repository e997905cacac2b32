use std::sync::Arc;

use aligned_vec::AVec;
use regatta_common::types::{DataType, Value};
use regatta_common::{Error, Result};

use super::{Column, ColumnRef};
use crate::bitmap::NullBitmap;
use crate::dictionary::DictionaryBuilder;
use crate::index::IndexColumn;

impl Column {
    /// Row value as an owned [`Value`]. Rows past the end read as NULL.
    pub fn value_at(&self, row: usize) -> Value {
        if row >= self.len() {
            return Value::Null;
        }
        match self {
            Column::Nothing { .. } => Value::Null,
            Column::Bool { data } => Value::Bool(data[row]),
            Column::Int64 { data } => Value::Int64(data[row]),
            Column::UInt64 { data } => Value::UInt64(data[row]),
            Column::Float64 { data } => Value::float64(data[row]),
            Column::String { data } => Value::String(data[row].clone()),
            Column::Date { data } => Value::Date(data[row]),
            Column::Const { values, .. } => values.value_at(0),
            Column::Nullable { values, nulls } => {
                if nulls.is_null(row) {
                    Value::Null
                } else {
                    values.value_at(row)
                }
            }
            Column::Array { offsets, values } => {
                let start = if row == 0 { 0 } else { offsets[row - 1] };
                let end = offsets[row];
                Value::Array((start..end).map(|i| values.value_at(i)).collect())
            }
            Column::Tuple { columns } => {
                Value::Tuple(columns.iter().map(|c| c.value_at(row)).collect())
            }
            Column::LowCardinality {
                dictionary,
                indices,
                ..
            } => dictionary.value_at(indices.get(row) as usize),
        }
    }

    /// Builds a column of the given type from row values. NULL rows are only
    /// accepted under a `Nullable` (or `Nothing`) type.
    pub fn from_values(values: &[Value], data_type: &DataType) -> Result<Column> {
        fn expect<T>(got: Option<T>, data_type: &DataType, value: &Value) -> Result<T> {
            got.ok_or_else(|| Error::type_mismatch(data_type.to_string(), value.type_name()))
        }

        match data_type {
            DataType::Nothing => {
                for v in values {
                    if !v.is_null() {
                        return Err(Error::type_mismatch(data_type.to_string(), v.type_name()));
                    }
                }
                Ok(Column::Nothing { len: values.len() })
            }
            DataType::Bool => {
                let mut data = Vec::with_capacity(values.len());
                for v in values {
                    data.push(expect(v.as_bool(), data_type, v)?);
                }
                Ok(Column::Bool { data })
            }
            DataType::Int64 => {
                let mut data = AVec::with_capacity(64, values.len());
                for v in values {
                    data.push(expect(v.as_i64(), data_type, v)?);
                }
                Ok(Column::Int64 { data })
            }
            DataType::UInt64 => {
                let mut data = AVec::with_capacity(64, values.len());
                for v in values {
                    data.push(expect(v.as_u64(), data_type, v)?);
                }
                Ok(Column::UInt64 { data })
            }
            DataType::Float64 => {
                let mut data = AVec::with_capacity(64, values.len());
                for v in values {
                    data.push(expect(v.as_f64(), data_type, v)?);
                }
                Ok(Column::Float64 { data })
            }
            DataType::String => {
                let mut data = Vec::with_capacity(values.len());
                for v in values {
                    data.push(expect(v.as_str(), data_type, v)?.to_string());
                }
                Ok(Column::String { data })
            }
            DataType::Date => {
                let mut data = Vec::with_capacity(values.len());
                for v in values {
                    match v {
                        Value::Date(d) => data.push(*d),
                        _ => {
                            return Err(Error::type_mismatch(
                                data_type.to_string(),
                                v.type_name(),
                            ));
                        }
                    }
                }
                Ok(Column::Date { data })
            }
            DataType::Nullable(inner) => {
                let mut nulls = NullBitmap::new();
                let mut payload = Vec::with_capacity(values.len());
                for v in values {
                    if v.is_null() {
                        nulls.push(true);
                        payload.push(Value::default_for(inner));
                    } else {
                        nulls.push(false);
                        payload.push(v.clone());
                    }
                }
                let values = Column::from_values(&payload, inner)?;
                Ok(Column::Nullable {
                    values: Arc::new(values),
                    nulls,
                })
            }
            DataType::Array(inner) => {
                let mut offsets = Vec::with_capacity(values.len());
                let mut flat = Vec::new();
                for v in values {
                    match v {
                        Value::Array(items) => {
                            flat.extend(items.iter().cloned());
                            offsets.push(flat.len());
                        }
                        _ => {
                            return Err(Error::type_mismatch(
                                data_type.to_string(),
                                v.type_name(),
                            ));
                        }
                    }
                }
                let values = Column::from_values(&flat, inner)?;
                Ok(Column::Array {
                    offsets,
                    values: Arc::new(values),
                })
            }
            DataType::Tuple { elements, .. } => {
                let mut per_element: Vec<Vec<Value>> =
                    elements.iter().map(|_| Vec::with_capacity(values.len())).collect();
                for v in values {
                    match v {
                        Value::Tuple(items) if items.len() == elements.len() => {
                            for (slot, item) in per_element.iter_mut().zip(items) {
                                slot.push(item.clone());
                            }
                        }
                        _ => {
                            return Err(Error::type_mismatch(
                                data_type.to_string(),
                                v.type_name(),
                            ));
                        }
                    }
                }
                let mut columns = Vec::with_capacity(elements.len());
                for (element_type, element_values) in elements.iter().zip(&per_element) {
                    columns.push(Arc::new(Column::from_values(element_values, element_type)?));
                }
                Ok(Column::Tuple { columns })
            }
            DataType::LowCardinality(inner) => {
                let mut builder = DictionaryBuilder::with_default_row((**inner).clone());
                let mut positions = Vec::with_capacity(values.len());
                for v in values {
                    positions.push(builder.insert(v.clone()));
                }
                let dictionary = builder.finish()?;
                Column::low_cardinality(
                    Arc::new(dictionary),
                    IndexColumn::from_positions(positions),
                    false,
                )
            }
        }
    }

    pub fn constant(value: Value, data_type: &DataType, len: usize) -> Result<Column> {
        let values = Column::from_values(std::slice::from_ref(&value), data_type)?;
        Ok(Column::Const {
            values: Arc::new(values),
            len,
        })
    }

    /// Constant NULL of a declared (nullable) result type.
    pub fn constant_null(data_type: &DataType, len: usize) -> Result<Column> {
        if !data_type.is_nullable() {
            return Err(Error::logic(format!(
                "cannot build a constant NULL of non-nullable type {}",
                data_type
            )));
        }
        Column::constant(Value::Null, data_type, len)
    }

    /// Resizes a constant column; the replicated value is unchanged.
    pub fn clone_resized(&self, len: usize) -> Result<Column> {
        match self {
            Column::Const { values, .. } => Ok(Column::Const {
                values: Arc::clone(values),
                len,
            }),
            _ => Err(Error::illegal_column(format!(
                "expected a constant column to resize, got {}",
                self.data_type()
            ))),
        }
    }

    /// Row selection. Constants are materialized; dictionary encoding is
    /// preserved (the dictionary is shared, only indices are gathered).
    pub fn gather(&self, rows: &[usize]) -> Column {
        match self {
            Column::Nothing { .. } => Column::Nothing { len: rows.len() },
            Column::Bool { data } => Column::Bool {
                data: rows.iter().map(|&r| data[r]).collect(),
            },
            Column::Int64 { data } => {
                let mut out = AVec::with_capacity(64, rows.len());
                for &r in rows {
                    out.push(data[r]);
                }
                Column::Int64 { data: out }
            }
            Column::UInt64 { data } => {
                let mut out = AVec::with_capacity(64, rows.len());
                for &r in rows {
                    out.push(data[r]);
                }
                Column::UInt64 { data: out }
            }
            Column::Float64 { data } => {
                let mut out = AVec::with_capacity(64, rows.len());
                for &r in rows {
                    out.push(data[r]);
                }
                Column::Float64 { data: out }
            }
            Column::String { data } => Column::String {
                data: rows.iter().map(|&r| data[r].clone()).collect(),
            },
            Column::Date { data } => Column::Date {
                data: rows.iter().map(|&r| data[r]).collect(),
            },
            Column::Const { values, .. } => values.gather(&vec![0; rows.len()]),
            Column::Nullable { values, nulls } => Column::Nullable {
                values: Arc::new(values.gather(rows)),
                nulls: nulls.gather(rows),
            },
            Column::Array { offsets, values } => {
                let mut new_offsets = Vec::with_capacity(rows.len());
                let mut flat = Vec::new();
                for &r in rows {
                    let start = if r == 0 { 0 } else { offsets[r - 1] };
                    flat.extend(start..offsets[r]);
                    new_offsets.push(flat.len());
                }
                Column::Array {
                    offsets: new_offsets,
                    values: Arc::new(values.gather(&flat)),
                }
            }
            Column::Tuple { columns } => Column::Tuple {
                columns: columns.iter().map(|c| Arc::new(c.gather(rows))).collect(),
            },
            Column::LowCardinality {
                dictionary,
                indices,
                shared_dictionary,
            } => Column::LowCardinality {
                dictionary: Arc::clone(dictionary),
                indices: IndexColumn::from_positions(
                    rows.iter().map(|&r| indices.get(r)).collect(),
                ),
                shared_dictionary: *shared_dictionary,
            },
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_at_plain() {
        let col = Column::from_values(
            &[Value::Int64(10), Value::Int64(20)],
            &DataType::Int64,
        )
        .unwrap();
        assert_eq!(col.value_at(0), Value::Int64(10));
        assert_eq!(col.value_at(1), Value::Int64(20));
        assert_eq!(col.value_at(2), Value::Null);
    }

    #[test]
    fn test_value_at_nullable() {
        let ty = DataType::Nullable(Box::new(DataType::String));
        let col = Column::from_values(
            &[Value::String("a".to_string()), Value::Null],
            &ty,
        )
        .unwrap();
        assert_eq!(col.value_at(0), Value::String("a".to_string()));
        assert_eq!(col.value_at(1), Value::Null);
    }

    #[test]
    fn test_value_at_const() {
        let col = Column::constant(Value::Bool(true), &DataType::Bool, 5).unwrap();
        for row in 0..5 {
            assert_eq!(col.value_at(row), Value::Bool(true));
        }
    }

    #[test]
    fn test_value_at_array() {
        let ty = DataType::Array(Box::new(DataType::Int64));
        let col = Column::from_values(
            &[
                Value::Array(vec![Value::Int64(1), Value::Int64(2)]),
                Value::Array(vec![Value::Int64(3)]),
            ],
            &ty,
        )
        .unwrap();
        assert_eq!(
            col.value_at(0),
            Value::Array(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(col.value_at(1), Value::Array(vec![Value::Int64(3)]));
    }

    #[test]
    fn test_value_at_low_cardinality() {
        let ty = DataType::LowCardinality(Box::new(DataType::String));
        let col = Column::from_values(
            &[
                Value::String("x".to_string()),
                Value::String("y".to_string()),
                Value::String("x".to_string()),
            ],
            &ty,
        )
        .unwrap();
        assert_eq!(col.value_at(0), Value::String("x".to_string()));
        assert_eq!(col.value_at(1), Value::String("y".to_string()));
        assert_eq!(col.value_at(2), Value::String("x".to_string()));
    }

    #[test]
    fn test_from_values_rejects_null_in_plain_type() {
        let err = Column::from_values(&[Value::Null], &DataType::Int64).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_from_values_rejects_wrong_payload() {
        let err =
            Column::from_values(&[Value::String("x".to_string())], &DataType::Bool).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_from_values_low_cardinality_interns() {
        let ty = DataType::LowCardinality(Box::new(DataType::String));
        let col = Column::from_values(
            &[
                Value::String("a".to_string()),
                Value::String("b".to_string()),
                Value::String("a".to_string()),
            ],
            &ty,
        )
        .unwrap();
        match &col {
            Column::LowCardinality {
                dictionary,
                indices,
                shared_dictionary,
            } => {
                // default row plus two distinct values
                assert_eq!(dictionary.len(), 3);
                assert_eq!(indices.to_vec(), vec![1, 2, 1]);
                assert!(!shared_dictionary);
            }
            _ => panic!("expected a dictionary-encoded column"),
        }
    }

    #[test]
    fn test_constant_null_requires_nullable() {
        let err = Column::constant_null(&DataType::Int64, 3).unwrap_err();
        assert!(matches!(err, Error::LogicError(_)));
    }

    #[test]
    fn test_clone_resized_const() {
        let col = Column::constant(Value::Int64(7), &DataType::Int64, 3).unwrap();
        let resized = col.clone_resized(10).unwrap();
        assert_eq!(resized.len(), 10);
        assert_eq!(resized.value_at(9), Value::Int64(7));
    }

    #[test]
    fn test_clone_resized_rejects_full_column() {
        let col = Column::from_values(&[Value::Int64(1)], &DataType::Int64).unwrap();
        assert!(matches!(
            col.clone_resized(5),
            Err(Error::IllegalColumn(_))
        ));
    }

    #[test]
    fn test_gather_nullable() {
        let ty = DataType::Nullable(Box::new(DataType::Int64));
        let col =
            Column::from_values(&[Value::Int64(1), Value::Null, Value::Int64(3)], &ty).unwrap();
        let gathered = col.gather(&[2, 1, 0, 2]);
        assert_eq!(gathered.value_at(0), Value::Int64(3));
        assert_eq!(gathered.value_at(1), Value::Null);
        assert_eq!(gathered.value_at(2), Value::Int64(1));
        assert_eq!(gathered.value_at(3), Value::Int64(3));
    }

    #[test]
    fn test_gather_array() {
        let ty = DataType::Array(Box::new(DataType::Int64));
        let col = Column::from_values(
            &[
                Value::Array(vec![Value::Int64(1)]),
                Value::Array(vec![Value::Int64(2), Value::Int64(3)]),
            ],
            &ty,
        )
        .unwrap();
        let gathered = col.gather(&[1, 0]);
        assert_eq!(
            gathered.value_at(0),
            Value::Array(vec![Value::Int64(2), Value::Int64(3)])
        );
        assert_eq!(gathered.value_at(1), Value::Array(vec![Value::Int64(1)]));
    }

    #[test]
    fn test_gather_preserves_dictionary() {
        let ty = DataType::LowCardinality(Box::new(DataType::String));
        let col = Column::from_values(
            &[
                Value::String("a".to_string()),
                Value::String("b".to_string()),
            ],
            &ty,
        )
        .unwrap();
        let gathered = col.gather(&[1, 1, 0]);
        assert!(gathered.is_low_cardinality());
        assert_eq!(gathered.value_at(0), Value::String("b".to_string()));
        assert_eq!(gathered.value_at(2), Value::String("a".to_string()));
    }

}
