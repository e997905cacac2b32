use std::fmt;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Logical type of a column. Encodings (`Nullable`, `LowCardinality`) are
/// part of the type so planners see the encoded shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Nothing,
    Bool,
    Int64,
    UInt64,
    Float64,
    String,
    Date,
    Nullable(Box<DataType>),
    Array(Box<DataType>),
    Tuple {
        elements: Vec<DataType>,
        names: Option<Vec<String>>,
    },
    LowCardinality(Box<DataType>),
}

impl DataType {
    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// The type of a bare NULL constant.
    pub fn is_only_null(&self) -> bool {
        matches!(self, DataType::Nullable(inner) if **inner == DataType::Nothing)
    }

    pub fn is_low_cardinality(&self) -> bool {
        matches!(self, DataType::LowCardinality(_))
    }

    pub fn make_nullable(self) -> DataType {
        if self.is_nullable() {
            self
        } else {
            DataType::Nullable(Box::new(self))
        }
    }

    pub fn remove_nullable(&self) -> DataType {
        match self {
            DataType::Nullable(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    pub fn low_cardinality_value_type(&self) -> Option<&DataType> {
        match self {
            DataType::LowCardinality(inner) => Some(inner),
            _ => None,
        }
    }

    /// Replaces every `LowCardinality<T>` layer by `T`, descending through
    /// `Array` and `Tuple` constructors.
    pub fn remove_low_cardinality(&self) -> DataType {
        match self {
            DataType::Array(inner) => DataType::Array(Box::new(inner.remove_low_cardinality())),
            DataType::Tuple { elements, names } => DataType::Tuple {
                elements: elements.iter().map(|e| e.remove_low_cardinality()).collect(),
                names: names.clone(),
            },
            DataType::LowCardinality(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Nothing => write!(f, "NOTHING"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::UInt64 => write!(f, "UINT64"),
            DataType::Float64 => write!(f, "FLOAT64"),
            DataType::String => write!(f, "STRING"),
            DataType::Date => write!(f, "DATE"),
            DataType::Nullable(inner) => write!(f, "NULLABLE<{}>", inner),
            DataType::Array(inner) => write!(f, "ARRAY<{}>", inner),
            DataType::Tuple { elements, names } => {
                write!(f, "TUPLE<")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match names {
                        Some(names) => write!(f, "{} {}", names[i], element)?,
                        None => write!(f, "{}", element)?,
                    }
                }
                write!(f, ">")
            }
            DataType::LowCardinality(inner) => write!(f, "LOWCARDINALITY<{}>", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(OrderedFloat<f64>),
    String(String),
    Date(NaiveDate),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn float64(v: f64) -> Self {
        Value::Float64(OrderedFloat(v))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::UInt64(_) => "UINT64",
            Value::Float64(_) => "FLOAT64",
            Value::String(_) => "STRING",
            Value::Date(_) => "DATE",
            Value::Array(_) => "ARRAY",
            Value::Tuple(_) => "TUPLE",
        }
    }

    /// The default row of a type, as stored at index 0 of engine-built
    /// dictionaries.
    pub fn default_for(data_type: &DataType) -> Value {
        match data_type {
            DataType::Nothing => Value::Null,
            DataType::Bool => Value::Bool(false),
            DataType::Int64 => Value::Int64(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Float64 => Value::float64(0.0),
            DataType::String => Value::String(String::new()),
            DataType::Date => Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
            DataType::Nullable(_) => Value::Null,
            DataType::Array(_) => Value::Array(Vec::new()),
            DataType::Tuple { elements, .. } => {
                Value::Tuple(elements.iter().map(Value::default_for).collect())
            }
            DataType::LowCardinality(inner) => Value::default_for(inner),
        }
    }
}
