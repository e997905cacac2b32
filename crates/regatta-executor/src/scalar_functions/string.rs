use std::sync::Arc;

use aligned_vec::AVec;
use regatta_columnar::{convert_to_full_column_if_const, Block, Column};
use regatta_common::types::{DataType, Value};
use regatta_common::{Error, Result};
use regex::Regex;

use super::argument;
use crate::function::{ColumnWithType, ScalarFunction};

fn expect_string_type(args: &[ColumnWithType], function: &str) -> Result<()> {
    match args {
        [arg] if arg.data_type == DataType::String => Ok(()),
        [arg] => Err(Error::invalid_function(format!(
            "{} requires a string argument, got {}",
            function, arg.data_type
        ))),
        _ => Err(Error::invalid_function(format!(
            "{} requires 1 argument",
            function
        ))),
    }
}

/// Character length of a string.
pub struct Length;

impl ScalarFunction for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn argument_count(&self) -> usize {
        1
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType> {
        expect_string_type(args, "LENGTH")?;
        Ok(DataType::UInt64)
    }

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        _input_rows_count: usize,
    ) -> Result<()> {
        let col = convert_to_full_column_if_const(&argument(block, args, 0, "LENGTH")?);
        let column = match &*col {
            Column::String { data } => {
                let mut out = AVec::with_capacity(64, data.len());
                for s in data {
                    out.push(s.chars().count() as u64);
                }
                Column::UInt64 { data: out }
            }
            _ => {
                return Err(Error::invalid_function("LENGTH requires a string argument"));
            }
        };
        block.slot_mut(result).column = Some(Arc::new(column));
        Ok(())
    }
}

/// ASCII-agnostic uppercase.
pub struct Upper;

impl ScalarFunction for Upper {
    fn name(&self) -> &str {
        "upper"
    }

    fn argument_count(&self) -> usize {
        1
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType> {
        expect_string_type(args, "UPPER")?;
        Ok(DataType::String)
    }

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        _input_rows_count: usize,
    ) -> Result<()> {
        let col = convert_to_full_column_if_const(&argument(block, args, 0, "UPPER")?);
        let column = match &*col {
            Column::String { data } => Column::String {
                data: data.iter().map(|s| s.to_uppercase()).collect(),
            },
            _ => {
                return Err(Error::invalid_function("UPPER requires a string argument"));
            }
        };
        block.slot_mut(result).column = Some(Arc::new(column));
        Ok(())
    }
}

/// Whether a string is empty.
pub struct IsEmpty;

impl ScalarFunction for IsEmpty {
    fn name(&self) -> &str {
        "is_empty"
    }

    fn argument_count(&self) -> usize {
        1
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType> {
        expect_string_type(args, "IS_EMPTY")?;
        Ok(DataType::Bool)
    }

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        _input_rows_count: usize,
    ) -> Result<()> {
        let col = convert_to_full_column_if_const(&argument(block, args, 0, "IS_EMPTY")?);
        let column = match &*col {
            Column::String { data } => Column::Bool {
                data: data.iter().map(|s| s.is_empty()).collect(),
            },
            _ => {
                return Err(Error::invalid_function(
                    "IS_EMPTY requires a string argument",
                ));
            }
        };
        block.slot_mut(result).column = Some(Arc::new(column));
        Ok(())
    }
}

/// Regex match against a pattern that must be constant across the batch,
/// so it is compiled once per invocation.
pub struct RegexpContains;

impl ScalarFunction for RegexpContains {
    fn name(&self) -> &str {
        "regexp_contains"
    }

    fn argument_count(&self) -> usize {
        2
    }

    fn always_constant_args(&self) -> &[usize] {
        &[1]
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType> {
        match args {
            [haystack, pattern]
                if haystack.data_type == DataType::String
                    && pattern.data_type == DataType::String =>
            {
                Ok(DataType::Bool)
            }
            _ => Err(Error::invalid_function(
                "REGEXP_CONTAINS requires 2 string arguments",
            )),
        }
    }

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        _input_rows_count: usize,
    ) -> Result<()> {
        let pattern_column = argument(block, args, 1, "REGEXP_CONTAINS")?;
        let pattern = match pattern_column.value_at(0) {
            Value::String(pattern) => pattern,
            other => {
                return Err(Error::invalid_function(format!(
                    "REGEXP_CONTAINS requires a string pattern, got {}",
                    other.type_name()
                )));
            }
        };
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::invalid_function(format!("invalid pattern: {}", e)))?;

        let col = convert_to_full_column_if_const(&argument(block, args, 0, "REGEXP_CONTAINS")?);
        let column = match &*col {
            Column::String { data } => Column::Bool {
                data: data.iter().map(|s| regex.is_match(s)).collect(),
            },
            _ => {
                return Err(Error::invalid_function(
                    "REGEXP_CONTAINS requires a string argument",
                ));
            }
        };
        block.slot_mut(result).column = Some(Arc::new(column));
        Ok(())
    }
}
