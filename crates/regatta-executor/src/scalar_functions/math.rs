use std::sync::Arc;

use aligned_vec::AVec;
use regatta_columnar::{convert_to_full_column_if_const, Block, Column};
use regatta_common::types::DataType;
use regatta_common::{Error, Result};

use super::argument;
use crate::function::{ColumnWithType, ScalarFunction};
use crate::jit::{CodegenBuilder, ValueId, ValuePlaceholder};

/// Addition over a single numeric type.
pub struct Plus;

impl ScalarFunction for Plus {
    fn name(&self) -> &str {
        "plus"
    }

    fn argument_count(&self) -> usize {
        2
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType> {
        let (lhs, rhs) = match args {
            [lhs, rhs] => (&lhs.data_type, &rhs.data_type),
            _ => {
                return Err(Error::invalid_function("PLUS requires 2 arguments"));
            }
        };
        match (lhs, rhs) {
            (DataType::Int64, DataType::Int64) => Ok(DataType::Int64),
            (DataType::UInt64, DataType::UInt64) => Ok(DataType::UInt64),
            (DataType::Float64, DataType::Float64) => Ok(DataType::Float64),
            _ => Err(Error::invalid_function(format!(
                "PLUS requires numeric arguments of one type, got {} and {}",
                lhs, rhs
            ))),
        }
    }

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        _input_rows_count: usize,
    ) -> Result<()> {
        let lhs = convert_to_full_column_if_const(&argument(block, args, 0, "PLUS")?);
        let rhs = convert_to_full_column_if_const(&argument(block, args, 1, "PLUS")?);

        let column = match (&*lhs, &*rhs) {
            (Column::Int64 { data: a }, Column::Int64 { data: b }) => {
                let mut out = AVec::with_capacity(64, a.len());
                for (x, y) in a.iter().zip(b.iter()) {
                    out.push(x.wrapping_add(*y));
                }
                Column::Int64 { data: out }
            }
            (Column::UInt64 { data: a }, Column::UInt64 { data: b }) => {
                let mut out = AVec::with_capacity(64, a.len());
                for (x, y) in a.iter().zip(b.iter()) {
                    out.push(x.wrapping_add(*y));
                }
                Column::UInt64 { data: out }
            }
            (Column::Float64 { data: a }, Column::Float64 { data: b }) => {
                let mut out = AVec::with_capacity(64, a.len());
                for (x, y) in a.iter().zip(b.iter()) {
                    out.push(x + y);
                }
                Column::Float64 { data: out }
            }
            _ => {
                return Err(Error::invalid_function(
                    "PLUS requires numeric arguments of one type",
                ));
            }
        };

        block.slot_mut(result).column = Some(Arc::new(column));
        Ok(())
    }

    fn is_compilable_impl(&self, args: &[DataType]) -> bool {
        matches!(args, [DataType::Int64, DataType::Int64])
    }

    fn compile_impl(
        &self,
        builder: &mut dyn CodegenBuilder,
        _args: &[DataType],
        values: &mut [ValuePlaceholder],
    ) -> Result<ValueId> {
        let lhs = (values[0])(builder);
        let rhs = (values[1])(builder);
        Ok(builder.binary_op("add", lhs, rhs))
    }
}
