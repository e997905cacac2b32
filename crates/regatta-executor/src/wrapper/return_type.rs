use regatta_columnar::{remove_low_cardinality, remove_nullable};
use regatta_common::types::DataType;
use regatta_common::{Error, Result};

use crate::function::ColumnWithType;
use crate::wrapper::nullable::null_presence_in_arguments;
use crate::wrapper::PreparedFunction;

impl PreparedFunction {
    /// Encoded return type for the given argument shapes, mirroring the
    /// runtime peeling at planning time.
    pub fn return_type(&self, arguments: &[ColumnWithType]) -> Result<DataType> {
        if !self.function().use_default_for_low_cardinality() {
            return self.return_type_without_low_cardinality(arguments);
        }

        let mut has_low_cardinality = false;
        let mut num_full_low_cardinality = 0usize;
        let mut num_full_ordinary = 0usize;

        let mut args_without_dictionary: Vec<ColumnWithType> = arguments.to_vec();
        for arg in &mut args_without_dictionary {
            let is_const = arg.column.as_ref().is_some_and(|c| c.is_const());
            if is_const {
                if let Some(column) = &arg.column {
                    arg.column = Some(remove_low_cardinality(column));
                }
            }

            if arg.data_type.is_low_cardinality() {
                has_low_cardinality = true;
                if !is_const {
                    num_full_low_cardinality += 1;
                }
            } else if !is_const {
                num_full_ordinary += 1;
            }
        }

        for arg in &mut args_without_dictionary {
            if let Some(column) = &arg.column {
                arg.column = Some(remove_low_cardinality(column));
            }
            arg.data_type = arg.data_type.remove_low_cardinality();
        }

        let inner = self.return_type_without_low_cardinality(&args_without_dictionary)?;

        if self.function().can_be_executed_on_low_cardinality_dictionary()
            && has_low_cardinality
            && num_full_low_cardinality <= 1
            && num_full_ordinary == 0
        {
            Ok(DataType::LowCardinality(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn return_type_without_low_cardinality(
        &self,
        arguments: &[ColumnWithType],
    ) -> Result<DataType> {
        self.check_number_of_arguments(arguments.len())?;

        if !arguments.is_empty() && self.function().use_default_for_nulls() {
            let null_presence = null_presence_in_arguments(arguments);

            if null_presence.has_null_constant {
                return Ok(DataType::Nullable(Box::new(DataType::Nothing)));
            }
            if null_presence.has_nullable {
                let nested: Vec<ColumnWithType> = arguments
                    .iter()
                    .map(|arg| ColumnWithType {
                        column: arg.column.as_ref().map(remove_nullable),
                        data_type: arg.data_type.remove_nullable(),
                        name: arg.name.clone(),
                    })
                    .collect();
                let inner = self.function().return_type_impl(&nested)?;
                return Ok(inner.make_nullable());
            }
        }

        self.function().return_type_impl(arguments)
    }

    fn check_number_of_arguments(&self, passed: usize) -> Result<()> {
        if self.function().is_variadic() {
            return Ok(());
        }
        let expected = self.function().argument_count();
        if passed != expected {
            return Err(Error::argument_count_mismatch(format!(
                "number of arguments for function {} doesn't match: passed {}, should be {}",
                self.function().name(),
                passed,
                expected
            )));
        }
        Ok(())
    }
}
