use regatta_columnar::{Block, ColumnRef};
use regatta_common::types::DataType;
use regatta_common::{Error, Result};

use crate::jit::{CodegenBuilder, ValueId, ValuePlaceholder};

/// Planning-time argument descriptor: the declared type plus the column when
/// the planner already has one in hand (constants).
#[derive(Debug, Clone)]
pub struct ColumnWithType {
    pub column: Option<ColumnRef>,
    pub data_type: DataType,
    pub name: String,
}

impl ColumnWithType {
    pub fn new(column: Option<ColumnRef>, data_type: DataType, name: impl Into<String>) -> Self {
        Self {
            column,
            data_type,
            name: name.into(),
        }
    }

    pub fn from_type(data_type: DataType, name: impl Into<String>) -> Self {
        Self::new(None, data_type, name)
    }
}

/// Contract every scalar function exposes to the execution wrapper.
///
/// The opt-in flags select which default implementations the wrapper
/// provides: peeling constants, propagating NULLs, and running over
/// dictionary-encoded arguments. `execute_impl` only ever sees the plain
/// form the enabled peels leave behind.
pub trait ScalarFunction: Send + Sync {
    fn name(&self) -> &str;

    fn argument_count(&self) -> usize;

    fn is_variadic(&self) -> bool {
        false
    }

    /// Argument positions that must stay constant across the whole batch
    /// (e.g. a pattern compiled once per invocation).
    fn always_constant_args(&self) -> &[usize] {
        &[]
    }

    fn use_default_for_constants(&self) -> bool {
        true
    }

    fn use_default_for_nulls(&self) -> bool {
        true
    }

    fn use_default_for_low_cardinality(&self) -> bool {
        true
    }

    /// Whether the function may be evaluated on a dictionary's reserved
    /// default row even when no batch row references it.
    fn can_be_executed_on_default_arguments(&self) -> bool {
        true
    }

    fn can_be_executed_on_low_cardinality_dictionary(&self) -> bool {
        true
    }

    fn return_type_impl(&self, args: &[ColumnWithType]) -> Result<DataType>;

    fn execute_impl(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        input_rows_count: usize,
    ) -> Result<()>;

    fn is_compilable_impl(&self, _args: &[DataType]) -> bool {
        false
    }

    fn compile_impl(
        &self,
        _builder: &mut dyn CodegenBuilder,
        _args: &[DataType],
        _values: &mut [ValuePlaceholder],
    ) -> Result<ValueId> {
        Err(Error::logic(format!(
            "function {} is not compilable",
            self.name()
        )))
    }
}
