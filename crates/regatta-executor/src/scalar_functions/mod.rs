//! Scalar function implementations exercising the execution wrapper.

pub mod math;
pub mod string;

use regatta_columnar::{Block, ColumnRef};
use regatta_common::{Error, Result};

pub(crate) fn argument(
    block: &Block,
    args: &[usize],
    index: usize,
    function: &str,
) -> Result<ColumnRef> {
    let &position = args.get(index).ok_or_else(|| {
        Error::invalid_function(format!(
            "{} requires at least {} arguments",
            function,
            index + 1
        ))
    })?;
    block
        .slot(position)
        .column
        .clone()
        .ok_or_else(|| Error::logic(format!("argument column {} is not set", position)))
}
