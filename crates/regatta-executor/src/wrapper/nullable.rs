use std::sync::Arc;

use regatta_columnar::{
    convert_to_full_column_if_const, remove_nullable, Block, Column, ColumnRef, NullBitmap,
};
use regatta_common::{Error, Result};

use crate::function::ColumnWithType;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NullPresence {
    pub has_nullable: bool,
    pub has_null_constant: bool,
}

pub(crate) fn null_presence_in_block(block: &Block, args: &[usize]) -> NullPresence {
    let mut res = NullPresence::default();
    for &arg in args {
        let data_type = &block.slot(arg).data_type;
        if !res.has_nullable {
            res.has_nullable = data_type.is_nullable();
        }
        if !res.has_null_constant {
            res.has_null_constant = data_type.is_only_null();
        }
    }
    res
}

pub(crate) fn null_presence_in_arguments(arguments: &[ColumnWithType]) -> NullPresence {
    let mut res = NullPresence::default();
    for argument in arguments {
        if !res.has_nullable {
            res.has_nullable = argument.data_type.is_nullable();
        }
        if !res.has_null_constant {
            res.has_null_constant = argument.data_type.is_only_null();
        }
    }
    res
}

/// Wraps a column in a nullable layer with an all-valid map, keeping
/// constant wrappers on the outside.
fn make_nullable(column: &ColumnRef) -> ColumnRef {
    match &**column {
        Column::Nullable { .. } => Arc::clone(column),
        Column::Const { values, len } => Arc::new(Column::Const {
            values: make_nullable(values),
            len: *len,
        }),
        _ => Arc::new(Column::Nullable {
            values: Arc::clone(column),
            nulls: NullBitmap::new_valid(column.len()),
        }),
    }
}

/// Batch where every nullable argument is replaced by its inner payload and
/// the result slot's type is stripped of its nullable layer. Null maps are
/// set aside; [`wrap_in_nullable`] reattaches them to the computed result.
pub(crate) fn create_block_with_nested_columns(
    block: &Block,
    args: &[usize],
    result: usize,
) -> Block {
    let mut nested = block.clone();
    for &arg in args {
        let slot = nested.slot_mut(arg);
        if let Some(column) = &slot.column {
            slot.column = Some(remove_nullable(column));
        }
        slot.data_type = slot.data_type.remove_nullable();
    }
    let result_slot = nested.slot_mut(result);
    result_slot.column = None;
    result_slot.data_type = result_slot.data_type.remove_nullable();
    nested
}

/// Combines the argument null maps onto a computed non-null result column.
pub fn wrap_in_nullable(
    src: &ColumnRef,
    block: &Block,
    args: &[usize],
    result: usize,
    input_rows_count: usize,
) -> Result<ColumnRef> {
    if src.is_only_null() {
        return Ok(Arc::clone(src));
    }

    let mut src_not_nullable = Arc::clone(src);
    let mut result_null_map: Option<NullBitmap> = None;

    if let Column::Nullable { values, nulls } = &**src {
        src_not_nullable = Arc::clone(values);
        result_null_map = Some(nulls.clone());
    }

    for &arg in args {
        let slot = block.slot(arg);
        if !slot.data_type.is_nullable() {
            continue;
        }
        let column = slot.column.as_ref().ok_or_else(|| {
            Error::logic(format!("argument column {} is not set", arg))
        })?;

        // A constant NULL argument nulls the whole result.
        if column.is_only_null() {
            let result_type = &block.slot(result).data_type;
            return Ok(Arc::new(Column::constant_null(result_type, input_rows_count)?));
        }

        // A non-null nullable constant contributes nothing.
        if column.is_const() {
            continue;
        }

        if let Column::Nullable { nulls, .. } = &**column {
            result_null_map = Some(match result_null_map {
                Some(accumulated) => accumulated.union(nulls),
                None => nulls.clone(),
            });
        }
    }

    let Some(null_map) = result_null_map else {
        return Ok(make_nullable(src));
    };

    // Pair the payload with the combined map, materializing constants.
    let values = convert_to_full_column_if_const(&src_not_nullable);
    Ok(Arc::new(Column::Nullable {
        values,
        nulls: null_map,
    }))
}
