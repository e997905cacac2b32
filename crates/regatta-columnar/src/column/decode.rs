use std::sync::Arc;

use super::{Column, ColumnRef};

/// Materializes every dictionary-encoded layer, descending through `Array`,
/// `Tuple`, and `Const` wrappers.
pub fn remove_low_cardinality(column: &ColumnRef) -> ColumnRef {
    match &**column {
        Column::Array { offsets, values } => Arc::new(Column::Array {
            offsets: offsets.clone(),
            values: remove_low_cardinality(values),
        }),
        Column::Tuple { columns } => Arc::new(Column::Tuple {
            columns: columns.iter().map(remove_low_cardinality).collect(),
        }),
        Column::Const { values, len } => Arc::new(Column::Const {
            values: remove_low_cardinality(values),
            len: *len,
        }),
        Column::LowCardinality {
            dictionary,
            indices,
            ..
        } => {
            let rows: Vec<usize> = indices.iter().map(|i| i as usize).collect();
            Arc::new(dictionary.nested_column().gather(&rows))
        }
        _ => Arc::clone(column),
    }
}

/// Replicates a constant to its full length; any other column is shared
/// as-is.
pub fn convert_to_full_column_if_const(column: &ColumnRef) -> ColumnRef {
    match &**column {
        Column::Const { values, len } => Arc::new(values.gather(&vec![0; *len])),
        _ => Arc::clone(column),
    }
}

/// Strips one nullable layer: the inner payload of a nullable column, or a
/// constant over that payload for constant arguments.
pub fn remove_nullable(column: &ColumnRef) -> ColumnRef {
    match &**column {
        Column::Nullable { values, .. } => Arc::clone(values),
        Column::Const { values, len } => Arc::new(Column::Const {
            values: remove_nullable(values),
            len: *len,
        }),
        _ => Arc::clone(column),
    }
}
