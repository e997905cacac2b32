pub(crate) mod nullable;
mod return_type;

use std::sync::Arc;

use regatta_columnar::{
    convert_to_full_column_if_const, remove_low_cardinality, Block, BlockSlot, Column, Dictionary,
    DictionaryBuilder, IndexColumn,
};
use regatta_common::{Error, Result};
use tracing::debug;

use crate::function::ScalarFunction;
use crate::result_cache::{CachedValues, DictionaryKey, LowCardinalityResultCache};
use crate::wrapper::nullable::{
    create_block_with_nested_columns, null_presence_in_block, wrap_in_nullable,
};

/// Execution wrapper around one scalar function.
///
/// `execute` layers the three default implementations around the function's
/// `execute_impl`: the dictionary peel outermost, then the constant peel,
/// then the null peel. Each layer rewraps the inner result so the function
/// itself only ever sees plain columns.
pub struct PreparedFunction {
    function: Arc<dyn ScalarFunction>,
    result_cache: Option<Arc<LowCardinalityResultCache>>,
}

impl PreparedFunction {
    pub fn new(function: Arc<dyn ScalarFunction>) -> Self {
        Self {
            function,
            result_cache: None,
        }
    }

    pub fn with_result_cache(mut self, capacity: usize) -> Self {
        self.create_low_cardinality_result_cache(capacity);
        self
    }

    /// Wires up the dictionary result cache. Capacity should equal the
    /// number of concurrent readers. Idempotent.
    pub fn create_low_cardinality_result_cache(&mut self, capacity: usize) {
        if self.result_cache.is_none() {
            self.result_cache = Some(Arc::new(LowCardinalityResultCache::new(capacity)));
        }
    }

    pub fn function(&self) -> &dyn ScalarFunction {
        self.function.as_ref()
    }

    pub fn result_cache(&self) -> Option<&Arc<LowCardinalityResultCache>> {
        self.result_cache.as_ref()
    }

    /// Executes the function over one batch, filling the result slot.
    pub fn execute(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        input_rows_count: usize,
    ) -> Result<()> {
        if !self.function.use_default_for_low_cardinality() {
            return self.execute_without_low_cardinality(block, args, result, input_rows_count);
        }

        let mut block_without_dicts = block.clone_without_columns();
        for &arg in args {
            block_without_dicts.slot_mut(arg).column = block.slot(arg).column.clone();
        }

        let result_type = block.slot(result).data_type.clone();
        let Some(dictionary_value_type) = result_type.low_cardinality_value_type().cloned() else {
            // Plain result type: fully materialize every dictionary-encoded
            // argument and run the inner pipeline on the exploded batch.
            for &arg in args {
                let slot = block_without_dicts.slot_mut(arg);
                if let Some(column) = &slot.column {
                    slot.column = Some(remove_low_cardinality(column));
                }
                slot.data_type = slot.data_type.remove_low_cardinality();
            }
            self.execute_without_low_cardinality(
                &mut block_without_dicts,
                args,
                result,
                input_rows_count,
            )?;
            block.slot_mut(result).column = block_without_dicts.slot(result).column.clone();
            return Ok(());
        };

        // Dictionary-encoded result: run the function over the dictionary
        // values and rewrap with the argument's indices.
        let low_cardinality_arg =
            find_low_cardinality_argument(block, args, self.function.name())?;
        let can_be_executed_on_default_arguments =
            self.function.can_be_executed_on_default_arguments();
        let use_cache = self.result_cache.is_some()
            && can_be_executed_on_default_arguments
            && low_cardinality_arg
                .as_ref()
                .is_some_and(|(_, _, shared)| *shared);

        let mut key = None;
        if use_cache {
            if let (Some(cache), Some((dictionary, indices, _))) = (
                self.result_cache.as_deref(),
                low_cardinality_arg.as_ref(),
            ) {
                let cache_key = DictionaryKey {
                    hash: dictionary.content_hash(),
                    size: dictionary.len() as u64,
                };
                if let Some(cached) = cache.get(&cache_key) {
                    debug!(function = self.function.name(), "dictionary result cache hit");
                    let rewritten = cached.index_mapping.index(indices);
                    block.slot_mut(result).column = Some(Arc::new(Column::low_cardinality(
                        Arc::clone(&cached.function_result),
                        rewritten,
                        true,
                    )?));
                    return Ok(());
                }
                debug!(function = self.function.name(), "dictionary result cache miss");
                key = Some(cache_key);
            }
        }

        block_without_dicts.slot_mut(result).data_type = dictionary_value_type.clone();
        let indexes = replace_low_cardinality_by_nested(
            &mut block_without_dicts,
            args,
            self.function.name(),
            can_be_executed_on_default_arguments,
        )?;

        let rows = block_without_dicts.row_count();
        self.execute_without_low_cardinality(&mut block_without_dicts, args, result, rows)?;

        let keys_column = block_without_dicts
            .slot(result)
            .column
            .clone()
            .ok_or_else(|| {
                Error::logic(format!(
                    "function {} did not produce a result column",
                    self.function.name()
                ))
            })?;
        let keys_column = convert_to_full_column_if_const(&keys_column);

        let mut builder = DictionaryBuilder::new(dictionary_value_type);
        let mut res_indexes = builder.insert_range(&keys_column);
        let mut res_dictionary = Arc::new(builder.finish()?);

        if let Some(indexes) = indexes {
            if let (Some(cache), Some(key), Some((dictionary, _, _))) = (
                self.result_cache.as_deref(),
                key,
                low_cardinality_arg.as_ref(),
            ) {
                let entry = Arc::new(CachedValues {
                    dictionary_holder: Arc::clone(dictionary),
                    function_result: Arc::clone(&res_dictionary),
                    index_mapping: res_indexes.clone(),
                });
                // Another thread may have inserted first; adopt its entry.
                let cached = cache.get_or_set(key, entry);
                res_dictionary = Arc::clone(&cached.function_result);
                res_indexes = cached.index_mapping.clone();
            }
            block.slot_mut(result).column = Some(Arc::new(Column::low_cardinality(
                res_dictionary,
                res_indexes.index(&indexes),
                use_cache,
            )?));
        } else {
            block.slot_mut(result).column = Some(Arc::new(Column::low_cardinality(
                res_dictionary,
                res_indexes,
                false,
            )?));
        }
        Ok(())
    }

    /// Internal entry that skips the dictionary layer, so dictionary
    /// replacement happens exactly once per invocation.
    fn execute_without_low_cardinality(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        input_rows_count: usize,
    ) -> Result<()> {
        if self.default_implementation_for_constants(block, args, result, input_rows_count)? {
            return Ok(());
        }
        if self.default_implementation_for_nulls(block, args, result, input_rows_count)? {
            return Ok(());
        }
        self.function.execute_impl(block, args, result, input_rows_count)
    }

    /// Constant peel: all-constant batches are evaluated on a single row
    /// and the result rewrapped as a constant of the batch length.
    fn default_implementation_for_constants(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        input_rows_count: usize,
    ) -> Result<bool> {
        let always_constant = self.function.always_constant_args();

        // Validated even when the peel itself does not fire.
        for &arg_num in always_constant {
            if arg_num < args.len() {
                let column = argument_column(block, args[arg_num])?;
                if !column.is_const() {
                    return Err(Error::illegal_column(format!(
                        "argument at index {} for function {} must be constant",
                        arg_num,
                        self.function.name()
                    )));
                }
            }
        }

        if args.is_empty()
            || !self.function.use_default_for_constants()
            || !all_arguments_are_constants(block, args)?
        {
            return Ok(false);
        }

        let mut temporary_block = Block::new();
        let mut have_converted_columns = false;

        for (arg_num, &arg) in args.iter().enumerate() {
            let slot = block.slot(arg);
            if always_constant.contains(&arg_num) {
                temporary_block.insert(slot.clone());
            } else {
                have_converted_columns = true;
                let column = argument_column(block, arg)?;
                let values = match &*column {
                    Column::Const { values, .. } => Arc::clone(values),
                    _ => {
                        return Err(Error::logic(format!(
                            "argument {} of function {} is not constant",
                            arg_num,
                            self.function.name()
                        )));
                    }
                };
                temporary_block.insert(BlockSlot::new(
                    Some(values),
                    slot.data_type.clone(),
                    slot.name.clone(),
                ));
            }
        }

        // At least one argument must be unwrapped, or re-entry would
        // recurse forever.
        if !have_converted_columns {
            return Err(Error::argument_count_mismatch(format!(
                "function {} requires at least one argument that is not always constant",
                self.function.name()
            )));
        }

        temporary_block.insert(block.slot(result).clone());
        let temporary_args: Vec<usize> = (0..args.len()).collect();
        let temporary_result = args.len();
        let rows = temporary_block.row_count();
        self.execute_without_low_cardinality(
            &mut temporary_block,
            &temporary_args,
            temporary_result,
            rows,
        )?;

        let result_column = temporary_block
            .slot(temporary_result)
            .column
            .clone()
            .ok_or_else(|| {
                Error::logic(format!(
                    "function {} did not produce a result column",
                    self.function.name()
                ))
            })?;
        let single_row = Arc::new(result_column.gather(&[0]));
        block.slot_mut(result).column = Some(Arc::new(Column::Const {
            values: single_row,
            len: input_rows_count,
        }));
        Ok(true)
    }

    /// Null peel: a constant-NULL argument short-circuits to a constant
    /// NULL result; otherwise nullable arguments are stripped, the function
    /// runs on the payloads, and the null maps are recombined on top.
    fn default_implementation_for_nulls(
        &self,
        block: &mut Block,
        args: &[usize],
        result: usize,
        input_rows_count: usize,
    ) -> Result<bool> {
        if args.is_empty() || !self.function.use_default_for_nulls() {
            return Ok(false);
        }

        let null_presence = null_presence_in_block(block, args);

        if null_presence.has_null_constant {
            let result_type = block.slot(result).data_type.clone();
            block.slot_mut(result).column =
                Some(Arc::new(Column::constant_null(&result_type, input_rows_count)?));
            return Ok(true);
        }

        if null_presence.has_nullable {
            let mut temporary_block = create_block_with_nested_columns(block, args, result);
            let rows = temporary_block.row_count();
            self.execute_without_low_cardinality(&mut temporary_block, args, result, rows)?;
            let inner_result = temporary_block.slot(result).column.clone().ok_or_else(|| {
                Error::logic(format!(
                    "function {} did not produce a result column",
                    self.function.name()
                ))
            })?;
            block.slot_mut(result).column = Some(wrap_in_nullable(
                &inner_result,
                block,
                args,
                result,
                input_rows_count,
            )?);
            return Ok(true);
        }

        Ok(false)
    }
}

fn argument_column(block: &Block, position: usize) -> Result<regatta_columnar::ColumnRef> {
    block
        .slot(position)
        .column
        .clone()
        .ok_or_else(|| Error::logic(format!("argument column {} is not set", position)))
}

fn all_arguments_are_constants(block: &Block, args: &[usize]) -> Result<bool> {
    for &arg in args {
        if !argument_column(block, arg)?.is_const() {
            return Ok(false);
        }
    }
    Ok(true)
}

type LowCardinalityArgument = (Arc<Dictionary>, IndexColumn, bool);

fn find_low_cardinality_argument(
    block: &Block,
    args: &[usize],
    function_name: &str,
) -> Result<Option<LowCardinalityArgument>> {
    let mut found: Option<LowCardinalityArgument> = None;
    for &arg in args {
        if let Some(column) = &block.slot(arg).column {
            if let Column::LowCardinality {
                dictionary,
                indices,
                shared_dictionary,
            } = &**column
            {
                if found.is_some() {
                    return Err(Error::logic(format!(
                        "expected a single dictionary argument for function {}",
                        function_name
                    )));
                }
                found = Some((Arc::clone(dictionary), indices.clone(), *shared_dictionary));
            }
        }
    }
    Ok(found)
}

/// Rewrites the batch so the function runs over dictionary values: the
/// dictionary argument is fed either in full (default-arguments mode) or in
/// minimal form, constants are resized to the dictionary size, and the
/// returned index vector rebuilds batch positions from the inner result.
fn replace_low_cardinality_by_nested(
    block: &mut Block,
    args: &[usize],
    function_name: &str,
    can_be_executed_on_default_arguments: bool,
) -> Result<Option<IndexColumn>> {
    let mut indexes: Option<IndexColumn> = None;
    let mut num_rows: Option<usize> = None;
    let mut constant_args: Vec<usize> = Vec::new();

    for &arg in args {
        let column = argument_column(block, arg)?;
        match &*column {
            Column::Const { .. } => constant_args.push(arg),
            Column::LowCardinality {
                dictionary,
                indices,
                ..
            } => {
                if indexes.is_some() {
                    return Err(Error::logic(format!(
                        "expected a single dictionary argument for function {}",
                        function_name
                    )));
                }
                let slot_type = block.slot(arg).data_type.clone();
                let value_type = slot_type.low_cardinality_value_type().cloned().ok_or_else(
                    || {
                        Error::logic(format!(
                            "incompatible type for dictionary-encoded column: {}",
                            slot_type
                        ))
                    },
                )?;
                // Constants are sized to the full dictionary on both paths.
                num_rows = Some(dictionary.len());
                let fed = if can_be_executed_on_default_arguments {
                    indexes = Some(indices.clone());
                    Arc::clone(dictionary.nested_column())
                } else {
                    let (minimal, outer) = column.minimal_dictionary_encoding()?;
                    indexes = Some(outer);
                    minimal
                };
                let slot = block.slot_mut(arg);
                slot.column = Some(fed);
                slot.data_type = value_type;
            }
            _ => {}
        }
    }

    if let Some(rows) = num_rows {
        for &arg in &constant_args {
            let slot = block.slot_mut(arg);
            if let Some(column) = &slot.column {
                let stripped = remove_low_cardinality(column);
                slot.column = Some(Arc::new(stripped.clone_resized(rows)?));
            }
            slot.data_type = slot.data_type.remove_low_cardinality();
        }
    }

    Ok(indexes)
}
