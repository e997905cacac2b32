//! Null-propagation shim for natively compiled functions.
//!
//! Mirrors the interpreted null wrapper: one check per nullable argument
//! branching to a shared `fail` block that yields the NULL payload, a
//! computed result wrapped into a non-null pair, and a phi at the join
//! block selecting between the two. The shim is written against an
//! abstract single-pass builder so both paths stay behaviorally identical
//! under the same tests.

use regatta_common::types::DataType;
use regatta_common::Result;

use crate::function::{ColumnWithType, ScalarFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlockId(pub usize);

/// Lazily emitted argument value. Placeholders are re-pointed at the
/// extracted payload once an argument's null check has passed.
pub type ValuePlaceholder = Box<dyn Fn(&mut dyn CodegenBuilder) -> ValueId>;

/// Single-pass code emission surface the shim needs from a native backend.
/// Nullable values are modeled as `(payload, is_null)` pairs.
pub trait CodegenBuilder {
    fn create_basic_block(&mut self, label: &str) -> BasicBlockId;
    fn insert_block(&self) -> BasicBlockId;
    fn set_insert_point(&mut self, block: BasicBlockId);
    fn branch(&mut self, dest: BasicBlockId);
    fn cond_branch(&mut self, cond: ValueId, on_true: BasicBlockId, on_false: BasicBlockId);
    /// Zeroed `(payload, is_null)` pair of the given nullable type.
    fn null_constant(&mut self, data_type: &DataType) -> ValueId;
    fn bool_constant(&mut self, value: bool) -> ValueId;
    fn extract_value(&mut self, pair: ValueId, index: u32) -> ValueId;
    fn insert_value(&mut self, pair: ValueId, element: ValueId, index: u32) -> ValueId;
    fn binary_op(&mut self, op: &str, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn phi(&mut self, incoming: &[(ValueId, BasicBlockId)]) -> ValueId;
}

fn remove_nullables(types: &[DataType]) -> Option<Vec<DataType>> {
    if types.iter().any(|t| t.is_nullable()) {
        Some(types.iter().map(|t| t.remove_nullable()).collect())
    } else {
        None
    }
}

fn to_planning_args(types: &[DataType]) -> Vec<ColumnWithType> {
    types
        .iter()
        .enumerate()
        .map(|(i, t)| ColumnWithType::from_type(t.clone(), format!("arg{}", i)))
        .collect()
}

pub fn is_compilable(function: &dyn ScalarFunction, arguments: &[DataType]) -> bool {
    if function.use_default_for_nulls() {
        if let Some(denulled) = remove_nullables(arguments) {
            return function.is_compilable_impl(&denulled);
        }
    }
    function.is_compilable_impl(arguments)
}

pub fn compile(
    function: &dyn ScalarFunction,
    builder: &mut dyn CodegenBuilder,
    arguments: &[DataType],
    values: &mut [ValuePlaceholder],
) -> Result<ValueId> {
    if function.use_default_for_nulls() {
        if let Some(denulled) = remove_nullables(arguments) {
            let fail = builder.create_basic_block("fail");
            let join = builder.create_basic_block("join");
            let return_type = function
                .return_type_impl(&to_planning_args(&denulled))?
                .make_nullable();
            let zero = builder.null_constant(&return_type);

            for (i, argument) in arguments.iter().enumerate() {
                if !argument.is_nullable() {
                    continue;
                }
                // Checks are emitted eagerly: deferring them would let a
                // NULL in an unevaluated argument produce a non-NULL row.
                let value = (values[i])(builder);
                let ok = builder.create_basic_block("ok");
                let is_null = builder.extract_value(value, 1);
                builder.cond_branch(is_null, fail, ok);
                builder.set_insert_point(ok);
                let payload = builder.extract_value(value, 0);
                values[i] = Box::new(move |_: &mut dyn CodegenBuilder| payload);
            }

            let computed = function.compile_impl(builder, &denulled, values)?;
            let result = builder.insert_value(zero, computed, 0);
            let result_block = builder.insert_block();
            builder.branch(join);

            builder.set_insert_point(fail);
            let true_flag = builder.bool_constant(true);
            let null = builder.insert_value(zero, true_flag, 1);
            builder.branch(join);

            builder.set_insert_point(join);
            return Ok(builder.phi(&[(result, result_block), (null, fail)]));
        }
    }
    function.compile_impl(builder, arguments, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar_functions::math::Plus;

    #[derive(Debug, Clone)]
    enum Inst {
        Input(i64, bool),
        NullConst,
        BoolConst(bool),
        Extract(ValueId, u32),
        Insert(ValueId, ValueId, u32),
        Binary(String, ValueId, ValueId),
        Phi(Vec<(ValueId, BasicBlockId)>),
    }

    #[derive(Debug, Clone, Copy)]
    enum Terminator {
        Branch(BasicBlockId),
        CondBranch(ValueId, BasicBlockId, BasicBlockId),
    }

    #[derive(Default)]
    struct BlockData {
        insts: Vec<ValueId>,
        terminator: Option<Terminator>,
    }

    /// Records the emitted SSA graph and can interpret it for one row, so
    /// tests can compare the jitted control flow against the interpreted
    /// null wrapper.
    struct MockBuilder {
        blocks: Vec<BlockData>,
        current: BasicBlockId,
        defs: Vec<Inst>,
    }

    impl MockBuilder {
        fn new() -> Self {
            Self {
                blocks: vec![BlockData::default()],
                current: BasicBlockId(0),
                defs: Vec::new(),
            }
        }

        fn push(&mut self, inst: Inst) -> ValueId {
            let id = ValueId(self.defs.len());
            self.defs.push(inst);
            self.blocks[self.current.0].insts.push(id);
            id
        }

        fn input_pair(&mut self, payload: i64, is_null: bool) -> ValueId {
            self.push(Inst::Input(payload, is_null))
        }

        fn terminate(&mut self, terminator: Terminator) {
            self.blocks[self.current.0].terminator = Some(terminator);
        }

        /// Runs the recorded graph from the entry block and returns the
        /// `(payload, is_null)` view of `result`.
        fn eval(&self, result: ValueId) -> (i64, bool) {
            #[derive(Clone, Copy)]
            enum Rt {
                Scalar(i64),
                Pair(i64, bool),
            }
            fn scalar(v: Rt) -> i64 {
                match v {
                    Rt::Scalar(s) => s,
                    Rt::Pair(p, _) => p,
                }
            }

            let mut env: Vec<Option<Rt>> = vec![None; self.defs.len()];
            let mut block = BasicBlockId(0);
            let mut prev = BasicBlockId(0);
            loop {
                for &id in &self.blocks[block.0].insts {
                    let value = match &self.defs[id.0] {
                        Inst::Input(payload, is_null) => Rt::Pair(*payload, *is_null),
                        Inst::NullConst => Rt::Pair(0, false),
                        Inst::BoolConst(b) => Rt::Scalar(*b as i64),
                        Inst::Extract(pair, index) => {
                            let Some(Rt::Pair(payload, is_null)) = env[pair.0] else {
                                panic!("extract from a non-pair value");
                            };
                            match index {
                                0 => Rt::Scalar(payload),
                                _ => Rt::Scalar(is_null as i64),
                            }
                        }
                        Inst::Insert(pair, element, index) => {
                            let Some(Rt::Pair(payload, is_null)) = env[pair.0] else {
                                panic!("insert into a non-pair value");
                            };
                            let element = scalar(env[element.0].expect("undefined operand"));
                            match index {
                                0 => Rt::Pair(element, is_null),
                                _ => Rt::Pair(payload, element != 0),
                            }
                        }
                        Inst::Binary(op, lhs, rhs) => {
                            let lhs = scalar(env[lhs.0].expect("undefined operand"));
                            let rhs = scalar(env[rhs.0].expect("undefined operand"));
                            match op.as_str() {
                                "add" => Rt::Scalar(lhs + rhs),
                                other => panic!("unsupported op {}", other),
                            }
                        }
                        Inst::Phi(incoming) => {
                            let (value, _) = incoming
                                .iter()
                                .find(|(_, from)| *from == prev)
                                .expect("no phi incoming for predecessor");
                            env[value.0].expect("undefined phi operand")
                        }
                    };
                    env[id.0] = Some(value);
                }
                match self.blocks[block.0].terminator {
                    Some(Terminator::Branch(dest)) => {
                        prev = block;
                        block = dest;
                    }
                    Some(Terminator::CondBranch(cond, on_true, on_false)) => {
                        let cond = scalar(env[cond.0].expect("undefined condition"));
                        prev = block;
                        block = if cond != 0 { on_true } else { on_false };
                    }
                    None => break,
                }
            }
            match env[result.0].expect("result not evaluated") {
                Rt::Scalar(s) => (s, false),
                Rt::Pair(p, is_null) => (p, is_null),
            }
        }
    }

    impl CodegenBuilder for MockBuilder {
        fn create_basic_block(&mut self, _label: &str) -> BasicBlockId {
            self.blocks.push(BlockData::default());
            BasicBlockId(self.blocks.len() - 1)
        }

        fn insert_block(&self) -> BasicBlockId {
            self.current
        }

        fn set_insert_point(&mut self, block: BasicBlockId) {
            self.current = block;
        }

        fn branch(&mut self, dest: BasicBlockId) {
            self.terminate(Terminator::Branch(dest));
        }

        fn cond_branch(&mut self, cond: ValueId, on_true: BasicBlockId, on_false: BasicBlockId) {
            self.terminate(Terminator::CondBranch(cond, on_true, on_false));
        }

        fn null_constant(&mut self, _data_type: &DataType) -> ValueId {
            self.push(Inst::NullConst)
        }

        fn bool_constant(&mut self, value: bool) -> ValueId {
            self.push(Inst::BoolConst(value))
        }

        fn extract_value(&mut self, pair: ValueId, index: u32) -> ValueId {
            self.push(Inst::Extract(pair, index))
        }

        fn insert_value(&mut self, pair: ValueId, element: ValueId, index: u32) -> ValueId {
            self.push(Inst::Insert(pair, element, index))
        }

        fn binary_op(&mut self, op: &str, lhs: ValueId, rhs: ValueId) -> ValueId {
            self.push(Inst::Binary(op.to_string(), lhs, rhs))
        }

        fn phi(&mut self, incoming: &[(ValueId, BasicBlockId)]) -> ValueId {
            self.push(Inst::Phi(incoming.to_vec()))
        }
    }

    fn nullable_int64() -> DataType {
        DataType::Nullable(Box::new(DataType::Int64))
    }

    fn compile_plus_for_row(
        arguments: &[DataType],
        inputs: &[(i64, bool)],
    ) -> (i64, bool) {
        let mut builder = MockBuilder::new();
        let mut values: Vec<ValuePlaceholder> = inputs
            .iter()
            .map(|&(payload, is_null)| {
                let id = builder.input_pair(payload, is_null);
                Box::new(move |_: &mut dyn CodegenBuilder| id) as ValuePlaceholder
            })
            .collect();
        let result = compile(&Plus, &mut builder, arguments, &mut values).unwrap();
        builder.eval(result)
    }

    #[test]
    fn test_is_compilable_denulls_arguments() {
        assert!(is_compilable(&Plus, &[DataType::Int64, DataType::Int64]));
        assert!(is_compilable(&Plus, &[nullable_int64(), DataType::Int64]));
        assert!(is_compilable(&Plus, &[nullable_int64(), nullable_int64()]));
        assert!(!is_compilable(&Plus, &[DataType::String, DataType::Int64]));
    }

    #[test]
    fn test_compile_without_nullable_arguments_delegates() {
        let (payload, is_null) =
            compile_plus_for_row(&[DataType::Int64, DataType::Int64], &[(7, false), (5, false)]);
        assert_eq!(payload, 12);
        assert!(!is_null);
    }

    #[test]
    fn test_compile_nullable_all_valid() {
        let (payload, is_null) =
            compile_plus_for_row(&[nullable_int64(), DataType::Int64], &[(7, false), (5, false)]);
        assert_eq!(payload, 12);
        assert!(!is_null);
    }

    #[test]
    fn test_compile_nullable_null_propagates() {
        let (_, is_null) =
            compile_plus_for_row(&[nullable_int64(), DataType::Int64], &[(7, true), (5, false)]);
        assert!(is_null);
    }

    #[test]
    fn test_jit_matches_interpreted_null_wrapper() {
        use std::sync::Arc;

        use regatta_columnar::{Block, BlockSlot, Column};
        use regatta_common::types::Value;

        use crate::wrapper::PreparedFunction;

        let lhs = [Some(3), None, Some(-2), Some(0)];
        let rhs = [Some(4), Some(1), None, Some(9)];

        let to_column = |values: &[Option<i64>]| {
            let values: Vec<Value> = values
                .iter()
                .map(|v| v.map_or(Value::Null, Value::Int64))
                .collect();
            Arc::new(Column::from_values(&values, &nullable_int64()).unwrap())
        };

        let prepared = PreparedFunction::new(Arc::new(Plus));
        let mut block = Block::new();
        block.insert(BlockSlot::new(Some(to_column(&lhs)), nullable_int64(), "lhs"));
        block.insert(BlockSlot::new(Some(to_column(&rhs)), nullable_int64(), "rhs"));
        block.insert(BlockSlot::new(None, nullable_int64(), "sum"));
        prepared.execute(&mut block, &[0, 1], 2, lhs.len()).unwrap();
        let interpreted = block.slot(2).column.clone().unwrap();

        for row in 0..lhs.len() {
            let (payload, is_null) = compile_plus_for_row(
                &[nullable_int64(), nullable_int64()],
                &[
                    (lhs[row].unwrap_or(0), lhs[row].is_none()),
                    (rhs[row].unwrap_or(0), rhs[row].is_none()),
                ],
            );
            if is_null {
                assert_eq!(interpreted.value_at(row), Value::Null, "row {}", row);
            } else {
                assert_eq!(interpreted.value_at(row), Value::Int64(payload), "row {}", row);
            }
        }
    }

    #[test]
    fn test_compile_second_argument_null_propagates() {
        let (_, is_null) = compile_plus_for_row(
            &[nullable_int64(), nullable_int64()],
            &[(7, false), (5, true)],
        );
        assert!(is_null);

        let (payload, is_null) = compile_plus_for_row(
            &[nullable_int64(), nullable_int64()],
            &[(7, false), (5, false)],
        );
        assert_eq!(payload, 12);
        assert!(!is_null);
    }
}
