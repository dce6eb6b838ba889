//! Forward, worklist-based abstract interpreter over a pluggable lattice.
//!
//! Per-block state is a `Map<Variable, D>` with **missing-means-⊥** as the
//! default — using ⊤ as the default would let the worklist settle before
//! every reachable definition has actually been observed.

pub mod clients;
pub mod lattice;

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::ir::{BinaryOperator, BlockId, ControlFlowGraph, Instruction, Literal, Value, Variable};
use lattice::Lattice;

/// Extends [`Lattice`] with the value-construction and arithmetic hooks the
/// instruction-level transfer functions need. A domain that can't give a
/// precise answer (unmodeled operator, wrong-shaped operand) returns `top`
/// rather than failing — abstract interpretation never errors mid-analysis.
pub trait AbstractValue: Lattice {
    fn of_literal(lit: &Literal) -> Self;
    fn of_new_object() -> Self;
    fn binary_op(op: BinaryOperator, left: &Self, right: &Self) -> Self;
    fn apply_non_null_constraint(&self) -> Self;
}

impl AbstractValue for lattice::Interval {
    fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Int(v) => lattice::Interval::of_literal(*v),
            _ => lattice::Interval::top(),
        }
    }

    fn of_new_object() -> Self {
        lattice::Interval::top()
    }

    fn binary_op(op: BinaryOperator, left: &Self, right: &Self) -> Self {
        match op {
            BinaryOperator::Add => left.add(right),
            BinaryOperator::Sub => left.subtract(right),
            BinaryOperator::Mul => left.multiply(right),
            BinaryOperator::Div => left.divide(right),
            BinaryOperator::Mod => left.modulo(right),
            _ => lattice::Interval::top(),
        }
    }

    fn apply_non_null_constraint(&self) -> Self {
        self.clone()
    }
}

impl AbstractValue for lattice::Nullability {
    fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Null => lattice::Nullability::DefinitelyNull,
            _ => lattice::Nullability::DefinitelyNonNull,
        }
    }

    fn of_new_object() -> Self {
        lattice::Nullability::DefinitelyNonNull
    }

    fn binary_op(_op: BinaryOperator, _left: &Self, _right: &Self) -> Self {
        lattice::Nullability::DefinitelyNonNull
    }

    fn apply_non_null_constraint(&self) -> Self {
        lattice::Nullability::apply_non_null_constraint(self)
    }
}

impl AbstractValue for lattice::Combined {
    fn of_literal(lit: &Literal) -> Self {
        lattice::Combined::new(lattice::Interval::of_literal(lit), lattice::Nullability::of_literal(lit))
    }

    fn of_new_object() -> Self {
        lattice::Combined::new(lattice::Interval::of_new_object(), lattice::Nullability::of_new_object())
    }

    fn binary_op(op: BinaryOperator, left: &Self, right: &Self) -> Self {
        lattice::Combined::new(
            lattice::Interval::binary_op(op, &left.interval, &right.interval),
            lattice::Nullability::binary_op(op, &left.nullability, &right.nullability),
        )
    }

    fn apply_non_null_constraint(&self) -> Self {
        lattice::Combined::new(self.interval.clone(), self.nullability.apply_non_null_constraint())
    }
}

/// Per-block analysis state: missing keys are ⊥, never ⊤.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisState<D: Lattice> {
    values: FxHashMap<Variable, D>,
}

impl<D: Lattice> AnalysisState<D> {
    pub fn empty() -> Self {
        AnalysisState { values: FxHashMap::default() }
    }

    pub fn get(&self, var: &Variable) -> D {
        self.values.get(var).cloned().unwrap_or_else(D::bottom)
    }

    pub fn set(&mut self, var: Variable, value: D) {
        self.values.insert(var, value);
    }

    pub fn join(&self, other: &Self) -> Self {
        let mut merged = self.values.clone();
        for (var, value) in &other.values {
            merged
                .entry(var.clone())
                .and_modify(|existing| *existing = existing.join(value))
                .or_insert_with(|| value.clone());
        }
        AnalysisState { values: merged }
    }

    pub fn widen(&self, other: &Self) -> Self {
        let mut merged = self.values.clone();
        for (var, value) in &other.values {
            merged.entry(var.clone()).and_modify(|existing| *existing = existing.widen(value)).or_insert_with(|| value.clone());
        }
        AnalysisState { values: merged }
    }

    pub fn narrow(&self, other: &Self) -> Self {
        let mut merged = self.values.clone();
        for (var, value) in &other.values {
            merged.entry(var.clone()).and_modify(|existing| *existing = existing.narrow(value)).or_insert_with(|| value.clone());
        }
        AnalysisState { values: merged }
    }
}

fn evaluate_value<D: AbstractValue>(state: &AnalysisState<D>, value: &Value) -> D {
    match value {
        Value::Constant(lit) => D::of_literal(lit),
        Value::VariableRef(var) => state.get(var),
        Value::BinaryOp { op, left, right } => D::binary_op(*op, &evaluate_value(state, left), &evaluate_value(state, right)),
        Value::UnaryOp { .. } => D::top(),
        Value::NewObject { .. } => D::of_new_object(),
        Value::Call { .. } | Value::FieldAccess { .. } | Value::IndexAccess { .. } | Value::Phi(_) => D::top(),
    }
}

fn transfer_instruction<D: AbstractValue>(state: &mut AnalysisState<D>, instr: &Instruction) {
    match instr {
        Instruction::Assign { target, value, .. } => {
            let v = evaluate_value(state, value);
            state.set(target.clone(), v);
        }
        Instruction::NullCheck { operand, result, .. } => {
            let v = evaluate_value(state, operand).apply_non_null_constraint();
            state.set(result.clone(), v);
        }
        Instruction::Cast { operand, result, .. } => {
            let v = evaluate_value(state, operand);
            state.set(result.clone(), v);
        }
        Instruction::Call { result: Some(r), .. }
        | Instruction::LoadField { result: r, .. }
        | Instruction::LoadIndex { result: r, .. }
        | Instruction::TypeCheck { result: r, .. }
        | Instruction::Await { result: r, .. } => {
            state.set(r.clone(), D::top());
        }
        // Phi targets are resolved at block-entry time from predecessor
        // exit states (see `Solver::entry_state`), not here.
        Instruction::Phi { .. }
        | Instruction::Call { result: None, .. }
        | Instruction::Branch { .. }
        | Instruction::Jump { .. }
        | Instruction::Return { .. }
        | Instruction::StoreField { .. }
        | Instruction::StoreIndex { .. }
        | Instruction::Throw { .. } => {}
    }
}

/// Result of analyzing one function: the state at the head and tail of
/// every block.
pub struct AnalysisResult<D: Lattice> {
    pub entry_states: FxHashMap<BlockId, AnalysisState<D>>,
    pub exit_states: FxHashMap<BlockId, AnalysisState<D>>,
    pub reached_max_iterations: bool,
}

/// Forward worklist solver. `widening_threshold` bounds how many times a
/// block may be re-analyzed with a strictly increasing exit state before
/// widening is forced; `max_iterations` is the global backstop.
pub struct Solver {
    pub widening_threshold: usize,
    pub max_iterations: usize,
}

impl Solver {
    /// Widening threshold fixed at 4: low enough that interval chains over
    /// typical loop bodies converge well before the global iteration cap,
    /// high enough to avoid widening away precision on short-lived loops.
    pub fn new() -> Self {
        Solver { widening_threshold: 4, max_iterations: 10_000 }
    }

    pub fn with_widening_threshold(mut self, threshold: usize) -> Self {
        self.widening_threshold = threshold;
        self
    }

    pub fn analyze<D: AbstractValue>(&self, cfg: &ControlFlowGraph, initial: AnalysisState<D>) -> AnalysisResult<D> {
        let mut exit_states: FxHashMap<BlockId, AnalysisState<D>> = FxHashMap::default();
        let mut entry_states: FxHashMap<BlockId, AnalysisState<D>> = FxHashMap::default();
        let mut visit_counts: FxHashMap<BlockId, usize> = FxHashMap::default();
        let mut queue: VecDeque<BlockId> = VecDeque::new();
        queue.push_back(cfg.entry);

        let mut iterations = 0usize;
        let mut reached_max_iterations = false;

        while let Some(block) = queue.pop_front() {
            iterations += 1;
            if iterations > self.max_iterations {
                reached_max_iterations = true;
                break;
            }

            let entry = self.entry_state(cfg, block, &initial, &exit_states);
            let mut working = entry.clone();
            for instr in &cfg.block(block).instructions {
                transfer_instruction(&mut working, instr);
            }

            entry_states.insert(block, entry);

            let differs = exit_states.get(&block).map(|prev| *prev != working).unwrap_or(true);
            if !differs {
                continue;
            }

            let count = visit_counts.entry(block).or_insert(0);
            *count += 1;
            let recorded = if *count > self.widening_threshold {
                match exit_states.get(&block) {
                    Some(prev) => prev.widen(&working),
                    None => working,
                }
            } else {
                working
            };
            exit_states.insert(block, recorded);

            for &succ in &cfg.block(block).successors {
                queue.push_back(succ);
            }
        }

        self.narrow_pass(cfg, &initial, &mut entry_states, &mut exit_states);

        AnalysisResult { entry_states, exit_states, reached_max_iterations }
    }

    fn entry_state<D: AbstractValue>(
        &self,
        cfg: &ControlFlowGraph,
        block: BlockId,
        initial: &AnalysisState<D>,
        exit_states: &FxHashMap<BlockId, AnalysisState<D>>,
    ) -> AnalysisState<D> {
        let preds = &cfg.block(block).predecessors;
        let mut entry = if block == cfg.entry {
            initial.clone()
        } else {
            let mut acc = AnalysisState::empty();
            for &pred in preds {
                if let Some(pred_exit) = exit_states.get(&pred) {
                    acc = acc.join(pred_exit);
                }
            }
            acc
        };

        if !preds.is_empty() {
            for instr in cfg.block(block).phis() {
                if let Instruction::Phi { target, operands, .. } = instr {
                    let mut acc = D::bottom();
                    for (pred, value) in operands {
                        if let Some(pred_exit) = exit_states.get(pred) {
                            acc = acc.join(&evaluate_value(pred_exit, value));
                        }
                    }
                    entry.set(target.clone(), acc);
                }
            }
        }

        entry
    }

    /// One extra pass computing `narrow(current, transferred)` per block to
    /// tighten bounds widening over-approximated.
    fn narrow_pass<D: AbstractValue>(
        &self,
        cfg: &ControlFlowGraph,
        initial: &AnalysisState<D>,
        entry_states: &mut FxHashMap<BlockId, AnalysisState<D>>,
        exit_states: &mut FxHashMap<BlockId, AnalysisState<D>>,
    ) {
        for block in cfg.reachable() {
            let entry = self.entry_state(cfg, block, initial, exit_states);
            let mut working = entry.clone();
            for instr in &cfg.block(block).instructions {
                transfer_instruction(&mut working, instr);
            }
            if let Some(prev) = exit_states.get(&block) {
                let narrowed = prev.narrow(&working);
                exit_states.insert(block, narrowed);
            }
            entry_states.insert(block, entry);
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::CfgBuilder;
    use lattice::Interval;

    #[test]
    fn constant_assignment_produces_exact_interval() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        b.assign(entry, "x", Value::int(7));
        b.ret(entry, None);
        let cfg = b.build();

        let solver = Solver::new();
        let result = solver.analyze::<Interval>(&cfg, AnalysisState::empty());
        let exit = &result.exit_states[&entry];
        assert_eq!(exit.get(&Variable::unversioned("x")), Interval::exact(7));
    }

    #[test]
    fn merge_joins_both_branch_intervals() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        let then_b = b.block();
        let else_b = b.block();
        let merge = b.block();
        b.branch(entry, Value::var("c"), then_b, else_b);
        b.assign(then_b, "x", Value::int(1));
        b.jump(then_b, merge);
        b.assign(else_b, "x", Value::int(10));
        b.jump(else_b, merge);
        b.ret(merge, None);
        let cfg = b.build();

        let solver = Solver::new();
        let result = solver.analyze::<Interval>(&cfg, AnalysisState::empty());
        let merge_entry = &result.entry_states[&merge];
        assert_eq!(merge_entry.get(&Variable::unversioned("x")), Interval::join(&Interval::exact(1), &Interval::exact(10)));
    }

    #[test]
    fn divide_by_interval_containing_zero_yields_top() {
        // Merge two branches assigning -1 and 1 to `divisor`, so its joined
        // interval at the merge point is [-1, 1] and contains zero.
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        let then_b = b.block();
        let else_b = b.block();
        let merge = b.block();
        b.branch(entry, Value::var("c"), then_b, else_b);
        b.assign(then_b, "divisor", Value::int(-1));
        b.jump(then_b, merge);
        b.assign(else_b, "divisor", Value::int(1));
        b.jump(else_b, merge);
        b.assign(
            merge,
            "q",
            Value::BinaryOp { op: BinaryOperator::Div, left: Box::new(Value::int(10)), right: Box::new(Value::var("divisor")) },
        );
        b.ret(merge, None);
        let cfg = b.build();

        let solver = Solver::new();
        let result = solver.analyze::<Interval>(&cfg, AnalysisState::empty());
        let exit = &result.exit_states[&merge];
        assert_eq!(exit.get(&Variable::unversioned("q")), Interval::top());
    }

    #[test]
    fn widening_terminates_on_unbounded_loop_increment() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        let header = b.block();
        let body = b.block();
        let exit_b = b.block();
        b.assign(entry, "i", Value::int(0));
        b.jump(entry, header);
        b.branch(header, Value::var("cond"), body, exit_b);
        b.assign(body, "i", Value::BinaryOp { op: BinaryOperator::Add, left: Box::new(Value::var("i")), right: Box::new(Value::int(1)) });
        b.jump(body, header);
        b.ret(exit_b, None);
        let cfg = b.build();

        let solver = Solver::new();
        let result = solver.analyze::<Interval>(&cfg, AnalysisState::empty());
        assert!(!result.reached_max_iterations);
    }
}
