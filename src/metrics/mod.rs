//! Per-function and per-file software-quality metrics: cyclomatic and
//! cognitive complexity, Halstead volume/difficulty/effort, and a
//! maintainability index rolling them up.

use crate::ir::{FileIr, FunctionIr, Instruction};

/// Metrics for a single function/method/constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMetrics {
    pub qualified_name: String,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub halstead: HalsteadMetrics,
    pub maintainability_index: f64,
}

/// Halstead software-science metrics derived from distinct/total operator
/// and operand counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalsteadMetrics {
    pub distinct_operators: u32,
    pub distinct_operands: u32,
    pub total_operators: u32,
    pub total_operands: u32,
}

impl HalsteadMetrics {
    pub fn vocabulary(&self) -> u32 {
        self.distinct_operators + self.distinct_operands
    }

    pub fn length(&self) -> u32 {
        self.total_operators + self.total_operands
    }

    pub fn volume(&self) -> f64 {
        let vocabulary = self.vocabulary();
        if vocabulary == 0 {
            return 0.0;
        }
        f64::from(self.length()) * (f64::from(vocabulary)).log2()
    }

    pub fn difficulty(&self) -> f64 {
        if self.distinct_operands == 0 {
            return 0.0;
        }
        (f64::from(self.distinct_operators) / 2.0) * (f64::from(self.total_operands) / f64::from(self.distinct_operands))
    }

    pub fn effort(&self) -> f64 {
        self.volume() * self.difficulty()
    }
}

/// Cyclomatic complexity: `edges - nodes + 2` for a single-entry,
/// single-exit CFG, computed here directly from blocks/edges rather than
/// the decision-count shortcut, since the CFG is already built.
fn cyclomatic_complexity(function: &FunctionIr) -> u32 {
    let nodes = function.cfg.blocks.len() as i64;
    let edges: i64 = function.cfg.blocks.iter().map(|b| b.successors.len() as i64).sum();
    (edges - nodes + 2).max(1) as u32
}

/// Cognitive complexity: like cyclomatic, but nesting depth multiplies the
/// increment for each decision point, and boolean operators used for
/// short-circuiting each add one flat increment. Approximated here from
/// branch fan-out per block weighted by an estimated nesting depth via
/// reverse-postorder position, since the lowered CFG no longer carries
/// explicit AST nesting.
fn cognitive_complexity(function: &FunctionIr) -> u32 {
    let rpo = function.cfg.reverse_postorder();
    let mut complexity = 0u32;
    for (depth, &block_id) in rpo.iter().enumerate() {
        let block = function.cfg.block(block_id);
        let branch_count = block.instructions.iter().filter(|i| matches!(i, Instruction::Branch { .. })).count() as u32;
        if branch_count > 0 {
            let nesting_weight = 1 + (depth as u32 / 4).min(3);
            complexity += branch_count * nesting_weight;
        }
    }
    complexity
}

/// Distinct/total operator and operand counts over every instruction's
/// operator and variable/literal usage.
fn halstead(function: &FunctionIr) -> HalsteadMetrics {
    use std::collections::HashSet;

    let mut operators: HashSet<String> = HashSet::new();
    let mut operands: HashSet<String> = HashSet::new();
    let mut total_operators = 0u32;
    let mut total_operands = 0u32;

    fn visit_value(value: &crate::ir::Value, operators: &mut HashSet<String>, operands: &mut HashSet<String>, total_operators: &mut u32, total_operands: &mut u32) {
        match value {
            crate::ir::Value::Constant(lit) => {
                operands.insert(format!("{lit:?}"));
                *total_operands += 1;
            }
            crate::ir::Value::VariableRef(var) => {
                operands.insert(var.name.clone());
                *total_operands += 1;
            }
            crate::ir::Value::BinaryOp { op, left, right } => {
                operators.insert(format!("{op:?}"));
                *total_operators += 1;
                visit_value(left, operators, operands, total_operators, total_operands);
                visit_value(right, operators, operands, total_operators, total_operands);
            }
            crate::ir::Value::UnaryOp { op, operand } => {
                operators.insert(format!("{op:?}"));
                *total_operators += 1;
                visit_value(operand, operators, operands, total_operators, total_operands);
            }
            crate::ir::Value::Call { receiver, args, .. } => {
                operators.insert("call".to_string());
                *total_operators += 1;
                if let Some(r) = receiver {
                    visit_value(r, operators, operands, total_operators, total_operands);
                }
                for a in args {
                    visit_value(a, operators, operands, total_operators, total_operands);
                }
            }
            crate::ir::Value::FieldAccess { receiver, .. } => {
                operators.insert(".".to_string());
                *total_operators += 1;
                visit_value(receiver, operators, operands, total_operators, total_operands);
            }
            crate::ir::Value::IndexAccess { receiver, index } => {
                operators.insert("[]".to_string());
                *total_operators += 1;
                visit_value(receiver, operators, operands, total_operators, total_operands);
                visit_value(index, operators, operands, total_operators, total_operands);
            }
            crate::ir::Value::NewObject { ty, args, .. } => {
                operators.insert("new".to_string());
                *total_operators += 1;
                operands.insert(ty.clone());
                *total_operands += 1;
                for a in args {
                    visit_value(a, operators, operands, total_operators, total_operands);
                }
            }
            crate::ir::Value::Phi(var) => {
                operands.insert(var.name.clone());
                *total_operands += 1;
            }
        }
    }

    for block in &function.cfg.blocks {
        for instr in &block.instructions {
            operators.insert(instr_operator_name(instr));
            total_operators += 1;
            if let Some(target) = instr.defined_variable() {
                operands.insert(target.name.clone());
                total_operands += 1;
            }
            for value in instr_operand_values(instr) {
                visit_value(value, &mut operators, &mut operands, &mut total_operators, &mut total_operands);
            }
        }
    }

    HalsteadMetrics {
        distinct_operators: operators.len() as u32,
        distinct_operands: operands.len() as u32,
        total_operators,
        total_operands,
    }
}

fn instr_operator_name(instr: &Instruction) -> String {
    match instr {
        Instruction::Assign { .. } => "=",
        Instruction::Branch { .. } => "branch",
        Instruction::Jump { .. } => "jump",
        Instruction::Return { .. } => "return",
        Instruction::Call { .. } => "call",
        Instruction::LoadField { .. } => "load_field",
        Instruction::StoreField { .. } => "store_field",
        Instruction::LoadIndex { .. } => "load_index",
        Instruction::StoreIndex { .. } => "store_index",
        Instruction::NullCheck { .. } => "null_check",
        Instruction::Cast { .. } => "cast",
        Instruction::TypeCheck { .. } => "type_check",
        Instruction::Throw { .. } => "throw",
        Instruction::Await { .. } => "await",
        Instruction::Phi { .. } => "phi",
    }
    .to_string()
}

fn instr_operand_values(instr: &Instruction) -> Vec<&crate::ir::Value> {
    match instr {
        Instruction::Assign { value, .. } => vec![value],
        Instruction::Branch { cond, .. } => vec![cond],
        Instruction::Return { value: Some(v), .. } => vec![v],
        Instruction::Call { receiver, args, .. } => receiver.iter().chain(args.iter()).collect(),
        Instruction::LoadField { base, .. } => vec![base],
        Instruction::StoreField { base, value, .. } => vec![base, value],
        Instruction::LoadIndex { base, index, .. } => vec![base, index],
        Instruction::StoreIndex { base, index, value, .. } => vec![base, index, value],
        Instruction::NullCheck { operand, .. } => vec![operand],
        Instruction::Cast { operand, .. } => vec![operand],
        Instruction::TypeCheck { operand, .. } => vec![operand],
        Instruction::Throw { exception, .. } => vec![exception],
        Instruction::Await { future, .. } => vec![future],
        Instruction::Phi { operands, .. } => operands.iter().map(|(_, v)| v).collect(),
        Instruction::Jump { .. } | Instruction::Return { value: None, .. } => vec![],
    }
}

/// Standard Maintainability Index (Microsoft/Welker variant, without the
/// comment-percentage term since that requires source text we don't keep).
fn maintainability_index(halstead: &HalsteadMetrics, cyclomatic: u32, lines_of_code: u32) -> f64 {
    let volume = halstead.volume().max(1.0);
    let loc = (lines_of_code as f64).max(1.0);
    let raw = 171.0 - 5.2 * volume.ln() - 0.23 * f64::from(cyclomatic) - 16.2 * loc.ln();
    (raw * 100.0 / 171.0).clamp(0.0, 100.0)
}

impl FunctionMetrics {
    pub fn compute(function: &FunctionIr) -> Self {
        let h = halstead(function);
        let cyclomatic = cyclomatic_complexity(function);
        let lines_of_code = (function.end_offset.saturating_sub(function.start_offset)).max(1) as u32;
        FunctionMetrics {
            qualified_name: function.qualified_name.clone(),
            cyclomatic_complexity: cyclomatic,
            cognitive_complexity: cognitive_complexity(function),
            maintainability_index: maintainability_index(&h, cyclomatic, lines_of_code),
            halstead: h,
        }
    }
}

/// Aggregate metrics for every function in a file, plus file-level
/// averages.
#[derive(Debug, Clone, Default)]
pub struct FileMetrics {
    pub functions: Vec<FunctionMetrics>,
}

impl FileMetrics {
    pub fn compute(file: &FileIr) -> Self {
        FileMetrics { functions: file.all_functions().map(FunctionMetrics::compute).collect() }
    }

    pub fn average_cyclomatic_complexity(&self) -> f64 {
        if self.functions.is_empty() {
            return 0.0;
        }
        self.functions.iter().map(|f| f64::from(f.cyclomatic_complexity)).sum::<f64>() / self.functions.len() as f64
    }

    pub fn average_maintainability_index(&self) -> f64 {
        if self.functions.is_empty() {
            return 0.0;
        }
        self.functions.iter().map(|f| f.maintainability_index).sum::<f64>() / self.functions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::CfgBuilder;
    use crate::ir::Value;

    fn straight_line() -> FunctionIr {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        b.assign(entry, "x", Value::int(1));
        b.ret(entry, Some(Value::var("x")));
        FunctionIr { qualified_name: "f".to_string(), cfg: b.build(), parameters: vec![], source_file: "f.dart".to_string(), start_offset: 0, end_offset: 10 }
    }

    #[test]
    fn straight_line_function_has_cyclomatic_complexity_one() {
        let metrics = FunctionMetrics::compute(&straight_line());
        assert_eq!(metrics.cyclomatic_complexity, 1);
    }

    #[test]
    fn branching_function_has_higher_cyclomatic_complexity() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        let then_b = b.block();
        let else_b = b.block();
        let merge = b.block();
        b.branch(entry, Value::var("c"), then_b, else_b);
        b.assign(then_b, "x", Value::int(1));
        b.jump(then_b, merge);
        b.assign(else_b, "x", Value::int(2));
        b.jump(else_b, merge);
        b.ret(merge, Some(Value::var("x")));
        let function = FunctionIr { qualified_name: "f".to_string(), cfg: b.build(), parameters: vec![], source_file: "f.dart".to_string(), start_offset: 0, end_offset: 20 };
        let metrics = FunctionMetrics::compute(&function);
        assert!(metrics.cyclomatic_complexity > 1);
    }

    #[test]
    fn maintainability_index_is_clamped_to_0_100() {
        let metrics = FunctionMetrics::compute(&straight_line());
        assert!((0.0..=100.0).contains(&metrics.maintainability_index));
    }

    #[test]
    fn halstead_counts_distinct_operators_and_operands() {
        let metrics = FunctionMetrics::compute(&straight_line());
        assert!(metrics.halstead.distinct_operators > 0);
        assert!(metrics.halstead.distinct_operands > 0);
    }
}
