//! Fact extraction: a pure function from SSA CFGs to relational facts
//! consumed by the Datalog engine.
//!
//! Stateful only for fresh integer ids (variable id, heap allocation id);
//! extraction of one [`FunctionIr`] never looks at another's state except
//! through the shared [`VarIds`] interner, so the whole pass is a single
//! left-to-right walk with no backtracking.

use rustc_hash::FxHashMap;

use crate::ir::{FileIr, FunctionIr, Instruction, Value, Variable};

/// Canonicalizes [`Variable`]s to dense integer ids so facts can use
/// tuple-equality instead of string comparison.
#[derive(Debug, Default)]
pub struct VarIds {
    ids: FxHashMap<Variable, i64>,
    next: i64,
}

impl VarIds {
    pub fn new() -> Self {
        VarIds::default()
    }

    pub fn id_of(&mut self, var: &Variable) -> i64 {
        if let Some(&id) = self.ids.get(var) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(var.clone(), id);
        id
    }
}

/// One relational fact, tagged by relation name. Stored as `(String, tuple)`
/// rather than an enum per relation so the Datalog engine can treat EDB
/// relations uniformly without a match arm per fact kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FactValue {
    Int(i64),
    Str(String),
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        FactValue::Int(v)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Str(v.to_string())
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Str(v)
    }
}

pub type Tuple = Vec<FactValue>;

/// A named relation and its tuple, ready to load into the Datalog engine's
/// EDB.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub relation: String,
    pub tuple: Tuple,
}

impl Fact {
    fn new(relation: &str, tuple: Vec<FactValue>) -> Self {
        Fact { relation: relation.to_string(), tuple }
    }
}

/// Extracts facts for every function in a file. No facts are emitted for
/// control-flow-only instructions (jump, branch, return, throw, cast,
/// typecheck, nullcheck) — they carry no relational meaning.
pub struct FactExtractor {
    var_ids: VarIds,
    heap_counters: FxHashMap<String, u64>,
}

impl FactExtractor {
    pub fn new() -> Self {
        FactExtractor { var_ids: VarIds::new(), heap_counters: FxHashMap::default() }
    }

    pub fn extract_file(&mut self, file: &FileIr) -> Vec<Fact> {
        let mut facts = Vec::new();
        for function in file.all_functions() {
            self.extract_function(function, &mut facts);
        }
        facts
    }

    pub fn extract_function(&mut self, function: &FunctionIr, facts: &mut Vec<Fact>) {
        let cfg = &function.cfg;
        for block in &cfg.blocks {
            for &succ in &block.successors {
                facts.push(Fact::new("Flow", vec![(block.id as i64).into(), (succ as i64).into()]));
            }
        }
        facts.push(Fact::new("Reachable", vec![(cfg.entry as i64).into()]));

        for block in &cfg.blocks {
            for instr in &block.instructions {
                self.extract_instruction(instr, facts);
            }
        }
    }

    fn heap_id(&mut self, ty: &str, offset: usize) -> String {
        let counter = self.heap_counters.entry(ty.to_string()).or_insert(0);
        let id = format!("{ty}#{counter}");
        *counter += 1;
        let _ = offset; // offset distinguishes call sites but not heap identity
        id
    }

    fn extract_instruction(&mut self, instr: &Instruction, facts: &mut Vec<Fact>) {
        match instr {
            Instruction::Assign { target, value, offset } => self.extract_assign(target, value, *offset, facts),
            Instruction::Call { receiver, method, args, result, offset } => {
                let receiver_id = receiver.as_ref().and_then(Self::var_id_of_value).map(|v| self.var_ids.id_of(&v)).unwrap_or(-1);
                let result_id = result.as_ref().map(|r| self.var_ids.id_of(r)).unwrap_or(-1);
                facts.push(Fact::new(
                    "Call",
                    vec![(*offset as i64).into(), receiver_id.into(), method.clone().into(), result_id.into()],
                ));
                let _ = args;
            }
            Instruction::LoadField { base, field, result, offset } => {
                if let Some(base_var) = Self::var_id_of_value(base) {
                    let base_id = self.var_ids.id_of(&base_var);
                    let result_id = self.var_ids.id_of(result);
                    facts.push(Fact::new("LoadField", vec![base_id.into(), field.clone().into(), result_id.into()]));
                }
                let _ = offset;
            }
            Instruction::StoreField { base, field, value, offset } => {
                if let (Some(base_var), Some(value_var)) = (Self::var_id_of_value(base), Self::var_id_of_value(value)) {
                    let base_id = self.var_ids.id_of(&base_var);
                    let value_id = self.var_ids.id_of(&value_var);
                    facts.push(Fact::new("StoreField", vec![base_id.into(), field.clone().into(), value_id.into()]));
                }
                let _ = offset;
            }
            Instruction::LoadIndex { base, index, result, offset } => {
                if let Some(base_var) = Self::var_id_of_value(base) {
                    let base_id = self.var_ids.id_of(&base_var);
                    let result_id = self.var_ids.id_of(result);
                    facts.push(Fact::new("LoadField", vec![base_id.into(), "[]".into(), result_id.into()]));
                }
                let _ = (index, offset);
            }
            Instruction::StoreIndex { base, index, value, offset } => {
                if let (Some(base_var), Some(value_var)) = (Self::var_id_of_value(base), Self::var_id_of_value(value)) {
                    let base_id = self.var_ids.id_of(&base_var);
                    let value_id = self.var_ids.id_of(&value_var);
                    facts.push(Fact::new("StoreField", vec![base_id.into(), "[]".into(), value_id.into()]));
                }
                let _ = (index, offset);
            }
            Instruction::Await { future, result, offset } => {
                // Modeled as a copy: result receives whatever the future
                // points to once resolved.
                if let Some(future_var) = Self::var_id_of_value(future) {
                    let source_id = self.var_ids.id_of(&future_var);
                    let target_id = self.var_ids.id_of(result);
                    facts.push(Fact::new("Assign", vec![target_id.into(), source_id.into()]));
                }
                let _ = offset;
            }
            Instruction::Phi { target, operands, .. } => {
                let target_id = self.var_ids.id_of(target);
                for (_, operand) in operands {
                    if let Some(source_var) = Self::var_id_of_value(operand) {
                        let source_id = self.var_ids.id_of(&source_var);
                        facts.push(Fact::new("Assign", vec![target_id.into(), source_id.into()]));
                    }
                }
            }
            // Control-flow-only: no relational facts.
            Instruction::Branch { .. }
            | Instruction::Jump { .. }
            | Instruction::Return { .. }
            | Instruction::NullCheck { .. }
            | Instruction::Cast { .. }
            | Instruction::TypeCheck { .. }
            | Instruction::Throw { .. } => {}
        }
    }

    fn extract_assign(&mut self, target: &Variable, value: &Value, offset: usize, facts: &mut Vec<Fact>) {
        let target_id = self.var_ids.id_of(target);
        match value {
            Value::VariableRef(source) => {
                let source_id = self.var_ids.id_of(source);
                facts.push(Fact::new("Assign", vec![target_id.into(), source_id.into()]));
            }
            Value::NewObject { ty, .. } => {
                let heap = self.heap_id(ty, offset);
                facts.push(Fact::new("Assign", vec![target_id.into(), (offset as i64).into()]));
                facts.push(Fact::new("Alloc", vec![(offset as i64).into(), heap.into()]));
            }
            // Primitive binary/unary ops and other value shapes are not
            // heap-modeled: no facts.
            _ => {}
        }
    }

    fn var_id_of_value(value: &Value) -> Option<Variable> {
        match value {
            Value::VariableRef(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::CfgBuilder;
    use crate::ir::{ClassIr, Literal};

    fn wrap(cfg: crate::ir::ControlFlowGraph) -> FileIr {
        let mut file = FileIr::new("f.dart");
        file.functions.push(FunctionIr {
            qualified_name: cfg.function_name.clone(),
            cfg,
            parameters: vec![],
            source_file: "f.dart".to_string(),
            start_offset: 0,
            end_offset: 0,
        });
        let _ = ClassIr { name: String::new(), methods: vec![], fields: vec![] };
        file
    }

    #[test]
    fn assign_copy_emits_assign_fact() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        b.assign(entry, "y", Value::var("x"));
        b.ret(entry, None);
        let file = wrap(b.build());

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract_file(&file);
        assert!(facts.iter().any(|f| f.relation == "Assign"));
    }

    #[test]
    fn new_object_emits_assign_and_alloc() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        b.assign(entry, "obj", Value::NewObject { ty: "Widget".to_string(), ctor: None, args: vec![] });
        b.ret(entry, None);
        let file = wrap(b.build());

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract_file(&file);
        assert!(facts.iter().any(|f| f.relation == "Alloc"));
        assert!(facts.iter().any(|f| f.relation == "Assign"));
    }

    #[test]
    fn flow_facts_match_cfg_edges() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        let merge = b.block();
        b.jump(entry, merge);
        b.ret(merge, None);
        let file = wrap(b.build());

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract_file(&file);
        assert!(facts.iter().any(|f| f.relation == "Flow" && f.tuple == vec![FactValue::Int(0), FactValue::Int(1)]));
        assert!(facts.iter().any(|f| f.relation == "Reachable"));
    }

    #[test]
    fn primitive_binary_op_emits_no_facts() {
        let mut b = CfgBuilder::new("f");
        let entry = b.entry();
        b.assign(
            entry,
            "z",
            Value::BinaryOp { op: crate::ir::BinaryOperator::Add, left: Box::new(Value::int(1)), right: Box::new(Value::int(2)) },
        );
        b.ret(entry, None);
        let file = wrap(b.build());

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract_file(&file);
        assert!(!facts.iter().any(|f| f.relation == "Assign"));
        let _ = Literal::Null;
    }
}
