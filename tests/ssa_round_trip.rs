//! SSA-construction properties that don't fit inside `ssa::mod`'s per-case
//! unit tests: determinism across repeated builds, and idempotence when
//! re-running the builder over a CFG that is already in SSA form.

use anteater::cfg_builder::CfgBuilder;
use anteater::facts::FactExtractor;
use anteater::ir::{FileIr, FunctionIr, Value};
use anteater::source_ast::{FunctionDecl, Stmt};
use anteater::ssa::SsaBuilder;

fn diamond() -> FunctionDecl {
    FunctionDecl {
        qualified_name: "f".to_string(),
        parameters: vec![],
        body: vec![
            Stmt::If {
                cond: Value::var("c"),
                then_branch: vec![Stmt::Assign { target: "x".to_string(), value: Value::int(1) }],
                else_branch: vec![Stmt::Assign { target: "x".to_string(), value: Value::int(2) }],
            },
            Stmt::Return(Some(Value::var("x"))),
        ],
        source_file: "f.dart".to_string(),
        start_offset: 0,
        end_offset: 100,
    }
}

fn build_ssa_function() -> FunctionIr {
    let mut builder = CfgBuilder::new();
    let mut function = builder.build_function(&diamond()).unwrap();
    SsaBuilder::new().build(&mut function.cfg);
    function
}

#[test]
fn phi_target_set_is_reproducible_across_independent_builds() {
    let a = build_ssa_function();
    let b = build_ssa_function();

    let phi_targets = |f: &FunctionIr| -> Vec<String> {
        let mut names: Vec<String> = f
            .cfg
            .blocks
            .iter()
            .flat_map(|block| &block.instructions)
            .filter_map(|instr| match instr {
                anteater::ir::Instruction::Phi { target, .. } => Some(format!("{}@{:?}", target.name, target.version)),
                _ => None,
            })
            .collect();
        names.sort();
        names
    };

    assert_eq!(phi_targets(&a), phi_targets(&b));
    assert!(!phi_targets(&a).is_empty(), "the merge block should carry a real phi for x");
}

#[test]
fn reapplying_the_builder_to_already_ssa_form_emits_no_new_facts() {
    let function = build_ssa_function();
    let mut file = FileIr::new("f.dart");
    file.functions.push(function);

    let mut extractor = FactExtractor::new();
    let facts_before = extractor.extract_file(&file);

    // Re-run SSA construction on the already-SSA CFG. Every use is already
    // versioned, so `read_variable` never needs to insert a fresh phi.
    for f in &mut file.functions {
        SsaBuilder::new().build(&mut f.cfg);
    }

    let mut extractor = FactExtractor::new();
    let facts_after = extractor.extract_file(&file);

    assert_eq!(facts_before.len(), facts_after.len());
    let mut before_sorted = facts_before;
    let mut after_sorted = facts_after;
    before_sorted.sort_by_key(|f| format!("{f:?}"));
    after_sorted.sort_by_key(|f| format!("{f:?}"));
    assert_eq!(before_sorted, after_sorted);
}

/// `i = 0; while (c) { i = i + 1; }` built directly against the IR (a
/// `while` condition re-check isn't needed here — only the header/body/exit
/// shape and the back-edge matter for sealing order).
fn build_loop_function() -> FunctionIr {
    let mut b = anteater::ir::builders::CfgBuilder::new("f");
    let entry = b.entry();
    let header = b.block();
    let body = b.block();
    let exit_b = b.block();
    b.assign(entry, "i", Value::int(0));
    b.jump(entry, header);
    b.branch(header, Value::var("c"), body, exit_b);
    b.assign(body, "i", Value::BinaryOp { op: anteater::ir::BinaryOperator::Add, left: Box::new(Value::var("i")), right: Box::new(Value::int(1)) });
    b.jump(body, header);
    b.ret(exit_b, None);
    let mut cfg = b.build();
    anteater::ssa::SsaBuilder::new().build(&mut cfg);
    FunctionIr { qualified_name: "f".to_string(), cfg, parameters: vec![], source_file: "f.dart".to_string(), start_offset: 0, end_offset: 0 }
}

#[test]
fn loop_header_phi_back_edge_operand_is_the_body_redefinition_not_itself() {
    let function = build_loop_function();

    // Find the header: the block whose phi has two operands, one from the
    // preheader (entry) and one from the body (the back edge).
    let header_phi = function
        .cfg
        .blocks
        .iter()
        .find_map(|block| {
            block.instructions.iter().find_map(|instr| match instr {
                anteater::ir::Instruction::Phi { target, operands, .. } if target.name == "i" && operands.len() == 2 => Some((block.id, target.clone(), operands.clone())),
                _ => None,
            })
        })
        .expect("the loop header should carry a phi for the loop-carried variable");

    let (header_id, phi_target, operands) = header_phi;

    // The back-edge operand must come from the body block, and it must be a
    // *different* SSA name than the phi's own target — i.e. the real
    // `i = i + 1` redefinition, not the phi collapsing onto itself.
    let back_edge_operand = operands
        .iter()
        .find(|(pred, _)| *pred != function.cfg.entry && *pred != header_id)
        .map(|(_, value)| value.clone())
        .expect("one phi operand should come from the loop body");

    match back_edge_operand {
        Value::VariableRef(var) => {
            assert_eq!(var.name, "i");
            assert_ne!(var, phi_target, "the header phi's back-edge operand must be the body's redefinition, not a self-reference");
        }
        other => panic!("expected the back-edge operand to be a variable reference, got {other:?}"),
    }
}

#[test]
fn every_ssa_name_has_exactly_one_definition() {
    let function = build_ssa_function();
    let mut seen = std::collections::HashSet::new();
    for block in &function.cfg.blocks {
        for instr in &block.instructions {
            if let Some(var) = instr.defined_variable() {
                assert!(seen.insert(var.clone()), "{var:?} is defined more than once");
            }
        }
    }
}
