//! Exercises the full source-to-facts pipeline (parsed AST -> CFG -> SSA ->
//! relational facts -> Datalog fixed point) as one path, rather than
//! hand-assembling EDB tuples directly as the per-module unit tests do.

use anteater::cfg_builder::CfgBuilder;
use anteater::datalog::rules::default_rules;
use anteater::datalog::DatalogEngine;
use anteater::facts::{Fact, FactExtractor, FactValue};
use anteater::ir::builders::CfgBuilder as IrCfgBuilder;
use anteater::ir::{FileIr, FunctionIr, Instruction, Value};
use anteater::source_ast::{FunctionDecl, Stmt};
use anteater::ssa::SsaBuilder;

fn lower(decl: &FunctionDecl) -> FunctionIr {
    let mut builder = CfgBuilder::new();
    let mut function = builder.build_function(decl).expect("non-empty body produces a CFG");
    let mut ssa = SsaBuilder::new();
    for param in function.parameters.clone() {
        ssa.seed_parameter(function.cfg.entry, &param);
    }
    ssa.build(&mut function.cfg);
    function
}

fn decl(name: &str, body: Vec<Stmt>) -> FunctionDecl {
    FunctionDecl { qualified_name: name.to_string(), parameters: vec![], body, source_file: "f.dart".to_string(), start_offset: 0, end_offset: 100 }
}

#[test]
fn allocation_then_copy_produces_exactly_the_expected_points_to_set() {
    // x = Widget(); y = x;  -- mirrors EDB = {Assign(0,100), Alloc(100,"L#0"), Assign(1,0)}.
    let f = lower(&decl(
        "make",
        vec![
            Stmt::Assign { target: "x".to_string(), value: Value::NewObject { ty: "Widget".to_string(), ctor: None, args: vec![] } },
            Stmt::Assign { target: "y".to_string(), value: Value::var("x") },
            Stmt::Return(None),
        ],
    ));
    let mut file = FileIr::new("f.dart");
    file.functions.push(f);

    let mut extractor = FactExtractor::new();
    let facts = extractor.extract_file(&file);

    let mut engine = DatalogEngine::new(default_rules());
    engine.load_facts(facts);
    engine.run();

    let points_to = engine.query("VarPointsTo");
    assert_eq!(points_to.len(), 2, "expected exactly x and y to point to the one allocation: {points_to:?}");
    for tuple in &points_to {
        assert!(matches!(&tuple[1], FactValue::Str(h) if h.starts_with("Widget#")));
    }
}

/// Builds `outer.inner = Inner(); inner.leaf = Leaf(); immutable = Immutable();`
/// directly against the IR (the generic `source_ast` contract has no
/// field-store statement of its own — a concrete front end would lower its
/// own field-assignment syntax to `Instruction::StoreField`).
fn build_deep_chain() -> FileIr {
    let mut b = IrCfgBuilder::new("build");
    let entry = b.entry();
    let outer = b.assign(entry, "outer", Value::NewObject { ty: "Outer".to_string(), ctor: None, args: vec![] });
    let inner = b.assign(entry, "inner", Value::NewObject { ty: "Inner".to_string(), ctor: None, args: vec![] });
    let leaf = b.assign(entry, "leaf", Value::NewObject { ty: "Leaf".to_string(), ctor: None, args: vec![] });
    let _immutable = b.assign(entry, "immutable", Value::NewObject { ty: "Immutable".to_string(), ctor: None, args: vec![] });
    b.ret(entry, None);
    let mut cfg = b.build();
    let tail = cfg.block_mut(entry).instructions.len() - 1; // before the Return
    cfg.block_mut(entry).instructions.insert(
        tail,
        Instruction::StoreField { base: Value::VariableRef(outer), field: "inner".to_string(), value: Value::VariableRef(inner.clone()), offset: 900 },
    );
    cfg.block_mut(entry).instructions.insert(
        tail + 1,
        Instruction::StoreField { base: Value::VariableRef(inner), field: "leaf".to_string(), value: Value::VariableRef(leaf), offset: 901 },
    );

    let mut file = FileIr::new("f.dart");
    file.functions.push(FunctionIr { qualified_name: "build".to_string(), cfg, parameters: vec![], source_file: "f.dart".to_string(), start_offset: 0, end_offset: 0 });
    file
}

#[test]
fn deep_field_chain_makes_every_container_mutable_but_leaves_the_untouched_allocation_immutable() {
    let file = build_deep_chain();

    let mut extractor = FactExtractor::new();
    let facts = extractor.extract_file(&file);
    let mut engine = DatalogEngine::new(default_rules());
    engine.load_facts(facts);
    engine.run();

    let mutable: std::collections::HashSet<_> = engine.query("Mutable").into_iter().map(|t| t[0].clone()).collect();
    let immutable_heaps: std::collections::HashSet<_> = engine.query("DeepImmutable").into_iter().map(|t| t[0].clone()).collect();

    assert!(mutable.iter().any(|h| matches!(h, FactValue::Str(s) if s.starts_with("Outer#"))));
    assert!(mutable.iter().any(|h| matches!(h, FactValue::Str(s) if s.starts_with("Inner#"))));
    assert!(mutable.iter().any(|h| matches!(h, FactValue::Str(s) if s.starts_with("Leaf#"))));

    assert!(immutable_heaps.iter().any(|h| matches!(h, FactValue::Str(s) if s.starts_with("Immutable#"))));
    assert!(immutable_heaps.is_disjoint(&mutable));
}

#[test]
fn tainted_copy_chain_reaching_a_sink_is_flagged_exactly_once() {
    let f = lower(&decl(
        "handle",
        vec![
            Stmt::Assign { target: "a".to_string(), value: Value::int(0) },
            Stmt::Assign { target: "b".to_string(), value: Value::var("a") },
            Stmt::Return(None),
        ],
    ));
    let mut file = FileIr::new("f.dart");
    file.functions.push(f);

    let mut extractor = FactExtractor::new();
    let mut facts = extractor.extract_file(&file);

    let assigns: Vec<_> = facts.iter().filter(|fct| fct.relation == "Assign").cloned().collect();
    assert_eq!(assigns.len(), 1, "only the b = a copy emits a relational Assign fact: {assigns:?}");
    let (FactValue::Int(sink_id), FactValue::Int(source_id)) = (assigns[0].tuple[0].clone(), assigns[0].tuple[1].clone()) else { panic!("expected ints") };

    facts.push(Fact { relation: "TaintSource".to_string(), tuple: vec![FactValue::Int(source_id), FactValue::Str("user_input".to_string())] });
    facts.push(Fact { relation: "TaintSink".to_string(), tuple: vec![FactValue::Int(sink_id), FactValue::Str("sql_query".to_string())] });

    let mut engine = DatalogEngine::new(default_rules());
    engine.load_facts(facts);
    engine.run();

    let violations = engine.query("TaintViolation");
    assert_eq!(
        violations,
        vec![vec![FactValue::Int(sink_id), FactValue::Int(source_id), FactValue::Str("user_input".to_string()), FactValue::Str("sql_query".to_string())]]
    );
}
