//! Built-in rule catalog: points-to, mutability, call graph, and taint
//! tracking over the facts [`crate::facts::FactExtractor`] produces.

use super::{BodyAtom, Rule, Term};

fn pos(relation: &str, terms: Vec<Term>) -> BodyAtom {
    BodyAtom::positive(relation, terms)
}

fn neg(relation: &str, terms: Vec<Term>) -> BodyAtom {
    BodyAtom::negative(relation, terms)
}

fn v(name: &str) -> Term {
    Term::var(name)
}

/// `VarPointsTo(v,h) ⟸ Assign(v,e), Alloc(e,h)`.
fn alloc_rule() -> Rule {
    Rule::new(
        "AllocRule",
        "VarPointsTo",
        vec![v("v"), v("h")],
        vec![pos("Assign", vec![v("v"), v("e")]), pos("Alloc", vec![v("e"), v("h")])],
    )
}

/// `VarPointsTo(v1,h) ⟸ Assign(v1,v2), VarPointsTo(v2,h)`.
fn copy_rule() -> Rule {
    Rule::new(
        "CopyRule",
        "VarPointsTo",
        vec![v("v1"), v("h")],
        vec![pos("Assign", vec![v("v1"), v("v2")]), pos("VarPointsTo", vec![v("v2"), v("h")])],
    )
}

/// `HeapPointsTo(b,f,h) ⟸ StoreField(b,f,s), VarPointsTo(b,hb), VarPointsTo(s,h)`.
fn store_field_rule() -> Rule {
    Rule::new(
        "StoreFieldRule",
        "HeapPointsTo",
        vec![v("hb"), v("f"), v("h")],
        vec![
            pos("StoreField", vec![v("b"), v("f"), v("s")]),
            pos("VarPointsTo", vec![v("b"), v("hb")]),
            pos("VarPointsTo", vec![v("s"), v("h")]),
        ],
    )
}

/// `VarPointsTo(t,h) ⟸ LoadField(b,f,t), VarPointsTo(b,hb), HeapPointsTo(hb,f,h)`.
fn load_field_rule() -> Rule {
    Rule::new(
        "LoadFieldRule",
        "VarPointsTo",
        vec![v("t"), v("h")],
        vec![
            pos("LoadField", vec![v("b"), v("f"), v("t")]),
            pos("VarPointsTo", vec![v("b"), v("hb")]),
            pos("HeapPointsTo", vec![v("hb"), v("f"), v("h")]),
        ],
    )
}

/// `Reachable(to) ⟸ Reachable(from), Flow(from,to)`.
fn reachability_rule() -> Rule {
    Rule::new(
        "ReachabilityRule",
        "Reachable",
        vec![v("to")],
        vec![pos("Reachable", vec![v("from")]), pos("Flow", vec![v("from"), v("to")])],
    )
}

/// `Mutable(h) ⟸ StoreField(b,_,_), VarPointsTo(b,h)`.
fn mutability_rule() -> Rule {
    Rule::new(
        "MutabilityRule",
        "Mutable",
        vec![v("h")],
        vec![pos("StoreField", vec![v("b"), v("_f"), v("_s")]), pos("VarPointsTo", vec![v("b"), v("h")])],
    )
}

/// `Mutable(h) ⟸ HeapPointsTo(h,_,h'), Mutable(h')`.
fn transitive_mutability_rule() -> Rule {
    Rule::new(
        "TransitiveMutabilityRule",
        "Mutable",
        vec![v("h")],
        vec![pos("HeapPointsTo", vec![v("h"), v("_f"), v("hp")]), pos("Mutable", vec![v("hp")])],
    )
}

/// `CallGraph(site,m) ⟸ Call(site,r,m,_), VarPointsTo(r,_)`.
fn call_graph_virtual_rule() -> Rule {
    Rule::new(
        "CallGraphRule",
        "CallGraph",
        vec![v("site"), v("m")],
        vec![pos("Call", vec![v("site"), v("r"), v("m"), v("_result")]), pos("VarPointsTo", vec![v("r"), v("_h")])],
    )
}

/// `Call(site,-1,m,_) ⇒ CallGraph(site,m)`: static calls always resolve,
/// no receiver points-to needed.
fn call_graph_static_rule() -> Rule {
    Rule::new(
        "CallGraphStaticRule",
        "CallGraph",
        vec![v("site"), v("m")],
        vec![pos("Call", vec![v("site"), Term::int(-1), v("m"), v("_result")])],
    )
}

/// `DeepImmutable(h) ⟸ Alloc(_,h), ¬Mutable(h)`. Stratum 1: depends
/// negatively on `Mutable`, which must be fully computed in stratum 0 first.
fn immutability_rule() -> Rule {
    Rule::new("ImmutabilityRule", "DeepImmutable", vec![v("h")], vec![pos("Alloc", vec![v("_e"), v("h")]), neg("Mutable", vec![v("h")])])
}

/// `TaintedVar(v,v,ℓ) ⟸ TaintSource(v,ℓ)`.
fn taint_source_rule() -> Rule {
    Rule::new("TaintSourceRule", "TaintedVar", vec![v("v"), v("v"), v("l")], vec![pos("TaintSource", vec![v("v"), v("l")])])
}

/// `TaintedVar(t,s,ℓ) ⟸ Assign(t,f), TaintedVar(f,s,ℓ)`.
fn taint_propagation_rule() -> Rule {
    Rule::new(
        "TaintPropagationRule",
        "TaintedVar",
        vec![v("t"), v("s"), v("l")],
        vec![pos("Assign", vec![v("t"), v("f")]), pos("TaintedVar", vec![v("f"), v("s"), v("l")])],
    )
}

/// `TaintedHeap(hb,f,s,ℓ) ⟸ StoreField(b,f,sv), VarPointsTo(b,hb), TaintedVar(sv,s,ℓ)`.
fn taint_store_rule() -> Rule {
    Rule::new(
        "TaintStoreRule",
        "TaintedHeap",
        vec![v("hb"), v("f"), v("s"), v("l")],
        vec![
            pos("StoreField", vec![v("b"), v("f"), v("sv")]),
            pos("VarPointsTo", vec![v("b"), v("hb")]),
            pos("TaintedVar", vec![v("sv"), v("s"), v("l")]),
        ],
    )
}

/// `TaintedVar(t,s,ℓ) ⟸ LoadField(b,f,t), VarPointsTo(b,hb), TaintedHeap(hb,f,s,ℓ)`.
fn taint_load_rule() -> Rule {
    Rule::new(
        "TaintLoadRule",
        "TaintedVar",
        vec![v("t"), v("s"), v("l")],
        vec![
            pos("LoadField", vec![v("b"), v("f"), v("t")]),
            pos("VarPointsTo", vec![v("b"), v("hb")]),
            pos("TaintedHeap", vec![v("hb"), v("f"), v("s"), v("l")]),
        ],
    )
}

/// `TaintViolation(sink,src,ℓt,ℓs) ⟸ TaintSink(sink,ℓs), TaintedVar(sink,src,ℓt)`.
fn taint_violation_rule() -> Rule {
    Rule::new(
        "TaintViolationRule",
        "TaintViolation",
        vec![v("sink"), v("src"), v("lt"), v("ls")],
        vec![pos("TaintSink", vec![v("sink"), v("ls")]), pos("TaintedVar", vec![v("sink"), v("src"), v("lt")])],
    )
}

/// The full built-in catalog, in the order the system overview lists it.
/// Stratum assignment is derived automatically from negation dependencies
/// (see [`super::stratify`]) — callers never need to assign strata by hand.
pub fn default_rules() -> Vec<Rule> {
    vec![
        alloc_rule(),
        copy_rule(),
        store_field_rule(),
        load_field_rule(),
        reachability_rule(),
        mutability_rule(),
        transitive_mutability_rule(),
        call_graph_virtual_rule(),
        call_graph_static_rule(),
        immutability_rule(),
        taint_source_rule(),
        taint_propagation_rule(),
        taint_store_rule(),
        taint_load_rule(),
        taint_violation_rule(),
    ]
}
