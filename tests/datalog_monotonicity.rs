//! Confluence and monotonicity of the stratified Datalog engine over
//! randomly generated `Assign`/`Alloc` edge sets, using `proptest` rather
//! than the fixed scenarios already covered in `datalog::rules`'s unit
//! tests.

use std::collections::HashSet;

use anteater::datalog::rules::default_rules;
use anteater::datalog::DatalogEngine;
use anteater::facts::{Fact, FactValue};
use proptest::prelude::*;

fn assign_chain_facts(pairs: &[(i64, i64)]) -> Vec<Fact> {
    pairs.iter().map(|&(to, from)| Fact { relation: "Assign".to_string(), tuple: vec![FactValue::Int(to), FactValue::Int(from)] }).collect()
}

fn run_points_to(facts: Vec<Fact>) -> HashSet<Vec<FactValue>> {
    let mut engine = DatalogEngine::new(default_rules());
    engine.load_facts(facts);
    engine.run();
    engine.query("VarPointsTo").into_iter().collect()
}

proptest! {
    /// Two independent runs over identical EDB and rule set produce
    /// identical IDB, up to tuple-set equality.
    #[test]
    fn confluence_over_random_assign_chains(
        pairs in prop::collection::vec((0i64..20, 0i64..20), 0..30),
    ) {
        let mut facts = assign_chain_facts(&pairs);
        facts.push(Fact { relation: "Alloc".to_string(), tuple: vec![FactValue::Int(0), FactValue::Str("Seed#0".to_string())] });

        let a = run_points_to(facts.clone());
        let b = run_points_to(facts);
        prop_assert_eq!(a, b);
    }

    /// Adding EDB facts never removes a previously derivable IDB tuple.
    #[test]
    fn monotonicity_adding_facts_never_shrinks_points_to(
        pairs in prop::collection::vec((0i64..20, 0i64..20), 0..20),
        extra in prop::collection::vec((0i64..20, 0i64..20), 0..10),
    ) {
        let mut base = assign_chain_facts(&pairs);
        base.push(Fact { relation: "Alloc".to_string(), tuple: vec![FactValue::Int(0), FactValue::Str("Seed#0".to_string())] });

        let mut extended = base.clone();
        extended.extend(assign_chain_facts(&extra));

        let before = run_points_to(base);
        let after = run_points_to(extended);
        prop_assert!(before.is_subset(&after));
    }
}

#[test]
fn engine_always_terminates_within_its_iteration_cap_on_a_cyclic_assign_graph() {
    // A self-referential copy cycle: Assign(1,2), Assign(2,1). Stratified
    // semi-naive evaluation must still reach a fixed point rather than
    // looping forever, since `VarPointsTo` tuples are bounded and
    // deduplicated by tuple equality.
    let mut engine = DatalogEngine::new(default_rules());
    engine.load_facts(vec![
        Fact { relation: "Assign".to_string(), tuple: vec![FactValue::Int(1), FactValue::Int(2)] },
        Fact { relation: "Assign".to_string(), tuple: vec![FactValue::Int(2), FactValue::Int(1)] },
        Fact { relation: "Alloc".to_string(), tuple: vec![FactValue::Int(1), FactValue::Str("Cyclic#0".to_string())] },
    ]);
    engine.run();
    assert!(!engine.reached_max_iterations());
}
