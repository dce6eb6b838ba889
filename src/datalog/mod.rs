//! Stratified, semi-naive Datalog engine over in-memory relations.
//!
//! An in-memory engine parameterized by a rule set, supporting EDB fact
//! loading and querying any relation (EDB ∪ IDB). Rules are partitioned
//! into strata so that negated relations are fully computed before any rule
//! negating them runs; within a stratum, rules are re-evaluated to a fixed
//! point — an iteration that derives nothing new ends the stratum.

pub mod rules;

use std::collections::{HashMap, HashSet};

use crate::facts::{Fact, FactValue, Tuple};

/// A term in a rule: either a logic variable bound by unification, or a
/// ground constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(String),
    Const(FactValue),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn int(v: i64) -> Self {
        Term::Const(FactValue::Int(v))
    }
}

/// One atom in a rule body: a relation name, its argument terms, and
/// whether it is negated. Negated atoms assume their variables are already
/// bound by earlier positive atoms — rule-safety is the catalog author's
/// responsibility, same as any hand-written Datalog program.
#[derive(Debug, Clone)]
pub struct BodyAtom {
    pub relation: String,
    pub terms: Vec<Term>,
    pub negated: bool,
}

impl BodyAtom {
    pub fn positive(relation: impl Into<String>, terms: Vec<Term>) -> Self {
        BodyAtom { relation: relation.into(), terms, negated: false }
    }

    pub fn negative(relation: impl Into<String>, terms: Vec<Term>) -> Self {
        BodyAtom { relation: relation.into(), terms, negated: true }
    }
}

/// `head :- body`. `stratum` is assigned by [`stratify`] from the rule's
/// dependencies, but built-in rules also carry an explicit minimum so
/// negated rules never sneak into stratum 0.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub head_relation: String,
    pub head_terms: Vec<Term>,
    pub body: Vec<BodyAtom>,
}

impl Rule {
    pub fn new(name: &'static str, head_relation: impl Into<String>, head_terms: Vec<Term>, body: Vec<BodyAtom>) -> Self {
        Rule { name, head_relation: head_relation.into(), head_terms, body }
    }
}

/// `fresh → loaded → running → fixedPoint | reachedCap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Fresh,
    Loaded,
    Running,
    FixedPoint,
    ReachedCap,
}

const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// In-memory Datalog engine. Relations store EDB and IDB tuples together,
/// deduplicated by tuple equality, so `query` never needs to distinguish
/// the two.
pub struct DatalogEngine {
    relations: HashMap<String, HashSet<Tuple>>,
    rules: Vec<Rule>,
    max_iterations: usize,
    total_iterations: usize,
    reached_max_iterations: bool,
    state: EngineState,
}

impl DatalogEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        DatalogEngine {
            relations: HashMap::new(),
            rules,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            total_iterations: 0,
            reached_max_iterations: false,
            state: EngineState::Fresh,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn total_iterations(&self) -> usize {
        self.total_iterations
    }

    pub fn reached_max_iterations(&self) -> bool {
        self.reached_max_iterations
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Load EDB facts. Does not reset previously derived IDB tuples — call
    /// [`Self::clear`] first for a clean run.
    pub fn load_facts(&mut self, facts: impl IntoIterator<Item = Fact>) {
        for fact in facts {
            self.relations.entry(fact.relation).or_default().insert(fact.tuple);
        }
        self.state = EngineState::Loaded;
    }

    /// Reset both EDB and IDB. Rules and `max_iterations` are untouched.
    pub fn clear(&mut self) {
        self.relations.clear();
        self.total_iterations = 0;
        self.reached_max_iterations = false;
        self.state = EngineState::Fresh;
    }

    /// `query(relation) → list<tuple>`: EDB ∪ IDB for that relation.
    pub fn query(&self, relation: &str) -> Vec<Tuple> {
        self.relations.get(relation).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    /// Run every stratum to a fixed point, ascending by stratum id.
    pub fn run(&mut self) {
        self.state = EngineState::Running;
        let strata = stratify(&self.rules);

        'strata: for stratum_rules in &strata {
            loop {
                if self.total_iterations >= self.max_iterations {
                    self.reached_max_iterations = true;
                    break 'strata;
                }
                self.total_iterations += 1;

                let mut added_any = false;
                for rule in stratum_rules {
                    let derived = eval_rule(rule, &self.relations);
                    let relation = self.relations.entry(rule.head_relation.clone()).or_default();
                    for tuple in derived {
                        if relation.insert(tuple) {
                            added_any = true;
                        }
                    }
                }
                if !added_any {
                    break;
                }
            }
        }

        self.state = if self.reached_max_iterations { EngineState::ReachedCap } else { EngineState::FixedPoint };
    }
}

/// Assign each rule a stratum such that every positive dependency is
/// satisfied at the same or a lower stratum, and every negative dependency
/// is satisfied at a strictly lower stratum. Iterative fixed-point over the
/// per-relation stratum map, bounded by relation count (programs reaching
/// that bound are not stratifiable and negation would be unsafe — the
/// built-in catalog never does this).
fn stratify(rules: &[Rule]) -> Vec<Vec<Rule>> {
    let mut relation_stratum: HashMap<String, usize> = HashMap::new();
    let relations: HashSet<&str> =
        rules.iter().flat_map(|r| std::iter::once(r.head_relation.as_str()).chain(r.body.iter().map(|a| a.relation.as_str()))).collect();
    for r in &relations {
        relation_stratum.insert(r.to_string(), 0);
    }

    let bound = relations.len().max(1) + 1;
    for _ in 0..bound {
        let mut changed = false;
        for rule in rules {
            let mut required = 0usize;
            for atom in &rule.body {
                let dep = *relation_stratum.get(&atom.relation).unwrap_or(&0);
                required = required.max(if atom.negated { dep + 1 } else { dep });
            }
            let current = relation_stratum.entry(rule.head_relation.clone()).or_insert(0);
            if required > *current {
                *current = required;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let max_stratum = relation_stratum.values().copied().max().unwrap_or(0);
    let mut strata: Vec<Vec<Rule>> = (0..=max_stratum).map(|_| Vec::new()).collect();
    for rule in rules {
        let stratum = relation_stratum[&rule.head_relation];
        strata[stratum].push(rule.clone());
    }
    strata
}

fn eval_rule(rule: &Rule, relations: &HashMap<String, HashSet<Tuple>>) -> Vec<Tuple> {
    let mut results = Vec::new();
    let mut subs = HashMap::new();
    eval_body(&rule.body, 0, &mut subs, relations, &rule.head_terms, &mut results);
    results
}

fn eval_body(
    body: &[BodyAtom],
    idx: usize,
    subs: &mut HashMap<String, FactValue>,
    relations: &HashMap<String, HashSet<Tuple>>,
    head_terms: &[Term],
    results: &mut Vec<Tuple>,
) {
    if idx == body.len() {
        results.push(head_terms.iter().map(|t| resolve(t, subs)).collect());
        return;
    }
    let atom = &body[idx];
    if atom.negated {
        let tuple: Tuple = atom.terms.iter().map(|t| resolve(t, subs)).collect();
        let present = relations.get(&atom.relation).is_some_and(|set| set.contains(&tuple));
        if !present {
            eval_body(body, idx + 1, subs, relations, head_terms, results);
        }
        return;
    }
    let Some(set) = relations.get(&atom.relation) else { return };
    for tuple in set {
        let mut local = subs.clone();
        if unify(&atom.terms, tuple, &mut local) {
            eval_body(body, idx + 1, &mut local, relations, head_terms, results);
        }
    }
}

fn unify(terms: &[Term], tuple: &Tuple, subs: &mut HashMap<String, FactValue>) -> bool {
    if terms.len() != tuple.len() {
        return false;
    }
    for (term, value) in terms.iter().zip(tuple) {
        match term {
            Term::Var(name) => match subs.get(name) {
                Some(existing) if existing != value => return false,
                Some(_) => {}
                None => {
                    subs.insert(name.clone(), value.clone());
                }
            },
            Term::Const(c) => {
                if c != value {
                    return false;
                }
            }
        }
    }
    true
}

fn resolve(term: &Term, subs: &HashMap<String, FactValue>) -> FactValue {
    match term {
        Term::Var(name) => subs.get(name).cloned().unwrap_or(FactValue::Int(-1)),
        Term::Const(c) => c.clone(),
    }
}
