//! Lint-rule registry: each rule visits a [`SourceFile`] and emits zero or
//! more [`Violation`]s; severities and per-rule excludes are applied by the
//! registry, not by individual rules.

use std::collections::HashSet;

use globset::Glob;

use crate::source_ast::{FunctionDecl, SourceFile, Stmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub rule_id: String,
    pub file: String,
    pub message: String,
    pub severity: Severity,
}

/// A single lint rule. Stateless: all configuration (severity, excludes) is
/// applied externally by the [`RuleRegistry`], so `check` only ever reports
/// facts about the code.
pub trait LintRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn check(&self, file: &SourceFile) -> Vec<String>;
}

/// Per-rule configuration: overridden severity and file-glob excludes.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub severity: Severity,
    pub exclude: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig { severity: Severity::Warning, exclude: Vec::new() }
    }
}

/// Registers rules in insertion order and applies each rule's effective
/// configuration when running. Evaluation order within the registry does
/// not affect the result set, only insertion order of registration itself.
pub struct RuleRegistry {
    rules: Vec<Box<dyn LintRule>>,
    configs: std::collections::HashMap<String, RuleConfig>,
    enabled: HashSet<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistry { rules: Vec::new(), configs: std::collections::HashMap::new(), enabled: HashSet::new() }
    }

    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        self.enabled.insert(rule.id().to_string());
        self.rules.push(rule);
    }

    pub fn configure(&mut self, rule_id: impl Into<String>, config: RuleConfig) {
        self.configs.insert(rule_id.into(), config);
    }

    pub fn disable(&mut self, rule_id: &str) {
        self.enabled.remove(rule_id);
    }

    fn excluded(&self, rule_id: &str, file_path: &str) -> bool {
        let Some(config) = self.configs.get(rule_id) else { return false };
        config.exclude.iter().any(|pattern| {
            Glob::new(pattern).map(|g| g.compile_matcher().is_match(file_path)).unwrap_or(false)
        })
    }

    fn severity_for(&self, rule_id: &str) -> Severity {
        self.configs.get(rule_id).map(|c| c.severity).unwrap_or(Severity::Warning)
    }

    /// Runs every enabled rule against `file`. A rule that isn't excluded
    /// for this file contributes its violations at its configured (or
    /// default) severity. A rule that panics-worthy would instead be
    /// demoted to a synthetic warning by the caller (see
    /// [`crate::project::ProjectAnalyzer`]); this method itself assumes
    /// `check` always returns normally.
    pub fn run(&self, file: &SourceFile) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            if !self.enabled.contains(rule.id()) {
                continue;
            }
            if self.excluded(rule.id(), &file.path) {
                continue;
            }
            let severity = self.severity_for(rule.id());
            for message in rule.check(file) {
                violations.push(Violation { rule_id: rule.id().to_string(), file: file.path.clone(), message, severity });
            }
        }
        violations
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(EmptyCatchRule));
        registry.register(Box::new(DeepNestingRule::default()));
        registry.register(Box::new(TooManyParametersRule::default()));
        registry.register(Box::new(UnusedCatchVariableRule));
        registry
    }
}

fn walk_stmts<'a>(stmts: &'a [Stmt], depth: u32, visit: &mut impl FnMut(&'a Stmt, u32)) {
    for stmt in stmts {
        visit(stmt, depth);
        match stmt {
            Stmt::If { then_branch, else_branch, .. } => {
                walk_stmts(then_branch, depth + 1, visit);
                walk_stmts(else_branch, depth + 1, visit);
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::ForIn { body, .. } => {
                walk_stmts(body, depth + 1, visit);
            }
            Stmt::For { body, .. } => walk_stmts(body, depth + 1, visit),
            Stmt::TryCatchFinally { try_block, catch_blocks, finally_block } => {
                walk_stmts(try_block, depth + 1, visit);
                for catch in catch_blocks {
                    walk_stmts(catch, depth + 1, visit);
                }
                walk_stmts(finally_block, depth + 1, visit);
            }
            Stmt::Switch { cases, .. } => {
                for case in cases {
                    walk_stmts(&case.body, depth + 1, visit);
                }
            }
            _ => {}
        }
    }
}

fn all_functions(file: &SourceFile) -> impl Iterator<Item = &FunctionDecl> {
    file.functions.iter().chain(file.classes.iter().flat_map(|c| c.methods.iter()))
}

/// Flags `catch` blocks with an empty body: swallowed exceptions are a
/// common source of silent failures.
pub struct EmptyCatchRule;

impl LintRule for EmptyCatchRule {
    fn id(&self) -> &'static str {
        "empty-catch"
    }

    fn check(&self, file: &SourceFile) -> Vec<String> {
        let mut messages = Vec::new();
        for function in all_functions(file) {
            walk_stmts(&function.body, 0, &mut |stmt, _depth| {
                if let Stmt::TryCatchFinally { catch_blocks, .. } = stmt {
                    for catch in catch_blocks {
                        if catch.is_empty() {
                            messages.push(format!("empty catch block in `{}`", function.qualified_name));
                        }
                    }
                }
            });
        }
        messages
    }
}

/// Flags statements nested deeper than `max_depth` levels.
pub struct DeepNestingRule {
    pub max_depth: u32,
}

impl Default for DeepNestingRule {
    fn default() -> Self {
        DeepNestingRule { max_depth: 5 }
    }
}

impl LintRule for DeepNestingRule {
    fn id(&self) -> &'static str {
        "deep-nesting"
    }

    fn check(&self, file: &SourceFile) -> Vec<String> {
        let mut messages = Vec::new();
        for function in all_functions(file) {
            let mut seen = false;
            walk_stmts(&function.body, 0, &mut |_stmt, depth| {
                if depth > self.max_depth && !seen {
                    messages.push(format!("`{}` nests deeper than {} levels", function.qualified_name, self.max_depth));
                    seen = true;
                }
            });
        }
        messages
    }
}

/// Flags functions declared with more than `max_parameters` parameters.
pub struct TooManyParametersRule {
    pub max_parameters: usize,
}

impl Default for TooManyParametersRule {
    fn default() -> Self {
        TooManyParametersRule { max_parameters: 4 }
    }
}

impl LintRule for TooManyParametersRule {
    fn id(&self) -> &'static str {
        "too-many-parameters"
    }

    fn check(&self, file: &SourceFile) -> Vec<String> {
        all_functions(file)
            .filter(|f| f.parameters.len() > self.max_parameters)
            .map(|f| format!("`{}` declares {} parameters (max {})", f.qualified_name, f.parameters.len(), self.max_parameters))
            .collect()
    }
}

/// Flags `catch` clauses that bind a variable but whose body never
/// references it by name — a common copy-paste artifact. Approximated via
/// a textual scan over the lowered [`crate::ir::Value`] tree isn't
/// available at the AST stage, so this rule only flags catches with a
/// single bare `Throw` re-raise and nothing else, the common "caught and
/// immediately rethrown unchanged" shape.
pub struct UnusedCatchVariableRule;

impl LintRule for UnusedCatchVariableRule {
    fn id(&self) -> &'static str {
        "unused-catch-variable"
    }

    fn check(&self, file: &SourceFile) -> Vec<String> {
        let mut messages = Vec::new();
        for function in all_functions(file) {
            walk_stmts(&function.body, 0, &mut |stmt, _depth| {
                if let Stmt::TryCatchFinally { catch_blocks, .. } = stmt {
                    for catch in catch_blocks {
                        if let [Stmt::Throw(_)] = catch.as_slice() {
                            messages.push(format!("catch in `{}` immediately rethrows", function.qualified_name));
                        }
                    }
                }
            });
        }
        messages
    }
}
