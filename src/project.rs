//! [`ProjectAnalyzer`]: the orchestrator tying the collaborator
//! subsystems and the core engines together. Walks a project root,
//! analyzes each file independently and in parallel (metrics, debt,
//! style, CFG/SSA lowering), then merges every file's extracted facts
//! into one project-wide Datalog run. Abstract interpretation runs
//! per-function on demand rather than as part of this pipeline, since its
//! consumers (bounds/null clients) query individual sites.

use rayon::prelude::*;

use crate::cfg_builder::CfgBuilder;
use crate::config::Config;
use crate::datalog::{rules::default_rules, DatalogEngine};
use crate::debt::{metric_debt_items, CommentScanner, DebtConfig, DebtItem};
use crate::facts::FactExtractor;
use crate::ir::{ClassIr, FileIr, FunctionIr};
use crate::metrics::FileMetrics;
use crate::source_ast::SourceFile;
use crate::ssa::SsaBuilder;
use crate::style::{RuleConfig, RuleRegistry, Severity as StyleSeverity, Violation};
use crate::walker::{DiscoveredFile, ExcludeSet, FileWalker};

/// Builds a [`RuleRegistry`] from `config.rules`. A bare string enables a
/// rule at its default severity; a `{id: {severity?, exclude?}}` entry
/// additionally overrides that rule's severity and/or per-rule excludes.
/// An empty `rules` list keeps every built-in rule enabled at its default.
pub fn registry_from_config(config: &Config) -> RuleRegistry {
    let mut registry = RuleRegistry::default();
    for spec in &config.rules {
        match spec {
            crate::config::RuleSpec::Enabled(_) => {}
            crate::config::RuleSpec::Overridden(overrides) => {
                for (rule_id, rule_override) in overrides {
                    let severity = match rule_override.severity.as_deref() {
                        Some("error") => StyleSeverity::Error,
                        Some("warning") => StyleSeverity::Warning,
                        Some("info") => StyleSeverity::Info,
                        _ => StyleSeverity::Warning,
                    };
                    registry.configure(rule_id.clone(), RuleConfig { severity, exclude: rule_override.exclude.clone() });
                }
            }
        }
    }
    registry
}

/// Converts raw file content into the generic AST contract this crate
/// consumes. A concrete parser (not part of this crate — see
/// [`crate::source_ast`]) implements this for whatever source language is
/// being analyzed.
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &str, content: &str) -> Result<SourceFile, String>;
}

/// Per-file outcome: every collaborator's contribution for one file, plus
/// an `error` slot for files that failed to parse. A parse failure still
/// produces a result (never aborts the run); every other field is simply
/// empty.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysisResult {
    pub path: String,
    pub metrics: Option<FileMetrics>,
    pub debt_items: Vec<DebtItem>,
    pub violations: Vec<Violation>,
    pub error: Option<String>,
}

/// Aggregate result of one project-wide run.
pub struct ProjectAnalysisResult {
    pub files: Vec<FileAnalysisResult>,
    pub datalog: DatalogEngine,
}

impl ProjectAnalysisResult {
    pub fn total_debt_cost(&self) -> f64 {
        self.files.iter().flat_map(|f| f.debt_items.iter()).map(|i| i.cost).sum()
    }

    pub fn violation_count(&self) -> usize {
        self.files.iter().map(|f| f.violations.len()).sum()
    }

    pub fn failed_files(&self) -> Vec<&FileAnalysisResult> {
        self.files.iter().filter(|f| f.error.is_some()).collect()
    }
}

fn lower_file(file: &SourceFile) -> FileIr {
    let mut ir = FileIr::new(file.path.clone());
    let mut builder = CfgBuilder::new();
    for decl in &file.functions {
        if let Some(function_ir) = builder.build_function(decl) {
            ir.functions.push(to_ssa(function_ir));
        }
    }
    for class in &file.classes {
        let methods: Vec<FunctionIr> = class
            .methods
            .iter()
            .filter_map(|decl| builder.build_function(decl))
            .map(to_ssa)
            .collect();
        ir.classes.push(ClassIr { name: class.name.clone(), methods, fields: class.fields.clone() });
    }
    ir
}

fn to_ssa(mut function: FunctionIr) -> FunctionIr {
    let mut builder = SsaBuilder::new();
    for param in function.parameters.clone() {
        builder.seed_parameter(function.cfg.entry, &param);
    }
    builder.build(&mut function.cfg);
    function
}

/// Ties the parallel walker, the per-file collaborators, and the core
/// CFG/SSA/fact/Datalog pipeline together into one project-wide run.
pub struct ProjectAnalyzer {
    config: Config,
    registry: RuleRegistry,
    comment_scanner: CommentScanner,
    debt_config: DebtConfig,
    parser: Box<dyn SourceParser>,
}

impl ProjectAnalyzer {
    pub fn new(config: Config, debt_config: DebtConfig, registry: RuleRegistry, parser: Box<dyn SourceParser>) -> Self {
        ProjectAnalyzer { config, registry, comment_scanner: CommentScanner::new(), debt_config, parser }
    }

    fn analyze_file(&self, discovered: &DiscoveredFile) -> FileAnalysisResult {
        let path = discovered.path.display().to_string();
        let source = match self.parser.parse(&path, &discovered.content) {
            Ok(source) => source,
            Err(message) => return FileAnalysisResult { path, error: Some(message), ..Default::default() },
        };

        let comment_items = self.comment_scanner.scan(&path, &discovered.content, &self.debt_config);
        let violations = self.registry.run(&source);
        let file_ir = lower_file(&source);
        let metrics = FileMetrics::compute(&file_ir);
        let mut debt_items = comment_items;
        debt_items.extend(metric_debt_items(&path, &metrics.functions, &self.debt_config));

        FileAnalysisResult { path, metrics: Some(metrics), debt_items, violations, error: None }
    }

    /// Runs the full pipeline: discover files under `root`, analyze each
    /// in parallel, extract facts from every successfully-lowered file,
    /// and run one merged Datalog evaluation over the whole project.
    pub fn analyze(&self, root: &std::path::Path) -> std::io::Result<ProjectAnalysisResult> {
        let excludes = ExcludeSet::compile(&self.config.exclude).unwrap_or_else(|_| ExcludeSet::empty());
        let walker = FileWalker::new(vec!["dart".to_string()], excludes);
        let discovered = walker.discover(root)?;

        let results: Vec<FileAnalysisResult> = discovered.par_iter().map(|file| self.analyze_file(file)).collect();

        let mut datalog = DatalogEngine::new(default_rules());
        for file in &discovered {
            let Ok(source) = self.parser.parse(&file.path.display().to_string(), &file.content) else { continue };
            let file_ir = lower_file(&source);
            let mut extractor = FactExtractor::new();
            datalog.load_facts(extractor.extract_file(&file_ir));
        }
        datalog.run();

        Ok(ProjectAnalysisResult { files: results, datalog })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_ast::FunctionDecl;

    struct EmptyParser;

    impl SourceParser for EmptyParser {
        fn parse(&self, path: &str, _content: &str) -> Result<SourceFile, String> {
            Ok(SourceFile { path: path.to_string(), functions: vec![], classes: vec![] })
        }
    }

    struct FailingParser;

    impl SourceParser for FailingParser {
        fn parse(&self, _path: &str, _content: &str) -> Result<SourceFile, String> {
            Err("unexpected token".to_string())
        }
    }

    #[test]
    fn project_with_no_functions_produces_empty_metrics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dart"), "// nothing here\n").unwrap();
        let analyzer = ProjectAnalyzer::new(Config::default(), DebtConfig::default(), RuleRegistry::default(), Box::new(EmptyParser));
        let result = analyzer.analyze(dir.path()).unwrap();
        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].error.is_none());
        assert!(result.files[0].metrics.as_ref().unwrap().functions.is_empty());
    }

    #[test]
    fn parse_failure_is_captured_without_aborting_the_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dart"), "garbage\n").unwrap();
        let analyzer = ProjectAnalyzer::new(Config::default(), DebtConfig::default(), RuleRegistry::default(), Box::new(FailingParser));
        let result = analyzer.analyze(dir.path()).unwrap();
        assert_eq!(result.failed_files().len(), 1);
    }

    #[test]
    fn todo_comment_is_reflected_in_debt_items() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dart"), "// TODO: clean this up\nvoid f() {}\n").unwrap();
        let analyzer = ProjectAnalyzer::new(Config::default(), DebtConfig::default(), RuleRegistry::default(), Box::new(EmptyParser));
        let result = analyzer.analyze(dir.path()).unwrap();
        assert_eq!(result.files[0].debt_items.len(), 1);
        assert_eq!(result.total_debt_cost(), result.files[0].debt_items[0].cost);
    }

    #[test]
    fn functions_with_bodies_contribute_facts_to_the_datalog_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dart"), "class C {}\n").unwrap();

        struct AllocatingParser;
        impl SourceParser for AllocatingParser {
            fn parse(&self, path: &str, _content: &str) -> Result<SourceFile, String> {
                use crate::ir::{Value, Variable};
                Ok(SourceFile {
                    path: path.to_string(),
                    functions: vec![FunctionDecl {
                        qualified_name: "make".to_string(),
                        parameters: vec![],
                        body: vec![crate::source_ast::Stmt::Assign { target: "x".to_string(), value: Value::NewObject { ty: "Widget".to_string(), ctor: None, args: vec![] } }],
                        source_file: path.to_string(),
                        start_offset: 0,
                        end_offset: 1,
                    }],
                    classes: vec![],
                })
            }
        }

        let analyzer = ProjectAnalyzer::new(Config::default(), DebtConfig::default(), RuleRegistry::default(), Box::new(AllocatingParser));
        let result = analyzer.analyze(dir.path()).unwrap();
        assert!(!result.datalog.query("Alloc").is_empty());
    }
}
