//! Technical-debt detection: comment-based items (TODO/FIXME/ignore
//! directives), metric-based items (low maintainability, high complexity,
//! long methods), cost calculation, and report aggregation.

use std::collections::HashMap;

use regex::Regex;

use crate::metrics::FunctionMetrics;

/// Unit debt costs are expressed in. Only affects report rendering; the
/// numeric cost values are unit-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtUnit {
    Hours,
    Days,
    StoryPoints,
}

impl Default for DebtUnit {
    fn default() -> Self {
        DebtUnit::Hours
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn multiplier(&self, config: &DebtConfig) -> f64 {
        match self {
            Severity::Critical => config.multipliers.critical,
            Severity::High => config.multipliers.high,
            Severity::Medium => config.multipliers.medium,
            Severity::Low => config.multipliers.low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebtKind {
    Todo,
    Fixme,
    Ignore,
    IgnoreForFile,
    AsDynamic,
    Deprecated,
    LowMaintainability,
    HighComplexity,
    LongMethod,
    DuplicateCode,
}

impl DebtKind {
    fn config_key(&self) -> &'static str {
        match self {
            DebtKind::Todo => "todo",
            DebtKind::Fixme => "fixme",
            DebtKind::Ignore => "ignore",
            DebtKind::IgnoreForFile => "ignore-for-file",
            DebtKind::AsDynamic => "as-dynamic",
            DebtKind::Deprecated => "deprecated",
            DebtKind::LowMaintainability => "low-maintainability",
            DebtKind::HighComplexity => "high-complexity",
            DebtKind::LongMethod => "long-method",
            DebtKind::DuplicateCode => "duplicate-code",
        }
    }

    fn default_base_cost(&self) -> f64 {
        match self {
            DebtKind::Todo => 1.0,
            DebtKind::Fixme => 2.0,
            DebtKind::Ignore => 0.5,
            DebtKind::IgnoreForFile => 1.0,
            DebtKind::AsDynamic => 1.5,
            DebtKind::Deprecated => 3.0,
            DebtKind::LowMaintainability => 4.0,
            DebtKind::HighComplexity => 4.0,
            DebtKind::LongMethod => 2.0,
            DebtKind::DuplicateCode => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Multipliers { critical: 4.0, high: 2.0, medium: 1.0, low: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricThresholds {
    pub maintainability_index: f64,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub lines_of_code: u32,
}

impl Default for MetricThresholds {
    fn default() -> Self {
        MetricThresholds {
            maintainability_index: 50.0,
            cyclomatic_complexity: 20,
            cognitive_complexity: 15,
            lines_of_code: 100,
        }
    }
}

/// Resolved `debt.*` configuration (see [`crate::config`] for the YAML
/// layer that produces this).
#[derive(Debug, Clone, PartialEq)]
pub struct DebtConfig {
    pub unit: DebtUnit,
    pub threshold: f64,
    pub costs: HashMap<String, f64>,
    pub multipliers: Multipliers,
    pub metrics: MetricThresholds,
    pub exclude: Vec<String>,
}

impl Default for DebtConfig {
    fn default() -> Self {
        DebtConfig {
            unit: DebtUnit::Hours,
            threshold: 40.0,
            costs: HashMap::new(),
            multipliers: Multipliers::default(),
            metrics: MetricThresholds::default(),
            exclude: Vec::new(),
        }
    }
}

impl DebtConfig {
    fn base_cost(&self, kind: DebtKind) -> f64 {
        self.costs.get(kind.config_key()).copied().unwrap_or_else(|| kind.default_base_cost())
    }
}

/// A single location in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

/// A single unit of technical debt.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtItem {
    pub kind: DebtKind,
    pub location: Location,
    pub severity: Severity,
    pub cost: f64,
    pub context: Option<String>,
}

impl DebtItem {
    fn new(kind: DebtKind, location: Location, severity: Severity, config: &DebtConfig, context: Option<String>) -> Self {
        let cost = config.base_cost(kind) * severity.multiplier(config);
        DebtItem { kind, location, severity, cost, context }
    }
}

/// `//` (optional whitespace) `TODO` then `:` or whitespace. Rejects
/// `///` doc comments, `//TODO` with no separator, block comments, and
/// lowercase `todo`.
fn todo_regex() -> Regex {
    Regex::new(r"(?m)^(?://(?!/)\s*)TODO(?::|\s)").unwrap()
}

fn comment_directive_regex(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?mi)^(?://(?!/)\s*){keyword}\b")).unwrap()
}

/// Scans raw source text for comment-based debt markers. Operates
/// line-by-line so offsets can be reported as 1-based line numbers.
pub struct CommentScanner {
    todo: Regex,
    fixme: Regex,
    ignore_for_file: Regex,
    ignore: Regex,
    deprecated: Regex,
}

impl CommentScanner {
    pub fn new() -> Self {
        CommentScanner {
            todo: todo_regex(),
            fixme: comment_directive_regex("FIXME"),
            ignore_for_file: comment_directive_regex("ignore-for-file"),
            ignore: comment_directive_regex("ignore"),
            deprecated: Regex::new(r"@deprecated\b").unwrap(),
        }
    }

    pub fn scan(&self, file: &str, source: &str, config: &DebtConfig) -> Vec<DebtItem> {
        let mut items = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            let trimmed = line.trim_start();
            if self.todo.is_match(trimmed) {
                items.push(DebtItem::new(
                    DebtKind::Todo,
                    Location { file: file.to_string(), line: line_no },
                    Severity::Low,
                    config,
                    Some(trimmed.to_string()),
                ));
            }
            if self.fixme.is_match(trimmed) {
                items.push(DebtItem::new(
                    DebtKind::Fixme,
                    Location { file: file.to_string(), line: line_no },
                    Severity::Medium,
                    config,
                    Some(trimmed.to_string()),
                ));
            }
            if self.ignore_for_file.is_match(trimmed) {
                items.push(DebtItem::new(
                    DebtKind::IgnoreForFile,
                    Location { file: file.to_string(), line: line_no },
                    Severity::High,
                    config,
                    Some(trimmed.to_string()),
                ));
            } else if self.ignore.is_match(trimmed) {
                items.push(DebtItem::new(
                    DebtKind::Ignore,
                    Location { file: file.to_string(), line: line_no },
                    Severity::Medium,
                    config,
                    Some(trimmed.to_string()),
                ));
            }
            if self.deprecated.is_match(line) {
                items.push(DebtItem::new(
                    DebtKind::Deprecated,
                    Location { file: file.to_string(), line: line_no },
                    Severity::Low,
                    config,
                    Some(trimmed.to_string()),
                ));
            }
            if line.contains("as dynamic") {
                items.push(DebtItem::new(
                    DebtKind::AsDynamic,
                    Location { file: file.to_string(), line: line_no },
                    Severity::Medium,
                    config,
                    Some(trimmed.to_string()),
                ));
            }
        }
        items
    }
}

impl Default for CommentScanner {
    fn default() -> Self {
        CommentScanner::new()
    }
}

/// Derives metric-based debt items from already-computed [`FunctionMetrics`].
pub fn metric_debt_items(file: &str, metrics: &[FunctionMetrics], config: &DebtConfig) -> Vec<DebtItem> {
    let mut items = Vec::new();
    for m in metrics {
        let loc = Location { file: file.to_string(), line: 0 };
        if m.maintainability_index < config.metrics.maintainability_index {
            items.push(DebtItem::new(
                DebtKind::LowMaintainability,
                loc.clone(),
                Severity::High,
                config,
                Some(m.qualified_name.clone()),
            ));
        }
        if m.cyclomatic_complexity > config.metrics.cyclomatic_complexity {
            items.push(DebtItem::new(
                DebtKind::HighComplexity,
                loc.clone(),
                Severity::High,
                config,
                Some(m.qualified_name.clone()),
            ));
        }
    }
    items
}

/// Aggregated debt report over a whole project.
#[derive(Debug, Clone, Default)]
pub struct DebtReport {
    pub items: Vec<DebtItem>,
}

impl DebtReport {
    pub fn new(items: Vec<DebtItem>) -> Self {
        DebtReport { items }
    }

    pub fn total_cost(&self) -> f64 {
        self.items.iter().map(|i| i.cost).sum()
    }

    pub fn breakdown_by_kind(&self) -> HashMap<DebtKind, f64> {
        let mut out: HashMap<DebtKind, f64> = HashMap::new();
        for item in &self.items {
            *out.entry(item.kind).or_insert(0.0) += item.cost;
        }
        out
    }

    pub fn breakdown_by_severity(&self) -> HashMap<Severity, f64> {
        let mut out: HashMap<Severity, f64> = HashMap::new();
        for item in &self.items {
            *out.entry(item.severity).or_insert(0.0) += item.cost;
        }
        out
    }

    /// Top 10 files by total debt cost, descending.
    pub fn hotspots(&self) -> Vec<(String, f64)> {
        let mut by_file: HashMap<String, f64> = HashMap::new();
        for item in &self.items {
            *by_file.entry(item.location.file.clone()).or_insert(0.0) += item.cost;
        }
        let mut ranked: Vec<(String, f64)> = by_file.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(10);
        ranked
    }

    pub fn items_with_severity(&self, severity: Severity) -> Vec<&DebtItem> {
        self.items.iter().filter(|i| i.severity == severity).collect()
    }

    pub fn exceeds_threshold(&self, config: &DebtConfig) -> bool {
        self.total_cost() > config.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::HalsteadMetrics;

    #[test]
    fn todo_with_colon_is_detected() {
        let scanner = CommentScanner::new();
        let config = DebtConfig::default();
        let items = scanner.scan("a.dart", "// TODO: fix this later\n", &config);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DebtKind::Todo);
    }

    #[test]
    fn doc_comment_todo_is_not_detected() {
        let scanner = CommentScanner::new();
        let config = DebtConfig::default();
        let items = scanner.scan("a.dart", "/// TODO: not a real marker\n", &config);
        assert!(items.is_empty());
    }

    #[test]
    fn todo_without_separator_is_not_detected() {
        let scanner = CommentScanner::new();
        let config = DebtConfig::default();
        let items = scanner.scan("a.dart", "//TODOsomething\n", &config);
        assert!(items.is_empty());
    }

    #[test]
    fn lowercase_todo_is_not_detected() {
        let scanner = CommentScanner::new();
        let config = DebtConfig::default();
        let items = scanner.scan("a.dart", "// todo: fix this\n", &config);
        assert!(items.is_empty());
    }

    #[test]
    fn cost_is_base_times_multiplier_and_sums_commute() {
        let config = DebtConfig::default();
        let a = DebtItem::new(DebtKind::Fixme, Location { file: "a".into(), line: 1 }, Severity::Medium, &config, None);
        let b = DebtItem::new(DebtKind::Todo, Location { file: "a".into(), line: 2 }, Severity::Low, &config, None);
        let forward = a.cost + b.cost;
        let backward = b.cost + a.cost;
        assert_eq!(forward, backward);
        assert_eq!(a.cost, config.base_cost(DebtKind::Fixme) * config.multipliers.medium);
    }

    #[test]
    fn hotspots_ranks_files_by_total_cost_descending() {
        let config = DebtConfig::default();
        let items = vec![
            DebtItem::new(DebtKind::Fixme, Location { file: "hot.dart".into(), line: 1 }, Severity::Critical, &config, None),
            DebtItem::new(DebtKind::Todo, Location { file: "cold.dart".into(), line: 1 }, Severity::Low, &config, None),
        ];
        let report = DebtReport::new(items);
        let hotspots = report.hotspots();
        assert_eq!(hotspots[0].0, "hot.dart");
    }

    #[test]
    fn low_maintainability_metric_produces_debt_item() {
        let config = DebtConfig::default();
        let metrics = vec![FunctionMetrics {
            qualified_name: "f".to_string(),
            cyclomatic_complexity: 1,
            cognitive_complexity: 1,
            halstead: HalsteadMetrics { distinct_operators: 1, distinct_operands: 1, total_operators: 1, total_operands: 1 },
            maintainability_index: 10.0,
        }];
        let items = metric_debt_items("a.dart", &metrics, &config);
        assert!(items.iter().any(|i| i.kind == DebtKind::LowMaintainability));
    }
}
