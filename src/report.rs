//! Text/JSON/Markdown renderers for the `analyze`/`metrics`/`debt` CLI
//! commands' `-f/--format` flag.

use chrono::Utc;
use serde_json::json;

use crate::debt::{DebtConfig, DebtReport, Severity as DebtSeverity};
use crate::project::ProjectAnalysisResult;
use crate::style::Severity as StyleSeverity;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format `{other}` (expected text, json, or markdown)")),
        }
    }
}

fn severity_label(severity: StyleSeverity) -> &'static str {
    match severity {
        StyleSeverity::Info => "info",
        StyleSeverity::Warning => "warning",
        StyleSeverity::Error => "error",
    }
}

/// Renders the `analyze` command's style violations.
pub fn render_analyze(result: &ProjectAnalysisResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for file in &result.files {
                if let Some(err) = &file.error {
                    out.push_str(&format!("{}: error: {}\n", file.path, err));
                    continue;
                }
                for v in &file.violations {
                    out.push_str(&format!("{}: {} [{}]: {}\n", v.file, severity_label(v.severity), v.rule_id, v.message));
                }
            }
            out
        }
        OutputFormat::Json => {
            let files: Vec<_> = result
                .files
                .iter()
                .map(|f| {
                    json!({
                        "path": f.path,
                        "error": f.error,
                        "violations": f.violations.iter().map(|v| json!({
                            "rule": v.rule_id,
                            "message": v.message,
                            "severity": severity_label(v.severity),
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json!({ "generated_at": now_rfc3339(), "files": files })).unwrap_or_default()
        }
        OutputFormat::Markdown => {
            let mut out = String::from("# Style Report\n\n");
            for file in &result.files {
                if file.violations.is_empty() && file.error.is_none() {
                    continue;
                }
                out.push_str(&format!("## {}\n\n", file.path));
                if let Some(err) = &file.error {
                    out.push_str(&format!("- error: {err}\n"));
                }
                for v in &file.violations {
                    out.push_str(&format!("- **{}** ({}): {}\n", v.rule_id, severity_label(v.severity), v.message));
                }
                out.push('\n');
            }
            out
        }
    }
}

/// Renders the `metrics` command's per-function and project-level numbers.
pub fn render_metrics(result: &ProjectAnalysisResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for file in &result.files {
                let Some(metrics) = &file.metrics else { continue };
                for f in &metrics.functions {
                    out.push_str(&format!(
                        "{}::{} cc={} cognitive={} mi={:.1}\n",
                        file.path, f.qualified_name, f.cyclomatic_complexity, f.cognitive_complexity, f.maintainability_index
                    ));
                }
            }
            out
        }
        OutputFormat::Json => {
            let files: Vec<_> = result
                .files
                .iter()
                .map(|f| {
                    let functions: Vec<_> = f
                        .metrics
                        .as_ref()
                        .map(|m| {
                            m.functions
                                .iter()
                                .map(|fm| {
                                    json!({
                                        "name": fm.qualified_name,
                                        "cyclomatic_complexity": fm.cyclomatic_complexity,
                                        "cognitive_complexity": fm.cognitive_complexity,
                                        "maintainability_index": fm.maintainability_index,
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    json!({ "path": f.path, "functions": functions })
                })
                .collect();
            serde_json::to_string_pretty(&json!({ "generated_at": now_rfc3339(), "files": files })).unwrap_or_default()
        }
        OutputFormat::Markdown => {
            let mut out = String::from("# Metrics Report\n\n");
            for file in &result.files {
                let Some(metrics) = &file.metrics else { continue };
                if metrics.functions.is_empty() {
                    continue;
                }
                out.push_str(&format!("## {}\n\n", file.path));
                out.push_str("| Function | CC | Cognitive | MI |\n|---|---|---|---|\n");
                for f in &metrics.functions {
                    out.push_str(&format!(
                        "| {} | {} | {} | {:.1} |\n",
                        f.qualified_name, f.cyclomatic_complexity, f.cognitive_complexity, f.maintainability_index
                    ));
                }
                out.push('\n');
            }
            out
        }
    }
}

fn debt_severity_label(severity: DebtSeverity) -> &'static str {
    match severity {
        DebtSeverity::Critical => "critical",
        DebtSeverity::High => "high",
        DebtSeverity::Medium => "medium",
        DebtSeverity::Low => "low",
    }
}

/// Renders the `debt` command's report. The markdown variant always emits
/// the fixed section headings, even when a section is empty, so downstream
/// tooling can rely on the document shape.
pub fn render_debt(report: &DebtReport, config: &DebtConfig, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("total debt: {:.1}\n", report.total_cost());
            for item in &report.items {
                out.push_str(&format!(
                    "{}:{} [{}] {:?} cost={:.1}\n",
                    item.location.file,
                    item.location.line,
                    debt_severity_label(item.severity),
                    item.kind,
                    item.cost
                ));
            }
            out
        }
        OutputFormat::Json => {
            let items: Vec<_> = report
                .items
                .iter()
                .map(|i| {
                    json!({
                        "kind": format!("{:?}", i.kind),
                        "file": i.location.file,
                        "line": i.location.line,
                        "severity": debt_severity_label(i.severity),
                        "cost": i.cost,
                        "context": i.context,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json!({
                "generated_at": now_rfc3339(),
                "total_cost": report.total_cost(),
                "threshold": config.threshold,
                "items": items,
            }))
            .unwrap_or_default()
        }
        OutputFormat::Markdown => {
            let mut out = String::from("# Technical Debt Report\n\n");

            out.push_str("## Summary\n\n");
            out.push_str(&format!("Total cost: {:.1} {:?}\n\n", report.total_cost(), config.unit));

            out.push_str("## Breakdown by Type\n\n");
            for (kind, cost) in report.breakdown_by_kind() {
                out.push_str(&format!("- {kind:?}: {cost:.1}\n"));
            }
            out.push('\n');

            out.push_str("## Breakdown by Severity\n\n");
            for (severity, cost) in report.breakdown_by_severity() {
                out.push_str(&format!("- {}: {:.1}\n", debt_severity_label(severity), cost));
            }
            out.push('\n');

            out.push_str("## Hotspots (Top 10 Files)\n\n");
            for (file, cost) in report.hotspots() {
                out.push_str(&format!("- {file}: {cost:.1}\n"));
            }
            out.push('\n');

            out.push_str("## Critical Items\n\n");
            for item in report.items_with_severity(DebtSeverity::Critical) {
                out.push_str(&format!("- {}:{} {:?}\n", item.location.file, item.location.line, item.kind));
            }
            out.push('\n');

            out.push_str("## High Priority Items\n\n");
            for item in report.items_with_severity(DebtSeverity::High) {
                out.push_str(&format!("- {}:{} {:?}\n", item.location.file, item.location.line, item.kind));
            }
            out.push('\n');

            out
        }
    }
}
