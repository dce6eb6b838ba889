//! Long-running analyzer service: periodically re-runs a project analysis
//! and exits cleanly on Ctrl-C. Has no REST/WebSocket surface; `anteater
//! server` is meant to sit in a CI runner or a developer's terminal and
//! log the same reports the one-shot `analyze` command would print.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tokio::time::interval;

use crate::config::Config;
use crate::debt::DebtConfig;
use crate::project::{registry_from_config, ProjectAnalyzer, SourceParser};
use crate::report::{render_analyze, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_secs(30);

struct UnimplementedParser;

impl SourceParser for UnimplementedParser {
    fn parse(&self, _path: &str, _content: &str) -> Result<crate::source_ast::SourceFile, String> {
        Err("no SourceParser is configured for this build".to_string())
    }
}

async fn run_loop(root: PathBuf) {
    let config = Config::load().unwrap_or_default();
    let debt_config: DebtConfig = config.debt.clone().into();
    let registry = registry_from_config(&config);
    let analyzer = ProjectAnalyzer::new(config, debt_config, registry, Box::new(UnimplementedParser));

    let mut ticker = interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        match analyzer.analyze(&root) {
            Ok(result) => tracing::info!(
                files = result.files.len(),
                violations = result.violation_count(),
                "{}",
                render_analyze(&result, OutputFormat::Text)
            ),
            Err(err) => tracing::error!(%err, "analysis pass failed"),
        }
    }
}

/// Runs the service until Ctrl-C, then returns a success exit code.
pub fn run() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async {
        tracing::info!("anteater server starting, polling every {:?}", POLL_INTERVAL);
        tokio::select! {
            _ = run_loop(PathBuf::from(".")) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
            }
        }
    });

    ExitCode::SUCCESS
}
