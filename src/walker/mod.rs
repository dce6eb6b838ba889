//! Parallel project-discovery walker: recursively finds source files under
//! a root, applies `exclude` glob patterns, and reads each file's content
//! in parallel via `rayon`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;

/// A discovered source file: its path relative to the walk root and its
/// raw content, read eagerly so downstream stages (metrics, debt, style,
/// CFG builder) never touch the filesystem again.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub content: String,
}

/// Compiled `exclude` patterns from configuration. Built once per walk;
/// cheap to clone (wraps an `Arc`'d [`GlobSet`]).
#[derive(Clone)]
pub struct ExcludeSet {
    set: Arc<GlobSet>,
}

impl ExcludeSet {
    pub fn compile(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(ExcludeSet { set: Arc::new(builder.build()?) })
    }

    pub fn empty() -> Self {
        ExcludeSet { set: Arc::new(GlobSetBuilder::new().build().unwrap()) }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

/// Recursively walks `root`, collecting files whose extension is in
/// `extensions` and that don't match `excludes`, then reads their content
/// in parallel with a thread pool sized to `max_concurrency` (falls back
/// to `num_cpus::get()` when `None`), matching the cooperative
/// per-file-task-to-thread mapping used for the rest of the pipeline.
pub struct FileWalker {
    extensions: Vec<String>,
    excludes: ExcludeSet,
    max_concurrency: Option<usize>,
}

impl FileWalker {
    pub fn new(extensions: Vec<String>, excludes: ExcludeSet) -> Self {
        FileWalker { extensions, excludes, max_concurrency: None }
    }

    /// Number of logical CPUs, the default `discover` falls back to when no
    /// explicit concurrency bound is set.
    pub fn default_concurrency() -> usize {
        num_cpus::get()
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else { return false };
        self.extensions.iter().any(|wanted| wanted == ext)
    }

    fn collect_paths(&self, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if self.excludes.is_excluded(&path) {
                continue;
            }
            if path.is_dir() {
                self.collect_paths(&path, out)?;
            } else if self.matches_extension(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    /// Discovers and reads every matching file under `root`. Per-file I/O
    /// errors are dropped silently from the result set rather than
    /// aborting the walk — callers that need per-file error reporting
    /// should use [`crate::project::ProjectAnalyzer`], which wraps this
    /// with `FileAnalysisResult::error`.
    pub fn discover(&self, root: &Path) -> std::io::Result<Vec<DiscoveredFile>> {
        let mut paths = Vec::new();
        self.collect_paths(root, &mut paths)?;

        let run = || {
            paths
                .par_iter()
                .filter_map(|path| std::fs::read_to_string(path).ok().map(|content| DiscoveredFile { path: path.clone(), content }))
                .collect()
        };

        let n = self.max_concurrency.unwrap_or_else(Self::default_concurrency);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build().expect("thread pool builds with a bounded size");
        Ok(pool.install(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_matching_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dart"), "content-a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "content-b").unwrap();
        let walker = FileWalker::new(vec!["dart".to_string()], ExcludeSet::empty());
        let found = walker.discover(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("a.dart"));
    }

    #[test]
    fn excluded_glob_patterns_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("generated")).unwrap();
        std::fs::write(dir.path().join("generated/a.dart"), "x").unwrap();
        std::fs::write(dir.path().join("b.dart"), "y").unwrap();
        let excludes = ExcludeSet::compile(&[format!("{}/generated/**", dir.path().display())]).unwrap();
        let walker = FileWalker::new(vec!["dart".to_string()], excludes);
        let found = walker.discover(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("b.dart"));
    }

    #[test]
    fn recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/a.dart"), "x").unwrap();
        let walker = FileWalker::new(vec!["dart".to_string()], ExcludeSet::empty());
        let found = walker.discover(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
    }
}
