use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use codemask_core::{FolderConfig, RuleDiagnostic, RuleSet};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Outcome of applying a rule set to a single document on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Transformed text was written to the target path
    Written(PathBuf),
    /// Output equals input; nothing was written
    Unchanged,
}

/// Transform the document at `input`. The result goes to `output` when given,
/// otherwise back to `input`, and in-place writes only happen if the text changed.
pub fn apply_to_document(
    rule_set: &RuleSet,
    input: &Path,
    output: Option<&Path>,
) -> Result<DocumentOutcome> {
    let original = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let transformed = rule_set.apply(&original);

    let target = match output {
        Some(path) => path,
        None if transformed == original => return Ok(DocumentOutcome::Unchanged),
        None => input,
    };

    fs::write(target, transformed)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(DocumentOutcome::Written(target.to_path_buf()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotUtf8,
    TooLarge { size: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: Option<PathBuf>,
    pub error: String,
}

/// Summary of one folder run
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_scanned: usize,
    pub modified: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    /// Rules left out because their pattern did not compile
    pub diagnostics: Vec<RuleDiagnostic>,
    /// Run stopped early; files modified before that stay modified
    pub cancelled: bool,
}

impl FolderReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Applies one compiled rule set to every file below a directory.
///
/// Files are processed one after another. Per-file failures are recorded and
/// the run continues. Setting the cancel flag stops before the next file;
/// files already rewritten stay rewritten.
pub struct FolderRunner<'a> {
    rule_set: &'a RuleSet,
    config: FolderConfig,
    dry_run: bool,
    cancel: Arc<AtomicBool>,
    on_file: Option<ProgressCallback<'a>>,
}

/// Called after each file with its path and the number of files scanned so far
pub type ProgressCallback<'a> = Box<dyn Fn(&Path, usize) + 'a>;

impl<'a> FolderRunner<'a> {
    pub fn new(rule_set: &'a RuleSet, config: FolderConfig) -> Self {
        Self {
            rule_set,
            config,
            dry_run: false,
            cancel: Arc::new(AtomicBool::new(false)),
            on_file: None,
        }
    }

    /// Report which files would change without writing them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, on_file: impl Fn(&Path, usize) + 'a) -> Self {
        self.on_file = Some(Box::new(on_file));
        self
    }

    /// Shared flag; store `true` to stop the run early
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, root: &Path) -> Result<FolderReport> {
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }

        let mut report = FolderReport {
            root: root.to_path_buf(),
            dry_run: self.dry_run,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            files_scanned: 0,
            modified: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            diagnostics: self.rule_set.diagnostics().to_vec(),
            cancelled: false,
        };

        let include_hidden = self.config.include_hidden;
        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| include_hidden || !is_hidden(entry));

        for entry in walker {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::info!("folder run cancelled after {} files", report.files_scanned);
                report.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("failed to walk {}: {e}", root.display());
                    report.failed.push(FailedFile {
                        path: e.path().map(Path::to_path_buf),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            report.files_scanned += 1;
            if let Err(e) = self.process_file(entry.path(), &mut report) {
                tracing::warn!("error processing {}: {e:#}", entry.path().display());
                report.failed.push(FailedFile {
                    path: Some(entry.path().to_path_buf()),
                    error: format!("{e:#}"),
                });
            }
            if let Some(on_file) = &self.on_file {
                on_file(entry.path(), report.files_scanned);
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    fn process_file(&self, path: &Path, report: &mut FolderReport) -> Result<()> {
        let size = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        if size > self.config.max_file_size_bytes {
            tracing::debug!("skipping {} ({size} bytes)", path.display());
            report.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: SkipReason::TooLarge { size },
            });
            return Ok(());
        }

        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let Ok(original) = String::from_utf8(bytes) else {
            tracing::debug!("skipping non-UTF-8 file {}", path.display());
            report.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: SkipReason::NotUtf8,
            });
            return Ok(());
        };

        let transformed = self.rule_set.apply(&original);
        if transformed == original {
            return Ok(());
        }

        if !self.dry_run {
            fs::write(path, transformed)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        tracing::debug!("modified {}", path.display());
        report.modified.push(path.to_path_buf());
        Ok(())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemask_core::{Rule, SubstitutionEngine};

    fn rule_set(rules: &[Rule]) -> RuleSet {
        SubstitutionEngine::new().compile(rules)
    }

    #[test]
    fn test_document_unchanged_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "nothing here").unwrap();

        let set = rule_set(&[Rule::new("secret", "x")]);
        assert_eq!(apply_to_document(&set, &path, None).unwrap(), DocumentOutcome::Unchanged);
    }

    #[test]
    fn test_document_written_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "Acme rocks").unwrap();

        let set = rule_set(&[Rule::new("Acme", "ORG")]);
        let outcome = apply_to_document(&set, &path, None).unwrap();
        assert_eq!(outcome, DocumentOutcome::Written(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "ORG rocks");
    }

    #[test]
    fn test_document_written_to_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "Acme").unwrap();

        let set = rule_set(&[Rule::new("Acme", "ORG")]);
        apply_to_document(&set, &input, Some(&output)).unwrap();
        assert_eq!(fs::read_to_string(&input).unwrap(), "Acme");
        assert_eq!(fs::read_to_string(&output).unwrap(), "ORG");
    }

    #[test]
    fn test_hidden_entries_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "Acme").unwrap();
        fs::write(dir.path().join("visible.txt"), "Acme").unwrap();

        let set = rule_set(&[Rule::new("Acme", "ORG")]);
        let report = FolderRunner::new(&set, FolderConfig::default()).run(dir.path()).unwrap();

        assert_eq!(report.files_scanned, 1);
        assert_eq!(fs::read_to_string(dir.path().join(".git/config")).unwrap(), "Acme");
    }

    #[test]
    fn test_oversize_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "Acme ".repeat(100)).unwrap();

        let config = FolderConfig {
            max_file_size_bytes: 10,
            ..FolderConfig::default()
        };
        let set = rule_set(&[Rule::new("Acme", "ORG")]);
        let report = FolderRunner::new(&set, config).run(dir.path()).unwrap();

        assert!(report.modified.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].reason, SkipReason::TooLarge { size: 500 }));
    }

    #[test]
    fn test_run_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let set = rule_set(&[]);
        assert!(FolderRunner::new(&set, FolderConfig::default()).run(&file).is_err());
    }
}
