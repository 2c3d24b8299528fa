use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

// Import from codemask-core
use codemask_core::{
    CodemaskConfig, FileStorage, ImportMode, Rule, RuleScope, RuleStore, SubstitutionEngine,
};

// Import CLI utilities
use codemask_cli::{
    apply_to_document, default_rules_path, logging, resolve_rule_id, DocumentOutcome,
    FolderRunner,
};

#[derive(Parser)]
#[command(name = "codemask")]
#[command(about = "Apply ordered find/replace rules to documents and folders")]
struct Args {
    /// Path to config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Rule file to use instead of the configured or default one
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show all rules in application order
    List,

    /// Append a new rule
    Add {
        /// Text (or pattern with --regex) to search for
        original: String,
        /// Text to insert for every match
        replacement: String,
        /// Treat ORIGINAL as a regular expression
        #[arg(long)]
        regex: bool,
        /// Match regardless of case
        #[arg(short = 'i', long)]
        ignore_case: bool,
        /// Store the rule disabled
        #[arg(long)]
        disabled: bool,
        /// Classification tag: global, project or file
        #[arg(long, default_value = "global")]
        scope: RuleScope,
    },

    /// Change fields of an existing rule (position is kept)
    Edit {
        /// Rule id or unique id prefix
        id: String,
        #[arg(long)]
        original: Option<String>,
        #[arg(long)]
        replacement: Option<String>,
        #[arg(long, conflicts_with = "literal")]
        regex: bool,
        #[arg(long)]
        literal: bool,
        #[arg(long, conflicts_with = "ignore_case")]
        case_sensitive: bool,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        #[arg(long)]
        scope: Option<RuleScope>,
    },

    /// Enable a disabled rule or disable an enabled one
    Toggle {
        /// Rule id or unique id prefix
        id: String,
    },

    /// Remove a rule
    Delete {
        /// Rule id or unique id prefix
        id: String,
    },

    /// Write every rule (disabled ones included) to a JSON file
    Export { path: PathBuf },

    /// Read rules from a JSON file
    Import {
        path: PathBuf,
        /// merge: add rules with new search text; replace: adopt the file's list
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },

    /// Apply the enabled rules to one document
    Apply {
        /// Document to transform (rewritten in place when it changes)
        input: PathBuf,
        /// Write the result here instead of in place
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,
        /// Print the result instead of writing any file
        #[arg(long)]
        stdout: bool,
    },

    /// Apply the enabled rules to every file under a directory
    ApplyFolder {
        dir: PathBuf,
        /// List files that would change without writing them
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON report of the run
        #[arg(long)]
        report: Option<PathBuf>,
        /// Stop after this many files; files already rewritten stay rewritten
        #[arg(long)]
        stop_after: Option<usize>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = CodemaskConfig::load_with_fallback(args.config.as_deref());
    let rules_path = args
        .rules
        .clone()
        .or_else(|| config.rules_file.clone())
        .unwrap_or_else(default_rules_path);
    tracing::debug!("using rule file {}", rules_path.display());

    let mut store = RuleStore::open(FileStorage::new(&rules_path))
        .with_context(|| format!("failed to load rules from {}", rules_path.display()))?;

    if let Err(e) = run(args.command, &mut store, &config) {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Command, store: &mut RuleStore, config: &CodemaskConfig) -> Result<()> {
    match command {
        Command::List => list_rules(store),

        Command::Add {
            original,
            replacement,
            regex,
            ignore_case,
            disabled,
            scope,
        } => {
            let rule = Rule::new(original, replacement)
                .with_regex(regex)
                .with_case_sensitive(!ignore_case)
                .with_enabled(!disabled)
                .with_scope(scope);
            let summary = rule.summary();
            let id = store.add_rule(rule)?;
            println!("✅ Rule created: \"{summary}\" ({id})");
        }

        Command::Edit {
            id,
            original,
            replacement,
            regex,
            literal,
            case_sensitive,
            ignore_case,
            scope,
        } => {
            let id = resolve_rule_id(store, &id)?;
            let mut rule = store
                .find_rule(&id)
                .with_context(|| format!("rule {id} disappeared"))?;
            if let Some(original) = original {
                rule.original_text = original;
            }
            if let Some(replacement) = replacement {
                rule.replacement_text = replacement;
            }
            if regex || literal {
                rule.is_regex = regex;
            }
            if case_sensitive || ignore_case {
                rule.case_sensitive = case_sensitive;
            }
            if let Some(scope) = scope {
                rule.scope = scope;
            }
            let summary = rule.summary();
            store.update_rule(rule)?;
            println!("✏️  Rule updated: \"{summary}\"");
        }

        Command::Toggle { id } => {
            let id = resolve_rule_id(store, &id)?;
            store.toggle_rule(&id)?;
            let state = match store.find_rule(&id) {
                Some(rule) if rule.is_enabled => "enabled",
                _ => "disabled",
            };
            println!("🔁 Rule {id} {state}");
        }

        Command::Delete { id } => {
            let id = resolve_rule_id(store, &id)?;
            store.delete_rule(&id)?;
            println!("🗑️  Rule {id} deleted");
        }

        Command::Export { path } => {
            store.export_to_path(&path)?;
            println!("💾 {} rules exported to {}", store.len(), path.display());
        }

        Command::Import { path, mode } => {
            let added = store.import_from_path(&path, mode)?;
            println!(
                "📥 Rules imported from {}: {} added, {} total",
                path.display(),
                added,
                store.len()
            );
        }

        Command::Apply {
            input,
            output,
            stdout,
        } => apply_document(store, config, &input, output.as_deref(), stdout)?,

        Command::ApplyFolder {
            dir,
            dry_run,
            report,
            stop_after,
        } => apply_folder(store, config, &dir, dry_run, report.as_deref(), stop_after)?,
    }

    Ok(())
}

fn list_rules(store: &RuleStore) {
    if store.is_empty() {
        println!("📋 No rules defined");
        return;
    }

    println!("📋 {} rules (applied top to bottom):", store.len());
    for (index, rule) in store.get_rules().iter().enumerate() {
        let marker = if rule.is_enabled { "✔" } else { "○" };
        let mut flags = vec![rule.scope.to_string()];
        if rule.is_regex {
            flags.push("regex".to_string());
        }
        if !rule.case_sensitive {
            flags.push("ignore-case".to_string());
        }
        println!(
            "  {:>3}. {} {}  {}  [{}]",
            index + 1,
            marker,
            rule.id,
            rule.summary(),
            flags.join(", ")
        );
    }
}

fn apply_document(
    store: &RuleStore,
    config: &CodemaskConfig,
    input: &Path,
    output: Option<&Path>,
    stdout: bool,
) -> Result<()> {
    let engine = SubstitutionEngine::with_config(config.engine.clone());
    let rule_set = engine.compile(&store.enabled_rules());
    for diagnostic in rule_set.diagnostics() {
        eprintln!("⚠️  {diagnostic}");
    }

    if stdout {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        print!("{}", rule_set.apply(&text));
        return Ok(());
    }

    match apply_to_document(&rule_set, input, output)? {
        DocumentOutcome::Written(path) => println!("💾 Obfuscation rules applied: {}", path.display()),
        DocumentOutcome::Unchanged => println!("✅ No changes for {}", input.display()),
    }
    Ok(())
}

fn apply_folder(
    store: &RuleStore,
    config: &CodemaskConfig,
    dir: &Path,
    dry_run: bool,
    report_path: Option<&Path>,
    stop_after: Option<usize>,
) -> Result<()> {
    let engine = SubstitutionEngine::with_config(config.engine.clone());
    let rule_set = engine.compile(&store.enabled_rules());
    for diagnostic in rule_set.diagnostics() {
        eprintln!("⚠️  {diagnostic}");
    }
    if rule_set.is_empty() {
        println!("⏭️  No enabled rules, nothing to do");
        return Ok(());
    }

    println!("📁 Processing: {}", dir.display());
    let runner = FolderRunner::new(&rule_set, config.folder.clone()).dry_run(dry_run);
    let cancel = runner.cancel_flag();
    let report = runner
        .with_progress(move |path, scanned| {
            tracing::debug!("processed file {scanned}: {}", path.display());
            if stop_after.is_some_and(|limit| scanned >= limit) {
                cancel.store(true, Ordering::SeqCst);
            }
        })
        .run(dir)?;

    for path in &report.modified {
        let verb = if dry_run { "would modify" } else { "modified" };
        println!("  📝 {verb} {}", path.display());
    }
    for failed in &report.failed {
        let path = failed
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<walk>".to_string());
        eprintln!("  ❌ {path}: {}", failed.error);
    }

    if report.cancelled {
        println!("⏹️  Stopped early; files processed so far keep their changes");
    }
    println!(
        "✅ Obfuscation complete. {} {} file(s) of {} scanned ({} skipped, {} failed)",
        if dry_run { "Would modify" } else { "Modified" },
        report.modified.len(),
        report.files_scanned,
        report.skipped.len(),
        report.failed.len()
    );

    if let Some(path) = report_path {
        report.save(path)?;
        println!("💾 Report saved to: {}", path.display());
    }
    Ok(())
}
