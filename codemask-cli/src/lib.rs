// All substitution logic is in codemask-core
// This CLI acts as the host: it owns files on disk and the rule file location

// CLI-specific modules
pub mod documents;
pub mod logging;

// Re-export core types for convenience
pub use codemask_core::*;

// Re-export CLI utilities
pub use documents::{
    apply_to_document, DocumentOutcome, FolderReport, FolderRunner, ProgressCallback,
};

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Rule file used when neither `--rules` nor the config names one:
/// `<platform data dir>/codemask/rules.json`
pub fn default_rules_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codemask")
        .join("rules.json")
}

/// Resolve a full id or a unique id prefix to a stored rule id
pub fn resolve_rule_id(store: &RuleStore, query: &str) -> Result<RuleId> {
    if query.is_empty() {
        return Err(anyhow!("rule id must not be empty"));
    }
    if let Some(rule) = store.find_rule(query) {
        return Ok(rule.id);
    }

    let matches: Vec<RuleId> = store
        .get_rules()
        .into_iter()
        .map(|r| r.id)
        .filter(|id| id.starts_with(query))
        .collect();

    match matches.as_slice() {
        [id] => Ok(id.clone()),
        [] => Err(anyhow!("no rule with id '{query}'")),
        _ => Err(anyhow!(
            "id prefix '{query}' matches {} rules, use more characters",
            matches.len()
        )),
    }
}
