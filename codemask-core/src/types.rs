use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type RuleId = String;

// ===== RULE MODEL =====
// Field names follow the exchange format used by export/import, so a
// serialized Rule is exactly one record of an exported rule list.

/// A single find/replace directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Opaque unique identifier, assigned at creation
    pub id: RuleId,
    /// Literal search text or regex source, depending on `is_regex`
    pub original_text: String,
    /// Text inserted for every match
    pub replacement_text: String,
    /// Disabled rules are skipped entirely during application
    pub is_enabled: bool,
    /// Literal vs. pattern matching
    pub is_regex: bool,
    pub case_sensitive: bool,
    /// Classification tag only; the engine never filters on it
    pub scope: RuleScope,
}

impl Rule {
    /// Create an enabled, literal, case-sensitive, global rule with a fresh id
    pub fn new(original_text: impl Into<String>, replacement_text: impl Into<String>) -> Self {
        Self {
            id: new_rule_id(),
            original_text: original_text.into(),
            replacement_text: replacement_text.into(),
            is_enabled: true,
            is_regex: false,
            case_sensitive: true,
            scope: RuleScope::Global,
        }
    }

    pub fn with_regex(mut self, is_regex: bool) -> Self {
        self.is_regex = is_regex;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_enabled(mut self, is_enabled: bool) -> Self {
        self.is_enabled = is_enabled;
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    /// Same rule contents under a newly generated id
    pub fn with_fresh_id(mut self) -> Self {
        self.id = new_rule_id();
        self
    }

    /// Short label used in listings: `original → replacement`
    pub fn summary(&self) -> String {
        format!("{} → {}", self.original_text, self.replacement_text)
    }
}

/// Generate a new opaque rule id (UUID v4)
pub fn new_rule_id() -> RuleId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    #[default]
    Global,
    Project,
    File,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleScope::Global => "global",
            RuleScope::Project => "project",
            RuleScope::File => "file",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for RuleScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(RuleScope::Global),
            "project" => Ok(RuleScope::Project),
            "file" => Ok(RuleScope::File),
            other => Err(format!(
                "unknown scope '{other}' (expected global, project or file)"
            )),
        }
    }
}

/// How an imported rule list is combined with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Append records whose `original_text` is not already present
    Merge,
    /// Discard the current list and adopt the imported one
    Replace,
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            other => Err(format!("unknown import mode '{other}' (expected merge or replace)")),
        }
    }
}

// ===== ENGINE REPORTING TYPES =====

/// Non-fatal report for a rule that was skipped during application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDiagnostic {
    pub rule_id: RuleId,
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {} skipped, invalid pattern '{}': {}",
            self.rule_id, self.pattern, self.message
        )
    }
}

/// Result of one `obfuscate_with_report` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obfuscation {
    pub text: String,
    pub diagnostics: Vec<RuleDiagnostic>,
    /// False when the output equals the input byte-for-byte
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rule_defaults() {
        let rule = Rule::new("Acme Corp", "COMPANY_NAME");
        assert!(rule.is_enabled);
        assert!(!rule.is_regex);
        assert!(rule.case_sensitive);
        assert_eq!(rule.scope, RuleScope::Global);
        assert!(Uuid::parse_str(&rule.id).is_ok());
    }

    #[test]
    fn test_fresh_ids_differ() {
        let rule = Rule::new("a", "b");
        let copy = rule.clone().with_fresh_id();
        assert_ne!(rule.id, copy.id);
        assert_eq!(rule.original_text, copy.original_text);
    }

    #[test]
    fn test_rule_uses_exchange_field_names() {
        let rule = Rule::new("x", "y").with_scope(RuleScope::Project);
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["originalText"], "x");
        assert_eq!(value["replacementText"], "y");
        assert_eq!(value["isEnabled"], true);
        assert_eq!(value["isRegex"], false);
        assert_eq!(value["caseSensitive"], true);
        assert_eq!(value["scope"], "project");
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("File".parse::<RuleScope>().unwrap(), RuleScope::File);
        assert!("workspace".parse::<RuleScope>().is_err());
    }
}
