use crate::config::EngineConfig;
use crate::types::*;
use std::borrow::Cow;

use super::literal::LiteralRule;
use super::pattern::PatternRule;

/// A compiled substitution step. Implementations hold no mutable state,
/// so one compiled rule can be applied to any number of documents.
pub trait SubstitutionRule: Send + Sync {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str>;

    /// Rule kind for logging
    fn name(&self) -> &str;
}

struct CompiledRule {
    id: RuleId,
    step: Box<dyn SubstitutionRule>,
}

/// The enabled rules of one snapshot, compiled and kept in list order.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    diagnostics: Vec<RuleDiagnostic>,
}

impl RuleSet {
    /// Compile every enabled rule. Rules that fail to compile are left out
    /// and reported through `diagnostics()`; they never fail the whole set.
    pub fn compile(rules: &[Rule], config: &EngineConfig) -> Self {
        let mut compiled = Vec::new();
        let mut diagnostics = Vec::new();

        for rule in rules.iter().filter(|rule| rule.is_enabled) {
            let step: Result<Box<dyn SubstitutionRule>, regex::Error> = if rule.is_regex {
                PatternRule::new(rule, config.regex_size_limit)
                    .map(|r| Box::new(r) as Box<dyn SubstitutionRule>)
            } else {
                LiteralRule::new(rule)
                    .map(|r| Box::new(r) as Box<dyn SubstitutionRule>)
            };

            match step {
                Ok(step) => compiled.push(CompiledRule {
                    id: rule.id.clone(),
                    step,
                }),
                Err(e) => {
                    let diagnostic = RuleDiagnostic {
                        rule_id: rule.id.clone(),
                        pattern: rule.original_text.clone(),
                        message: e.to_string(),
                    };
                    tracing::warn!(
                        rule_id = %diagnostic.rule_id,
                        pattern = %diagnostic.pattern,
                        "skipping rule with invalid pattern: {}",
                        diagnostic.message
                    );
                    diagnostics.push(diagnostic);
                }
            }
        }

        Self {
            rules: compiled,
            diagnostics,
        }
    }

    /// Apply each compiled rule in order; rule i's output feeds rule i+1.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            if let Cow::Owned(replaced) = rule.step.apply(&current) {
                tracing::trace!(rule_id = %rule.id, kind = rule.step.name(), "rule changed text");
                current = replaced;
            }
        }
        current
    }

    /// Rules skipped at compile time
    pub fn diagnostics(&self) -> &[RuleDiagnostic] {
        &self.diagnostics
    }

    /// Number of rules that will actually run
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Stateless front door: compile a rule snapshot and run it over one text.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionEngine {
    config: EngineConfig,
}

impl SubstitutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile `rules` once for reuse across many documents
    pub fn compile(&self, rules: &[Rule]) -> RuleSet {
        RuleSet::compile(rules, &self.config)
    }

    /// Transform `text` with the enabled rules in `rules`. Never fails:
    /// invalid patterns are skipped and logged.
    pub fn obfuscate(&self, text: &str, rules: &[Rule]) -> String {
        self.compile(rules).apply(text)
    }

    /// Like `obfuscate`, but also returns the skipped-rule diagnostics
    pub fn obfuscate_with_report(&self, text: &str, rules: &[Rule]) -> Obfuscation {
        let rule_set = self.compile(rules);
        let output = rule_set.apply(text);
        Obfuscation {
            changed: output != text,
            text: output,
            diagnostics: rule_set.diagnostics,
        }
    }
}

/// Convenience wrapper using the default engine config
pub fn obfuscate(text: &str, rules: &[Rule]) -> String {
    SubstitutionEngine::new().obfuscate(text, rules)
}
