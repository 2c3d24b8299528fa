use crate::types::Rule;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

use super::engine::SubstitutionRule;

// PatternRule - user-supplied regex, replacement expanded with capture groups
pub struct PatternRule {
    regex: Regex,
    replacement: String,
}

impl PatternRule {
    pub fn new(rule: &Rule, size_limit: usize) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&rule.original_text)
            .case_insensitive(!rule.case_sensitive)
            .size_limit(size_limit)
            .build()?;

        Ok(Self {
            regex,
            replacement: rule.replacement_text.clone(),
        })
    }
}

impl SubstitutionRule for PatternRule {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        // `$1`, `${name}` and `$0` expand; `$$` is a literal dollar
        self.regex.replace_all(text, self.replacement.as_str())
    }

    fn name(&self) -> &str {
        "Pattern"
    }
}
