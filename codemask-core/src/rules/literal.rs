use crate::types::Rule;
use regex::{NoExpand, Regex, RegexBuilder};
use std::borrow::Cow;

use super::engine::SubstitutionRule;

/// Characters that carry pattern meaning and are backslash-prefixed by `escape_literal`
pub const REGEX_METACHARACTERS: [char; 14] = [
    '\\', '.', '*', '+', '?', '^', '$', '(', ')', '[', ']', '{', '}', '|',
];

/// Escape every regex metacharacter in `text` by prefixing it with a backslash.
///
/// Purely textual: walks the characters once and never goes through the
/// pattern engine, so escaping cannot introduce new metacharacters.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if REGEX_METACHARACTERS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Exact-substring replacement. The replacement is always inserted verbatim.
pub struct LiteralRule {
    search: String,
    replacement: String,
    matcher: LiteralMatcher,
}

enum LiteralMatcher {
    /// Plain `str` search, case-sensitive
    Exact,
    /// Escaped pattern compiled with the case-insensitive flag
    CaseInsensitive(Regex),
}

impl LiteralRule {
    /// Built without the configured pattern size cap, so a literal of any
    /// length always compiles.
    pub fn new(rule: &Rule) -> Result<Self, regex::Error> {
        let matcher = if rule.case_sensitive {
            LiteralMatcher::Exact
        } else {
            let regex = RegexBuilder::new(&escape_literal(&rule.original_text))
                .case_insensitive(true)
                .size_limit(usize::MAX)
                .build()?;
            LiteralMatcher::CaseInsensitive(regex)
        };

        Ok(Self {
            search: rule.original_text.clone(),
            replacement: rule.replacement_text.clone(),
            matcher,
        })
    }
}

impl SubstitutionRule for LiteralRule {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        // Empty search text would match between every character
        if self.search.is_empty() {
            return Cow::Borrowed(text);
        }

        match &self.matcher {
            LiteralMatcher::Exact => {
                if text.contains(self.search.as_str()) {
                    Cow::Owned(text.replace(self.search.as_str(), &self.replacement))
                } else {
                    Cow::Borrowed(text)
                }
            }
            LiteralMatcher::CaseInsensitive(regex) => {
                regex.replace_all(text, NoExpand(&self.replacement))
            }
        }
    }

    fn name(&self) -> &str {
        match self.matcher {
            LiteralMatcher::Exact => "Literal",
            LiteralMatcher::CaseInsensitive(_) => "LiteralCaseInsensitive",
        }
    }
}
