// Substitution rules module
// - engine.rs: SubstitutionRule trait, RuleSet compilation and SubstitutionEngine
// - literal.rs: exact-substring rules and metacharacter escaping
// - pattern.rs: user-supplied regex rules

pub mod engine;
pub mod literal;
pub mod pattern;

pub use engine::*;
pub use literal::{escape_literal, LiteralRule, REGEX_METACHARACTERS};
pub use pattern::PatternRule;
