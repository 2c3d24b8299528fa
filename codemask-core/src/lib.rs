// Codemask Core Library
//
// Rule-driven text substitution: an ordered rule store with pluggable
// persistence, and an engine that applies the enabled rules to text.
// Hosts (CLI, editor integrations) read and write documents themselves.

pub mod types;
pub mod config;
pub mod errors;
pub mod rules;
pub mod serialization;
pub mod storage;
pub mod store;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::{CodemaskConfig, EngineConfig, FolderConfig};
pub use errors::StoreError;
pub use rules::{escape_literal, obfuscate, RuleSet, SubstitutionEngine, SubstitutionRule};
pub use storage::{FileStorage, MemoryStorage, NoOpStorage, RuleStorage};
pub use store::{RuleStore, SubscriptionId};
