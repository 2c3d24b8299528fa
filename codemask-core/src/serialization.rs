use crate::errors::StoreError;
use crate::types::Rule;

// Exchange format: a JSON array of rule records with camelCase fields.
// Export writes the list verbatim (ids included); import validates the
// whole payload before anything touches the store.

/// Serialize the full rule list, disabled rules included
pub fn rules_to_json(rules: &[Rule]) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(rules)?)
}

/// Parse an exported rule list. Any shape mismatch fails the whole payload.
pub fn rules_from_json(source: &str) -> Result<Vec<Rule>, StoreError> {
    serde_json::from_str(source).map_err(|e| StoreError::MalformedImport(e.to_string()))
}
