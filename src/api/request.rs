use serde_json::Value as Json;

use crate::domain::RuleDefinition;

/// Decode a validation request body.
///
/// Any JSON value is accepted here; the projector rejects non-objects.
pub fn decode_document(body: &[u8]) -> Result<Json, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Decode an admin create-rule body: `{ "name": ..., "rule": {...} }`.
pub fn decode_rule(body: &[u8]) -> Result<RuleDefinition, serde_json::Error> {
    serde_json::from_slice(body)
}
