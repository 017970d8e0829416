//! JSON Schema validation for persisted phase-state documents
//!
//! The published schema ships with the crate and is compiled once; every
//! load and save goes through it so a schema-invalid document can never be
//! half-parsed into a `PhaseState`.

use jsonschema::Validator;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// Published schema for the persisted state document
pub const PHASE_STATE_SCHEMA: &str = include_str!("../../schemas/phase-state.schema.json");

fn validator() -> &'static Validator {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let schema: JsonValue =
            serde_json::from_str(PHASE_STATE_SCHEMA).expect("embedded schema is valid JSON");
        Validator::new(&schema).expect("embedded schema compiles")
    })
}

/// Validate a document against the phase-state schema.
///
/// Returns one message per violation, empty when the document conforms.
pub fn validate_document(document: &JsonValue) -> Vec<String> {
    validator()
        .iter_errors(document)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{}: {}", path, error)
            }
        })
        .collect()
}
