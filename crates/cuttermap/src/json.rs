//! JSON in and out of the extraction record.

use cuttermap_core::{CutterMapError, ExtractionResult};

/// Pretty-printed JSON for an extraction (or an edited copy).
///
/// # Errors
///
/// [`CutterMapError::SerializationError`] if serialization fails.
pub fn to_json(result: &ExtractionResult) -> Result<String, CutterMapError> {
    serde_json::to_string_pretty(result).map_err(|e| CutterMapError::SerializationError(e.to_string()))
}

/// Parse an extraction record, e.g. one edited by a user.
///
/// # Errors
///
/// [`CutterMapError::SerializationError`] on malformed JSON or a shape
/// mismatch.
pub fn from_json(json: &str) -> Result<ExtractionResult, CutterMapError> {
    serde_json::from_str(json).map_err(|e| CutterMapError::SerializationError(e.to_string()))
}
