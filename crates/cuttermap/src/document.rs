//! The per-upload document record and its lifecycle helpers.
//!
//! A [`CutterMapDocument`] owns the original PDF bytes, the first
//! extraction and any edited copy. The helpers only record transitions the
//! caller asks for; nothing here talks to storage.

use cuttermap_core::{CutterMapError, ExtractionResult, validate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::render::RenderedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Uploaded,
    Extracted,
    Edited,
    Generated,
    Synced,
}

/// A regenerated file kept on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub backend: String,
    pub file_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl From<RenderedFile> for GeneratedFile {
    fn from(file: RenderedFile) -> Self {
        Self {
            backend: file.backend,
            file_type: file.file_type,
            bytes: file.bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutterMapDocument {
    #[serde(skip)]
    original: Vec<u8>,
    pub extracted_data: Option<ExtractionResult>,
    pub edited_data: Option<ExtractionResult>,
    pub status: DocumentStatus,
    #[serde(default)]
    pub generated: Vec<GeneratedFile>,
}

impl CutterMapDocument {
    pub fn new(original: Vec<u8>) -> Self {
        Self {
            original,
            extracted_data: None,
            edited_data: None,
            status: DocumentStatus::Uploaded,
            generated: Vec::new(),
        }
    }

    /// The uploaded PDF, exactly as received.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// The edited data if any, else the extraction.
    pub fn effective_data(&self) -> Option<&ExtractionResult> {
        self.edited_data.as_ref().or(self.extracted_data.as_ref())
    }

    pub fn record_extraction(&mut self, result: ExtractionResult) {
        self.extracted_data = Some(result);
        self.edited_data = None;
        self.status = DocumentStatus::Extracted;
    }

    /// Store an edited copy, re-validating its summary against its blades.
    ///
    /// # Errors
    ///
    /// [`CutterMapError::InvalidState`] when nothing has been extracted yet.
    pub fn apply_edit(&mut self, mut edited: ExtractionResult) -> Result<&ExtractionResult, CutterMapError> {
        if self.extracted_data.is_none() {
            return Err(CutterMapError::InvalidState(
                "cannot edit a document before extraction".to_string(),
            ));
        }
        edited.validation = validate(&edited.summary, &edited.blades);
        debug!(valid = edited.validation.is_valid, "applied edit");
        self.status = DocumentStatus::Edited;
        Ok(self.edited_data.insert(edited))
    }

    /// # Errors
    ///
    /// [`CutterMapError::InvalidState`] when nothing has been extracted yet.
    pub fn record_generation(&mut self, file: impl Into<GeneratedFile>) -> Result<(), CutterMapError> {
        if self.effective_data().is_none() {
            return Err(CutterMapError::InvalidState(
                "cannot generate a document without extracted data".to_string(),
            ));
        }
        self.generated.push(file.into());
        self.status = DocumentStatus::Generated;
        Ok(())
    }

    pub fn mark_synced(&mut self) {
        self.status = DocumentStatus::Synced;
    }
}

#[cfg(test)]
mod tests {
    use cuttermap_core::BomRow;

    use super::*;

    fn row(index: u32, count: u32) -> BomRow {
        BomRow {
            index,
            count,
            ..Default::default()
        }
    }

    #[test]
    fn new_document_is_uploaded() {
        let doc = CutterMapDocument::new(b"%PDF".to_vec());
        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert_eq!(doc.original(), b"%PDF");
        assert!(doc.effective_data().is_none());
    }

    #[test]
    fn edit_before_extraction_is_rejected() {
        let mut doc = CutterMapDocument::new(Vec::new());
        let err = doc.apply_edit(ExtractionResult::default()).unwrap_err();
        assert!(matches!(err, CutterMapError::InvalidState(_)));
        assert_eq!(doc.status, DocumentStatus::Uploaded);
    }

    #[test]
    fn edits_are_revalidated_and_preferred() {
        let mut doc = CutterMapDocument::new(Vec::new());
        doc.record_extraction(ExtractionResult::default());
        let mut edited = ExtractionResult::default();
        edited.summary = vec![row(1, 2)];
        let validation = &doc.apply_edit(edited).unwrap().validation;
        assert!(!validation.is_valid);
        assert_eq!(validation.bom_only, vec![1]);
        assert_eq!(doc.status, DocumentStatus::Edited);
        assert_eq!(doc.effective_data().unwrap().summary.len(), 1);
        assert!(doc.extracted_data.as_ref().unwrap().summary.is_empty());
    }

    #[test]
    fn lifecycle_reaches_synced() {
        let mut doc = CutterMapDocument::new(Vec::new());
        assert!(
            doc.record_generation(GeneratedFile {
                backend: "html".into(),
                file_type: "html".into(),
                bytes: Vec::new(),
            })
            .is_err()
        );
        doc.record_extraction(ExtractionResult::default());
        doc.record_generation(RenderedFile {
            bytes: b"%PDF".to_vec(),
            backend: "native".into(),
            file_type: "pdf".into(),
        })
        .unwrap();
        assert_eq!(doc.status, DocumentStatus::Generated);
        doc.mark_synced();
        assert_eq!(doc.status, DocumentStatus::Synced);
        assert_eq!(doc.generated[0].backend, "native");
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&DocumentStatus::Generated).unwrap(),
            "\"GENERATED\""
        );
    }
}
