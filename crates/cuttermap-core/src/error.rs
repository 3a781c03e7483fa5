//! Error and warning types for cuttermap.
//!
//! [`CutterMapError`] covers fatal conditions that stop an extraction or a
//! regeneration. [`ExtractWarning`] records non-fatal issues (a broken image,
//! an unreadable drawing) that are skipped while the rest of the page is
//! still processed.

use std::fmt;

/// Fatal error types.
#[derive(Debug, Clone, PartialEq)]
pub enum CutterMapError {
    /// The PDF could not be parsed or has no usable first page.
    ParseError(String),
    /// I/O error reading input or writing output.
    IoError(String),
    /// Every rendering path failed, or a renderer failed unexpectedly.
    RenderError(String),
    /// JSON (de)serialization failed.
    SerializationError(String),
    /// A document lifecycle transition that the record does not allow.
    InvalidState(String),
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for CutterMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutterMapError::ParseError(msg) => write!(f, "parse error: {msg}"),
            CutterMapError::IoError(msg) => write!(f, "I/O error: {msg}"),
            CutterMapError::RenderError(msg) => write!(f, "render error: {msg}"),
            CutterMapError::SerializationError(msg) => write!(f, "serialization error: {msg}"),
            CutterMapError::InvalidState(msg) => write!(f, "invalid document state: {msg}"),
            CutterMapError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CutterMapError {}

impl From<std::io::Error> for CutterMapError {
    fn from(err: std::io::Error) -> Self {
        CutterMapError::IoError(err.to_string())
    }
}

/// Machine-readable warning code for categorizing extraction issues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// A referenced font was not found in page resources.
    MissingFont,
    /// An image XObject could not be read.
    ImageSkipped,
    /// A drawing (form XObject or path) could not be read.
    DrawingSkipped,
    /// A PDF object is malformed or has unexpected structure.
    MalformedObject,
    /// Form XObject nesting exceeded the configured depth.
    ResourceLimitReached,
    /// An image was found but its pixels could not be decoded into an icon.
    IconDecodeFailed,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl ExtractWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::ImageSkipped => "IMAGE_SKIPPED",
            ExtractWarningCode::DrawingSkipped => "DRAWING_SKIPPED",
            ExtractWarningCode::MalformedObject => "MALFORMED_OBJECT",
            ExtractWarningCode::ResourceLimitReached => "RESOURCE_LIMIT_REACHED",
            ExtractWarningCode::IconDecodeFailed => "ICON_DECODE_FAILED",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered during extraction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// Machine-readable warning code.
    pub code: ExtractWarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// Element context (e.g. "XObject /Im3").
    pub element: Option<String>,
}

impl ExtractWarning {
    /// Create a warning with just a description.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            element: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            element: None,
        }
    }

    /// Attach the element the warning refers to.
    pub fn for_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(ref element) = self.element {
            write!(f, " ({element})")?;
        }
        Ok(())
    }
}
