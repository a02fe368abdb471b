//! Error types for docxfill library.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for docxfill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while analyzing templates and composing documents.
///
/// Only conditions that abort a conversion are errors. Discovery misses
/// (missing style part, unknown style role, unusable LLM output) are
/// reported through provenance flags and plan warnings instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as an OOXML package.
    #[error("Unknown file format: not a valid DOCX package")]
    UnknownFormat,

    /// Error reading or writing the ZIP container.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Error tokenizing package XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A required package part is missing.
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// A package part is present but malformed.
    #[error("Invalid part: {0}")]
    InvalidPart(String),

    /// Encoding error (markup that is not valid UTF-8).
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Unknown placeholder pattern name.
    #[error("Invalid placeholder pattern: {0}")]
    InvalidPattern(String),

    /// The LLM transport failed or answered with an unusable payload.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The LLM transport did not answer within the configured timeout.
    #[error("LLM request timed out after {0:?}")]
    LlmTimeout(Duration),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "llm")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Llm(format!("request timed out: {}", err))
        } else {
            Error::Llm(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownFormat;
        assert_eq!(
            err.to_string(),
            "Unknown file format: not a valid DOCX package"
        );

        let err = Error::MissingPart("word/document.xml".into());
        assert_eq!(err.to_string(), "Missing required part: word/document.xml");

        let err = Error::LlmTimeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "LLM request timed out after 2s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
