//! DOCX package detection and validation.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Content type of a regular WordprocessingML main part.
pub const DOCUMENT_MAIN: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
/// Content type of a WordprocessingML template main part (`.dotx`).
pub const TEMPLATE_MAIN: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
/// Content type of a macro-enabled document main part (`.docm`).
pub const MACRO_DOCUMENT_MAIN: &str = "application/vnd.ms-word.document.macroEnabled.main+xml";
/// Content type of a macro-enabled template main part (`.dotm`).
pub const MACRO_TEMPLATE_MAIN: &str =
    "application/vnd.ms-word.template.macroEnabledTemplate.main+xml";

/// ZIP local file header magic: PK\x03\x04
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// ZIP end-of-central-directory magic of an empty archive: PK\x05\x06
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";

const CONTENT_TYPES: &str = "[Content_Types].xml";

/// Kind of WordprocessingML package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Regular document (`.docx`)
    Document,
    /// Template (`.dotx`)
    Template,
    /// Macro-enabled document (`.docm`)
    MacroEnabledDocument,
    /// Macro-enabled template (`.dotm`)
    MacroEnabledTemplate,
}

impl PackageKind {
    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            DOCUMENT_MAIN => Some(Self::Document),
            TEMPLATE_MAIN => Some(Self::Template),
            MACRO_DOCUMENT_MAIN => Some(Self::MacroEnabledDocument),
            MACRO_TEMPLATE_MAIN => Some(Self::MacroEnabledTemplate),
            _ => None,
        }
    }

    /// Content type declared for the main part of this kind.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Document => DOCUMENT_MAIN,
            Self::Template => TEMPLATE_MAIN,
            Self::MacroEnabledDocument => MACRO_DOCUMENT_MAIN,
            Self::MacroEnabledTemplate => MACRO_TEMPLATE_MAIN,
        }
    }

    /// The document kind a filled copy of this package should declare.
    pub fn as_document(&self) -> Self {
        match self {
            Self::Document | Self::Template => Self::Document,
            Self::MacroEnabledDocument | Self::MacroEnabledTemplate => Self::MacroEnabledDocument,
        }
    }

    /// Whether this package is a template rather than a document.
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template | Self::MacroEnabledTemplate)
    }
}

/// DOCX format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFormat {
    /// Package kind from the main part's declared content type
    pub kind: PackageKind,
    /// Main part name as declared in `[Content_Types].xml`, without leading slash
    pub main_part: Option<String>,
}

impl std::fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.kind {
            PackageKind::Document => "DOCX document",
            PackageKind::Template => "DOTX template",
            PackageKind::MacroEnabledDocument => "DOCM document",
            PackageKind::MacroEnabledTemplate => "DOTM template",
        };
        f.write_str(label)
    }
}

/// Detect DOCX format from a file path.
///
/// # Example
/// ```no_run
/// use docxfill::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("template.docx").unwrap();
/// println!("{}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PackageFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    detect_format_from_bytes(&data)
}

/// Detect DOCX format from the complete package bytes.
///
/// # Returns
/// * `Ok(PackageFormat)` if the data is a ZIP archive declaring a WordprocessingML main part
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PackageFormat> {
    if !is_zip_bytes(data) {
        return Err(Error::UnknownFormat);
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut xml = String::new();
    match archive.by_name(CONTENT_TYPES) {
        Ok(mut file) => {
            file.read_to_string(&mut xml)?;
        }
        Err(_) => return Err(Error::UnknownFormat),
    }

    format_from_content_types(&xml).ok_or(Error::UnknownFormat)
}

/// Read the package kind from a `[Content_Types].xml` document.
pub fn format_from_content_types(xml: &str) -> Option<PackageFormat> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"Override" => {
                let mut part_name = None;
                let mut kind = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"PartName" => {
                            part_name = Some(
                                String::from_utf8_lossy(&attr.value)
                                    .trim_start_matches('/')
                                    .to_string(),
                            );
                        }
                        b"ContentType" => {
                            kind = PackageKind::from_content_type(&String::from_utf8_lossy(
                                &attr.value,
                            ));
                        }
                        _ => {}
                    }
                }
                if let Some(kind) = kind {
                    return Some(PackageFormat {
                        kind,
                        main_part: part_name,
                    });
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Check if a file is a WordprocessingML package.
pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start like a ZIP archive.
pub fn is_zip_bytes(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC) || data.starts_with(ZIP_EMPTY_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/main.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml"/>
</Types>"#;

    #[test]
    fn test_format_from_content_types() {
        let format = format_from_content_types(CONTENT_TYPES_XML).unwrap();
        assert_eq!(format.kind, PackageKind::Template);
        assert_eq!(format.main_part.as_deref(), Some("word/main.xml"));
        assert_eq!(format.to_string(), "DOTX template");
    }

    #[test]
    fn test_format_without_main_part() {
        let xml = r#"<Types><Default Extension="xml" ContentType="application/xml"/></Types>"#;
        assert!(format_from_content_types(xml).is_none());
    }

    #[test]
    fn test_detect_invalid_format() {
        let data = b"<!DOCTYPE html>";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        let data = b"PK";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_is_zip_bytes() {
        assert!(is_zip_bytes(b"PK\x03\x04rest"));
        assert!(is_zip_bytes(b"PK\x05\x06"));
        assert!(!is_zip_bytes(b"%PDF-1.7"));
        assert!(!is_zip_bytes(b""));
    }

    #[test]
    fn test_kind_as_document() {
        assert_eq!(PackageKind::Template.as_document(), PackageKind::Document);
        assert_eq!(
            PackageKind::MacroEnabledTemplate.as_document(),
            PackageKind::MacroEnabledDocument
        );
        assert!(PackageKind::Template.is_template());
        assert!(!PackageKind::Document.is_template());
        assert_eq!(PackageKind::Document.content_type(), DOCUMENT_MAIN);
    }
}
