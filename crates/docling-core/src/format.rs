//! Input format types for document conversion.
//!
//! This module defines the [`InputFormat`] enum covering the document formats
//! this pipeline's core accepts. Format-specific raw-byte parsing lives outside
//! the core (see the `docling-providers` crate); this type is the shared
//! vocabulary used by format detection, error reporting, and metadata.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input document format, detected by magic bytes first, extension second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputFormat {
    /// PDF document
    #[serde(rename = "PDF")]
    Pdf,
    /// Microsoft Word document (.docx)
    #[serde(rename = "DOCX")]
    Docx,
    /// Microsoft `PowerPoint` (.pptx)
    #[serde(rename = "PPTX")]
    Pptx,
    /// Generic XML document
    #[serde(rename = "XML")]
    Xml,
    /// HTML document
    #[serde(rename = "HTML")]
    Html,
}

impl InputFormat {
    /// Magic-byte sniffers, tried in order before falling back to the extension.
    ///
    /// Returns `None` when neither signature nor extension is recognized.
    #[must_use = "returns the detected format, if any"]
    pub fn detect(bytes: &[u8], path: Option<&Path>) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(Self::Pdf);
        }
        if bytes.starts_with(b"PK\x03\x04") {
            // Zip-based OOXML: distinguish by extension since the magic bytes
            // are shared by docx/pptx/xlsx/odt/etc.
            if let Some(ext) = path.and_then(Path::extension).and_then(|e| e.to_str()) {
                match ext.to_ascii_lowercase().as_str() {
                    "docx" => return Some(Self::Docx),
                    "pptx" => return Some(Self::Pptx),
                    _ => {}
                }
            }
        }
        let trimmed = leading_ascii_whitespace_trimmed(bytes);
        if trimmed.starts_with(b"<?xml") {
            if let Some(ext) = path.and_then(Path::extension).and_then(|e| e.to_str()) {
                if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm") {
                    return Some(Self::Html);
                }
            }
            return Some(Self::Xml);
        }
        if looks_like_html(trimmed) {
            return Some(Self::Html);
        }
        Self::from_extension(path?)
    }

    /// Falls back to the file extension when magic bytes are inconclusive.
    #[must_use = "returns the format inferred from the file extension, if any"]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "xml" => Some(Self::Xml),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

fn leading_ascii_whitespace_trimmed(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let lower: Vec<u8> = head.to_ascii_lowercase();
    lower.starts_with(b"<!doctype html") || lower.starts_with(b"<html")
}

impl std::fmt::Display for InputFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Xml => "xml",
            Self::Html => "html",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_by_magic_bytes() {
        assert_eq!(InputFormat::detect(b"%PDF-1.7\n...", None), Some(InputFormat::Pdf));
    }

    #[test]
    fn detects_docx_by_extension_when_zip() {
        let path = Path::new("report.docx");
        assert_eq!(
            InputFormat::detect(b"PK\x03\x04rest", Some(path)),
            Some(InputFormat::Docx)
        );
    }

    #[test]
    fn detects_html_doctype() {
        assert_eq!(
            InputFormat::detect(b"<!DOCTYPE html><html></html>", None),
            Some(InputFormat::Html)
        );
    }

    #[test]
    fn detects_xml_with_html_extension_as_html() {
        let path = Path::new("page.html");
        assert_eq!(
            InputFormat::detect(b"<?xml version=\"1.0\"?><html/>", Some(path)),
            Some(InputFormat::Html)
        );
    }

    #[test]
    fn falls_back_to_extension() {
        assert_eq!(
            InputFormat::detect(b"unrecognizable bytes", Some(Path::new("doc.xml"))),
            Some(InputFormat::Xml)
        );
    }

    #[test]
    fn returns_none_when_unrecognized() {
        assert_eq!(InputFormat::detect(b"\x00\x01\x02", None), None);
    }
}
