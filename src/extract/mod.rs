//! Typed schema for extraction-tool output.
//!
//! The external extraction tool emits one JSON document per source file:
//!
//! ```json
//! {
//!   "pages": [
//!     {
//!       "bounds": {"left": 0.0, "top": 0.0, "right": 612.0, "bottom": 792.0},
//!       "objects": [
//!         {"word": {"source": {"bounding_box": {...}, "text": "Hello"}}}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Each raw object is a single-entry map whose key is the object's type
//! discriminant (`word`, `line`, `figure`, ...). Parsing validates that
//! invariant up front and fails with a typed [`ParseError`] instead of
//! surfacing a traversal panic later in the pipeline.

use crate::error::ParseError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A rectangle in document coordinate space, corner form.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DocBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl DocBounds {
    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Payload nested under an object's type key.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSource {
    pub bounding_box: DocBounds,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawObjectBody {
    pub source: RawSource,
}

/// One positioned primitive as the extraction tool reports it: a map from
/// the type discriminant to the payload. Exactly one entry is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawObject(pub BTreeMap<String, RawObjectBody>);

impl RawObject {
    /// The single `(type, payload)` entry.
    ///
    /// Callers go through [`parse_extraction`], which has already rejected
    /// documents violating the single-key invariant, so this only returns
    /// `None` for a hand-built empty object.
    pub fn entry(&self) -> Option<(&str, &RawObjectBody)> {
        let mut it = self.0.iter();
        match (it.next(), it.next()) {
            (Some((k, v)), None) => Some((k.as_str(), v)),
            _ => None,
        }
    }
}

/// One page of extraction output.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub bounds: DocBounds,
    #[serde(default)]
    pub objects: Vec<RawObject>,
}

/// A whole extracted document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

/// Parse and validate extraction-tool JSON from a string.
///
/// # Errors
///
/// Returns [`ParseError::Schema`] when the JSON shape is wrong and
/// [`ParseError::ObjectDiscriminant`] when any object does not carry exactly
/// one type key.
pub fn parse_extraction(json: &str) -> Result<RawDocument, ParseError> {
    let document: RawDocument = serde_json::from_str(json)?;

    for (page_idx, page) in document.pages.iter().enumerate() {
        for (obj_idx, object) in page.objects.iter().enumerate() {
            if object.0.len() != 1 {
                return Err(ParseError::ObjectDiscriminant {
                    page: page_idx,
                    index: obj_idx,
                    count: object.0.len(),
                });
            }
        }
    }

    Ok(document)
}

/// Parse extraction-tool JSON from a file.
///
/// # Errors
///
/// Returns [`ParseError::Read`] when the file cannot be read, otherwise the
/// errors of [`parse_extraction`].
pub fn parse_extraction_file(path: &Path) -> Result<RawDocument, ParseError> {
    let json = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_extraction(&json)
}

/// Derive the document base name used by the page-image filename convention.
///
/// The extraction tool names its output `<base>___preprocessed.json`; when
/// the suffix is absent the file stem is used as-is.
pub fn document_base_name(extraction_path: &Path) -> String {
    let name = extraction_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    name.strip_suffix("___preprocessed.json")
        .map(str::to_owned)
        .unwrap_or_else(|| {
            extraction_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"{
        "pages": [{
            "bounds": {"left": 0.0, "top": 0.0, "right": 612.0, "bottom": 792.0},
            "objects": [
                {"word": {"source": {"bounding_box": {"left": 10.0, "top": 20.0, "right": 60.0, "bottom": 32.0}, "text": "Hello"}}},
                {"figure": {"source": {"bounding_box": {"left": 100.0, "top": 200.0, "right": 300.0, "bottom": 400.0}}}}
            ]
        }]
    }"#;

    #[test]
    fn test_parse_valid_document() {
        let doc = parse_extraction(SAMPLE).unwrap();
        assert_eq!(doc.pages.len(), 1);

        let page = &doc.pages[0];
        assert_eq!(page.bounds.width(), 612.0);
        assert_eq!(page.bounds.height(), 792.0);
        assert_eq!(page.objects.len(), 2);

        let (kind, body) = page.objects[0].entry().unwrap();
        assert_eq!(kind, "word");
        assert_eq!(body.source.text.as_deref(), Some("Hello"));

        // text is optional; figures carry none
        let (kind, body) = page.objects[1].entry().unwrap();
        assert_eq!(kind, "figure");
        assert!(body.source.text.is_none());
    }

    #[test]
    fn test_reject_multi_key_object() {
        let json = r#"{
            "pages": [{
                "bounds": {"left": 0, "top": 0, "right": 100, "bottom": 100},
                "objects": [{
                    "word": {"source": {"bounding_box": {"left": 0, "top": 0, "right": 1, "bottom": 1}}},
                    "line": {"source": {"bounding_box": {"left": 0, "top": 0, "right": 1, "bottom": 1}}}
                }]
            }]
        }"#;
        let err = parse_extraction(json).unwrap_err();
        assert!(matches!(
            err,
            ParseError::ObjectDiscriminant { page: 0, index: 0, count: 2 }
        ));
    }

    #[test]
    fn test_reject_malformed_json() {
        assert!(matches!(
            parse_extraction("{\"pages\": 3}").unwrap_err(),
            ParseError::Schema(_)
        ));
    }

    #[test]
    fn test_document_base_name() {
        assert_eq!(
            document_base_name(&PathBuf::from("/tmp/lease___preprocessed.json")),
            "lease"
        );
        assert_eq!(
            document_base_name(&PathBuf::from("/tmp/lease.json")),
            "lease"
        );
    }
}
