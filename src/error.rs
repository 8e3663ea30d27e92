//! Error taxonomy for the formsight pipeline.
//!
//! Failure handling follows a per-page isolation policy:
//!
//! - [`ParseError`] - extraction-tool JSON that does not match the agreed
//!   schema fails the whole submission immediately
//! - [`GeometryError`] - degenerate page bounds abort that page's
//!   normalization only; sibling pages continue
//! - [`InferenceError`] - a failed per-page call is recorded as an absent
//!   result and escalates at the join boundary
//! - [`PipelineError`] - document-level failures surfaced to the caller

use std::path::PathBuf;
use thiserror::Error;

/// Extraction-tool output that violates the agreed JSON schema.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read extraction file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction JSON does not match schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("page {page} object {index} has {count} type keys, expected exactly one")]
    ObjectDiscriminant {
        page: usize,
        index: usize,
        count: usize,
    },
}

/// Degenerate page bounds that make the document-to-pixel mapping undefined.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("page bounds have non-positive width: {width}")]
    DegenerateWidth { width: f64 },

    #[error("page bounds have non-positive height: {height}")]
    DegenerateHeight { height: f64 },
}

/// A single inference call that failed or produced unusable output.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("request to inference service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("inference service returned empty content")]
    EmptyContent,

    #[error("structured response did not parse: {0}")]
    UnparseableResponse(#[source] serde_json::Error),

    #[error("failed to read page image {path}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported image format: {path}")]
    UnsupportedImage { path: PathBuf },
}

/// Document-level pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("no page could be matched to a rendered image")]
    NoPages,

    #[error("inference incomplete: pages {pages:?} returned no structured result")]
    InferenceIncomplete { pages: Vec<u32> },

    #[error("document synthesis call failed")]
    Synthesis(#[source] InferenceError),

    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error at {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// I/O error with the offending path attached.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
