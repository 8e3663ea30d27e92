//! Data models and inference clients.
//!
//! This module defines:
//!
//! - [`FormAnalysis`] - the structured schema negotiated with the inference
//!   service: detected blank form-field regions, an optional signature-pad
//!   region, and an ordered workflow step list (camelCase on the wire)
//! - [`PageInferenceResult`] / [`DocumentResult`] - per-page and terminal
//!   pipeline artifacts
//! - [`InferenceCapability`] - the abstract capability "given a text prompt
//!   and an optional image, return a textual response"
//! - [`ImageAttachment`] - a page image prepared for an inference call
//!
//! ## Client submodules
//!
//! - [`openai`] - GPT-4o chat-completions client
//! - [`claude`] - Anthropic messages-API client

pub mod claude;
pub mod openai;

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;

/// A detected rectangle in image-pixel space, as the inference service
/// reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A blank form field the model located on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankComponent {
    /// Nearby label text identifying the field, when the model found one.
    #[serde(default)]
    pub label: Option<String>,
    pub coordinates: Coordinates,
}

/// The signature-pad region, when present on the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePadText {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// One step of the workflow the document encodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub step: u32,
    pub description: String,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Structured inference output for one page or for the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalysis {
    #[serde(default)]
    pub blank_components: Vec<BlankComponent>,
    #[serde(default)]
    pub signature_pad_text: Option<SignaturePadText>,
    #[serde(default)]
    pub workflow: Vec<WorkflowStep>,
}

/// Per-page inference outcome. `structured` is absent when the call failed
/// or returned unparseable output; the orchestrator escalates that at the
/// join boundary rather than dropping it silently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInferenceResult {
    pub page_number: u32,
    pub structured: Option<FormAnalysis>,
    pub raw: Option<String>,
}

/// The terminal pipeline artifact: ordered per-page results plus the
/// whole-document synthesis. Create-once, read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub pages: Vec<PageInferenceResult>,
    pub synthesis: FormAnalysis,
    pub synthesis_raw: String,
}

/// A page image read into memory for an inference call.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub data: Vec<u8>,
    pub media_type: &'static str,
}

impl ImageAttachment {
    /// Load a page image, deriving the MIME type from the file extension.
    ///
    /// # Errors
    ///
    /// Fails for unsupported extensions or unreadable files.
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let media_type = match path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => {
                return Err(InferenceError::UnsupportedImage {
                    path: path.to_path_buf(),
                })
            }
        };

        let data = std::fs::read(path).map_err(|source| InferenceError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { data, media_type })
    }

    /// Base64 payload for the wire.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// The external inference capability: one text prompt, an optional page
/// image, one textual response. Invoked up to `page_count + 1` times per
/// document, concurrently for the per-page batch.
pub trait InferenceCapability {
    fn call(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> impl Future<Output = Result<String, InferenceError>> + Send;
}

/// Concrete inference provider, selected by name at the CLI boundary.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiClient),
    Claude(claude::ClaudeClient),
}

impl Provider {
    /// Resolve a provider by its user-facing name, reading the matching API
    /// key from the environment.
    ///
    /// # Errors
    ///
    /// Fails for unknown names or a missing API key variable.
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        match name.to_lowercase().as_str() {
            "openai" | "gpt-4o" | "gpt4o" => {
                let key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
                Ok(Self::OpenAi(openai::OpenAiClient::new(key)))
            }
            "claude" | "anthropic" => {
                let key = std::env::var("ANTHROPIC_API_KEY")
                    .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;
                Ok(Self::Claude(claude::ClaudeClient::new(key)))
            }
            other => anyhow::bail!("unsupported provider '{other}'. Valid options: openai, claude"),
        }
    }
}

impl InferenceCapability for Provider {
    async fn call(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, InferenceError> {
        match self {
            Self::OpenAi(client) => client.complete(prompt, image).await,
            Self::Claude(client) => client.complete(prompt, image).await,
        }
    }
}

/// Parse a structured response out of raw model output.
///
/// # Errors
///
/// Returns [`InferenceError::UnparseableResponse`] when the payload is not a
/// valid [`FormAnalysis`] instance.
pub fn convert_response(raw: &str) -> Result<FormAnalysis, InferenceError> {
    let json = extract_json(raw);
    serde_json::from_str(&json).map_err(InferenceError::UnparseableResponse)
}

/// Extract JSON from model output, tolerating markdown code fences and
/// surrounding prose.
pub(crate) fn extract_json(text: &str) -> String {
    let text = text.trim();

    if text.starts_with("```") {
        if let Some(start) = text.find('\n') {
            let after_first_line = &text[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}
