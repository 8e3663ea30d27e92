//! Bounded-concurrency inference orchestration.
//!
//! Fans out one vision call per page over the configured inference
//! capability, then makes a single whole-document synthesis call:
//!
//! - **Fan-out**: at most `min(page_count, max_concurrency)` calls are in
//!   flight at once (default 5, bounding outbound pressure on the service).
//!   Each call is independent; a failure yields an absent result for that
//!   page only and never cancels siblings.
//! - **Join**: every dispatched call completes (or records its failure)
//!   before the pipeline proceeds; result order is page order regardless of
//!   completion order.
//! - **Hard fail**: any page without a structured result fails the whole
//!   submission with [`PipelineError::InferenceIncomplete`]. Partial
//!   per-page successes are discarded, not surfaced.
//! - **Synthesis**: one further call over the concatenated pseudo-text of
//!   all pages; its failure is fatal as well.
//!
//! No shared mutable state crosses tasks: each call owns its page's input
//! and produces its own output slot.

use crate::error::PipelineError;
use crate::layout::{reconstruct_page, LayoutConfig};
use crate::models::{
    convert_response, DocumentResult, ImageAttachment, InferenceCapability, PageInferenceResult,
};
use crate::output::assemble_document;
use crate::page::PageLayout;
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Orchestration tunables, passed explicitly rather than read from
/// process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Ceiling on simultaneously in-flight per-page inference calls.
    pub max_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_concurrency: 5 }
    }
}

/// Everything one per-page inference call needs, prepared up front so the
/// call owns its input outright.
#[derive(Debug, Clone)]
pub struct PagePromptInput {
    pub page_number: u32,
    pub image_path: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    /// The page's pseudo-text lines joined by newline.
    pub pseudo_text: String,
    /// The page's normalized objects serialized as JSON.
    pub objects_json: String,
}

impl PagePromptInput {
    /// Derive the prompt inputs for one page layout.
    ///
    /// # Errors
    ///
    /// Fails only when the normalized objects cannot be serialized.
    pub fn from_layout(
        layout: &PageLayout,
        config: &LayoutConfig,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            page_number: layout.page_number,
            image_path: layout.image_path.clone(),
            image_width: layout.image_width,
            image_height: layout.image_height,
            pseudo_text: reconstruct_page(&layout.objects, config).join("\n"),
            objects_json: serde_json::to_string(&layout.objects)?,
        })
    }
}

/// Drives the per-page fan-out and the document synthesis call.
pub struct InferenceOrchestrator<'a, C> {
    capability: &'a C,
    config: OrchestratorConfig,
}

impl<'a, C: InferenceCapability + Sync> InferenceOrchestrator<'a, C> {
    pub fn new(capability: &'a C, config: OrchestratorConfig) -> Self {
        Self { capability, config }
    }

    /// Run the whole inference stage and assemble the document result.
    ///
    /// # Errors
    ///
    /// Fails with [`PipelineError::InferenceIncomplete`] when any page lacks
    /// a structured result and [`PipelineError::Synthesis`] when the
    /// document-level call fails.
    pub async fn run(&self, pages: &[PagePromptInput]) -> Result<DocumentResult, PipelineError> {
        let concurrency = pages.len().min(self.config.max_concurrency).max(1);
        info!(
            "dispatching {} page calls, {} in flight at most",
            pages.len(),
            concurrency
        );

        // buffered() bounds in-flight futures and yields in input order, so
        // the join produces page order for free.
        let results: Vec<PageInferenceResult> =
            futures::stream::iter(pages.iter().map(|page| self.analyze_page(page)))
                .buffered(concurrency)
                .collect()
                .await;

        let failed: Vec<u32> = results
            .iter()
            .filter(|r| r.structured.is_none())
            .map(|r| r.page_number)
            .collect();
        if !failed.is_empty() {
            return Err(PipelineError::InferenceIncomplete { pages: failed });
        }

        let combined: Vec<&str> = pages.iter().map(|p| p.pseudo_text.as_str()).collect();
        let synthesis_prompt = workflow_prompt(&combined.join("\n"));

        let synthesis_raw = self
            .capability
            .call(&synthesis_prompt, None)
            .await
            .map_err(PipelineError::Synthesis)?;
        let synthesis = convert_response(&synthesis_raw).map_err(PipelineError::Synthesis)?;

        info!(
            "inference complete: {} pages, {} workflow steps",
            results.len(),
            synthesis.workflow.len()
        );

        Ok(assemble_document(results, synthesis, synthesis_raw))
    }

    /// One per-page call. Never fails outright: every failure path records
    /// an absent structured result for the join boundary to judge.
    async fn analyze_page(&self, page: &PagePromptInput) -> PageInferenceResult {
        let prompt = per_page_prompt(page);

        let image = match ImageAttachment::from_path(&page.image_path) {
            Ok(image) => image,
            Err(e) => {
                warn!("page {}: {e}", page.page_number);
                return PageInferenceResult {
                    page_number: page.page_number,
                    structured: None,
                    raw: None,
                };
            }
        };

        match self.capability.call(&prompt, Some(&image)).await {
            Ok(raw) => match convert_response(&raw) {
                Ok(structured) => PageInferenceResult {
                    page_number: page.page_number,
                    structured: Some(structured),
                    raw: Some(raw),
                },
                Err(e) => {
                    warn!("page {}: {e}", page.page_number);
                    PageInferenceResult {
                        page_number: page.page_number,
                        structured: None,
                        raw: Some(raw),
                    }
                }
            },
            Err(e) => {
                warn!("page {}: inference call failed: {e}", page.page_number);
                PageInferenceResult {
                    page_number: page.page_number,
                    structured: None,
                    raw: None,
                }
            }
        }
    }
}

/// Format-instruction block shared by both prompts, describing the agreed
/// structured-result schema.
const FORMAT_INSTRUCTIONS: &str = r#"Respond with a JSON object of this exact shape:
{
  "blankComponents": [
    {"label": "<nearby label text or null>", "coordinates": {"x": <number>, "y": <number>, "width": <number>, "height": <number>}}
  ],
  "signaturePadText": {"text": "<text near the signature pad or null>", "coordinates": {"x": <number>, "y": <number>, "width": <number>, "height": <number>}} or null,
  "workflow": [
    {"step": <number>, "description": "<what happens in this step>", "actor": "<who performs it or null>"}
  ]
}

Provide the response strictly as valid JSON without any additional text or explanations."#;

fn per_page_prompt(page: &PagePromptInput) -> String {
    format!(
        "You are analyzing page {page} of a scanned form document. The attached page image \
         is {width}x{height} pixels; every coordinate you return must be in that pixel space.\n\n\
         The page text below was reconstructed to approximate the original 2D layout; use it \
         together with the image to understand the page:\n\
         ---\n{pseudo}\n---\n\n\
         The positioned text objects detected on this page, with pixel-space bounding boxes:\n\
         {objects}\n\n\
         Identify every blank component a person is expected to fill in (empty fields, blank \
         lines, checkboxes), the signature pad region if the page has one, and the workflow \
         steps this page describes.\n\n{format}",
        page = page.page_number,
        width = page.image_width,
        height = page.image_height,
        pseudo = page.pseudo_text,
        objects = page.objects_json,
        format = FORMAT_INSTRUCTIONS,
    )
}

fn workflow_prompt(combined_text: &str) -> String {
    format!(
        "The following is the layout-preserving text of a complete multi-page form document. \
         Derive the end-to-end workflow the document encodes: the ordered steps a person or \
         organization follows to complete and process this form.\n\n\
         ---\n{combined_text}\n---\n\n{FORMAT_INSTRUCTIONS}"
    )
}
