//! # formsight
//!
//! Layout-aware analysis of scanned form documents.
//!
//! The pipeline ingests extraction-tool output (text tokens with
//! document-space bounding boxes per page) plus the pre-rendered page
//! images, and produces a whole-document analysis: blank form fields with
//! pixel coordinates, the signature region, and the workflow the document
//! encodes.
//!
//! ## Pipeline stages
//!
//! 1. Parse and validate the extraction JSON ([`extract`])
//! 2. Match each page to its rendered image and normalize every bounding
//!    box into image-pixel space ([`page`], [`geometry`])
//! 3. Reconstruct each page's 2D layout as whitespace-padded pseudo-text
//!    ([`layout`])
//! 4. Fan out one vision-model call per page under a bounded concurrency
//!    limit, then one whole-document synthesis call ([`orchestrator`],
//!    [`models`])
//! 5. Aggregate, persist, and annotate page images with the detected
//!    regions ([`output`])
//!
//! Each stage exclusively owns its output; nothing is mutated after it
//! crosses a stage boundary, and nothing outlives a single document
//! submission.
//!
//! ## Example
//!
//! ```no_run
//! use formsight::extract::{document_base_name, parse_extraction_file};
//! use formsight::layout::LayoutConfig;
//! use formsight::models::Provider;
//! use formsight::orchestrator::{InferenceOrchestrator, OrchestratorConfig, PagePromptInput};
//! use formsight::page::build_document_layouts;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let extraction = Path::new("lease___preprocessed.json");
//! let document = parse_extraction_file(extraction)?;
//! let base = document_base_name(extraction);
//!
//! let layouts = build_document_layouts(&document, &base, Path::new("renders/"))?;
//!
//! let layout_config = LayoutConfig::default();
//! let inputs: Vec<PagePromptInput> = layouts
//!     .iter()
//!     .map(|l| PagePromptInput::from_layout(l, &layout_config))
//!     .collect::<Result<_, _>>()?;
//!
//! let provider = Provider::from_name("openai")?;
//! let orchestrator = InferenceOrchestrator::new(&provider, OrchestratorConfig::default());
//! let result = orchestrator.run(&inputs).await?;
//!
//! println!("{} workflow steps", result.synthesis.workflow.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod geometry;
pub mod layout;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod page;

pub use error::{GeometryError, InferenceError, ParseError, PipelineError};
pub use models::{DocumentResult, FormAnalysis, PageInferenceResult, Provider};
pub use orchestrator::{InferenceOrchestrator, OrchestratorConfig};
