//! Layout-aware form analysis CLI.
//!
//! Drives the full pipeline over one extracted document: normalize, build
//! pseudo-text, run per-page and synthesis inference, save results, and
//! annotate the page images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formsight::extract::{document_base_name, parse_extraction_file};
use formsight::layout::{reconstruct_page, LayoutConfig};
use formsight::models::Provider;
use formsight::orchestrator::{InferenceOrchestrator, OrchestratorConfig, PagePromptInput};
use formsight::output::{annotate_page_image, save_document_result, save_normalized_layouts};
use formsight::page::build_document_layouts;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "formsight")]
#[command(about = "Layout-aware document analysis with vision-LLM form detection")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: normalize, infer per page, synthesize, annotate
    Process {
        /// Extraction-tool JSON (<base>___preprocessed.json)
        #[arg(short, long)]
        extraction: PathBuf,

        /// Directory holding the rendered page images
        #[arg(short, long)]
        images_dir: PathBuf,

        /// Output directory for result JSON files
        #[arg(short, long)]
        output: PathBuf,

        /// Inference provider (openai, claude)
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Ceiling on concurrent per-page inference calls
        #[arg(long, default_value = "5")]
        max_concurrency: usize,

        /// Approximate glyph width in pixels for pseudo-text padding
        #[arg(long, default_value = "10.0")]
        char_width: f64,
    },

    /// Write the normalized-object JSON only (no inference)
    Normalize {
        /// Extraction-tool JSON (<base>___preprocessed.json)
        #[arg(short, long)]
        extraction: PathBuf,

        /// Directory holding the rendered page images
        #[arg(short, long)]
        images_dir: PathBuf,

        /// Output directory for the <base>_ocr_like.json file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print each page's reconstructed pseudo-text (no inference)
    Layout {
        /// Extraction-tool JSON (<base>___preprocessed.json)
        #[arg(short, long)]
        extraction: PathBuf,

        /// Directory holding the rendered page images
        #[arg(short, long)]
        images_dir: PathBuf,

        /// Approximate glyph width in pixels for pseudo-text padding
        #[arg(long, default_value = "10.0")]
        char_width: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "formsight=info"
                    .parse()
                    .expect("directive is compile-time constant"),
            ),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Process {
            extraction,
            images_dir,
            output,
            provider,
            max_concurrency,
            char_width,
        } => {
            process(
                &extraction,
                &images_dir,
                &output,
                &provider,
                max_concurrency,
                char_width,
            )
            .await?;
        }
        Command::Normalize {
            extraction,
            images_dir,
            output,
        } => {
            normalize(&extraction, &images_dir, &output)?;
        }
        Command::Layout {
            extraction,
            images_dir,
            char_width,
        } => {
            print_layout(&extraction, &images_dir, char_width)?;
        }
    }

    Ok(())
}

async fn process(
    extraction: &PathBuf,
    images_dir: &PathBuf,
    output: &PathBuf,
    provider_name: &str,
    max_concurrency: usize,
    char_width: f64,
) -> Result<()> {
    let start = Instant::now();

    let provider = Provider::from_name(provider_name)?;

    let document = parse_extraction_file(extraction)?;
    let base = document_base_name(extraction);
    info!("processing {} ({} pages)", base, document.pages.len());

    let layouts = build_document_layouts(&document, &base, images_dir)?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("cannot create output directory {}", output.display()))?;
    save_normalized_layouts(&layouts, &output.join(format!("{base}_ocr_like.json")))?;

    let layout_config = LayoutConfig {
        approx_char_width: char_width,
    };
    let inputs: Vec<PagePromptInput> = layouts
        .iter()
        .map(|layout| PagePromptInput::from_layout(layout, &layout_config))
        .collect::<Result<_, _>>()
        .context("failed to serialize normalized objects")?;

    let orchestrator =
        InferenceOrchestrator::new(&provider, OrchestratorConfig { max_concurrency });
    let result = orchestrator.run(&inputs).await?;

    save_document_result(&result, output)?;

    for (input, page) in inputs.iter().zip(&result.pages) {
        if let Some(analysis) = &page.structured {
            let annotated = annotate_page_image(&input.image_path, analysis)?;
            info!("page {}: annotated {}", page.page_number, annotated.display());
        }
    }

    info!(
        "done in {:.1}s: {} pages, {} workflow steps",
        start.elapsed().as_secs_f64(),
        result.pages.len(),
        result.synthesis.workflow.len()
    );

    Ok(())
}

fn normalize(extraction: &PathBuf, images_dir: &PathBuf, output: &PathBuf) -> Result<()> {
    let document = parse_extraction_file(extraction)?;
    let base = document_base_name(extraction);

    let layouts = build_document_layouts(&document, &base, images_dir)?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("cannot create output directory {}", output.display()))?;
    save_normalized_layouts(&layouts, &output.join(format!("{base}_ocr_like.json")))?;

    Ok(())
}

fn print_layout(extraction: &PathBuf, images_dir: &PathBuf, char_width: f64) -> Result<()> {
    let document = parse_extraction_file(extraction)?;
    let base = document_base_name(extraction);

    let layouts = build_document_layouts(&document, &base, images_dir)?;
    let config = LayoutConfig {
        approx_char_width: char_width,
    };

    for layout in &layouts {
        println!("=== page {} ===", layout.page_number);
        for line in reconstruct_page(&layout.objects, &config) {
            println!("{line}");
        }
        println!();
    }

    Ok(())
}
