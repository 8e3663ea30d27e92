//! Result aggregation, persistence, and box-overlay annotation.
//!
//! This is the pipeline's terminal boundary:
//!
//! - [`assemble_document`] - builds the read-only [`DocumentResult`] from
//!   the ordered per-page results plus the synthesis response
//! - [`save_document_result`] / [`save_normalized_layouts`] - JSON
//!   persistence (`document.json`, `page_N.json`, `workflow.json`, and the
//!   `<base>_ocr_like.json` normalized-object file)
//! - [`annotate_page_image`] - draws the detected blank components and the
//!   signature region as red rectangles on a page image and saves the
//!   annotated copy next to the original with a `_with_boxes` suffix

use crate::error::PipelineError;
use crate::models::{Coordinates, DocumentResult, FormAnalysis, PageInferenceResult};
use crate::page::PageLayout;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_STROKE: u32 = 3;

/// Assemble the terminal document artifact. Pure construction; the result
/// is never mutated afterwards.
pub fn assemble_document(
    pages: Vec<PageInferenceResult>,
    synthesis: FormAnalysis,
    synthesis_raw: String,
) -> DocumentResult {
    DocumentResult {
        pages,
        synthesis,
        synthesis_raw,
    }
}

/// Wire shape of the normalized-object JSON file.
#[derive(Serialize)]
struct NormalizedDocument<'a> {
    pages: &'a [PageLayout],
}

/// Write the normalized-object JSON (`{"pages": [{"page_number", "objects"}]}`).
///
/// # Errors
///
/// Fails on serialization or file I/O errors.
pub fn save_normalized_layouts(layouts: &[PageLayout], path: &Path) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(&NormalizedDocument { pages: layouts })?;
    std::fs::write(path, json).map_err(|e| PipelineError::io(path, e))?;
    info!("wrote normalized objects to {}", path.display());
    Ok(())
}

/// Persist the document result as JSON files under `output_dir`.
///
/// Creates `document.json` (the full result), one `page_N.json` per page,
/// and `workflow.json` (the synthesis response).
///
/// # Errors
///
/// Fails on serialization or file I/O errors.
pub fn save_document_result(
    result: &DocumentResult,
    output_dir: &Path,
) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;

    let doc_path = output_dir.join("document.json");
    let doc_json = serde_json::to_string_pretty(result)?;
    std::fs::write(&doc_path, doc_json).map_err(|e| PipelineError::io(&doc_path, e))?;

    for page in &result.pages {
        let page_path = output_dir.join(format!("page_{}.json", page.page_number));
        let page_json = serde_json::to_string_pretty(page)?;
        std::fs::write(&page_path, page_json).map_err(|e| PipelineError::io(&page_path, e))?;
    }

    let workflow_path = output_dir.join("workflow.json");
    let workflow_json = serde_json::to_string_pretty(&result.synthesis)?;
    std::fs::write(&workflow_path, workflow_json)
        .map_err(|e| PipelineError::io(&workflow_path, e))?;

    info!("saved document result to {}", output_dir.display());
    Ok(())
}

/// Draw the detected regions of one page's analysis onto its image and save
/// the annotated copy with a `_with_boxes` suffix.
///
/// # Errors
///
/// Fails when the image cannot be decoded or the annotated copy cannot be
/// written.
pub fn annotate_page_image(
    image_path: &Path,
    analysis: &FormAnalysis,
) -> Result<PathBuf, PipelineError> {
    let mut image = image::open(image_path)
        .map_err(|source| PipelineError::Image {
            path: image_path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    for component in &analysis.blank_components {
        draw_box(&mut image, &component.coordinates);
    }
    if let Some(pad) = &analysis.signature_pad_text {
        if let Some(coordinates) = &pad.coordinates {
            draw_box(&mut image, coordinates);
        }
    }

    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let annotated_path = image_path.with_file_name(format!("{stem}_with_boxes.png"));

    image.save(&annotated_path).map_err(|source| PipelineError::Image {
        path: annotated_path.clone(),
        source,
    })?;

    Ok(annotated_path)
}

/// Hollow rectangle with a fixed stroke width, clamped to the image.
fn draw_box(image: &mut RgbImage, coordinates: &Coordinates) {
    let (img_w, img_h) = image.dimensions();

    for inset in 0..BOX_STROKE {
        let x = (coordinates.x.round() as i64 + i64::from(inset)).max(0);
        let y = (coordinates.y.round() as i64 + i64::from(inset)).max(0);
        let w = coordinates.width.round() as i64 - 2 * i64::from(inset);
        let h = coordinates.height.round() as i64 - 2 * i64::from(inset);
        if w < 1 || h < 1 || x >= i64::from(img_w) || y >= i64::from(img_h) {
            continue;
        }

        let w = (w as u64).min(u64::from(img_w) - x as u64) as u32;
        let h = (h as u64).min(u64::from(img_h) - y as u64) as u32;
        let rect = Rect::at(x as i32, y as i32).of_size(w.max(1), h.max(1));
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelBox;
    use crate::models::{BlankComponent, SignaturePadText};
    use crate::page::NormalizedObject;
    use image::ImageBuffer;
    use tempfile::TempDir;

    fn analysis_with_box() -> FormAnalysis {
        FormAnalysis {
            blank_components: vec![BlankComponent {
                label: Some("Name".to_owned()),
                coordinates: Coordinates {
                    x: 4.0,
                    y: 4.0,
                    width: 10.0,
                    height: 8.0,
                },
            }],
            signature_pad_text: Some(SignaturePadText {
                text: None,
                coordinates: None,
            }),
            workflow: vec![],
        }
    }

    #[test]
    fn test_annotate_writes_suffixed_copy_with_red_border() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("doc___page___0.png");
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(20, 20, Rgb([255, 255, 255]));
        img.save(&image_path).unwrap();

        let annotated = annotate_page_image(&image_path, &analysis_with_box()).unwrap();

        assert_eq!(
            annotated.file_name().unwrap().to_string_lossy(),
            "doc___page___0_with_boxes.png"
        );
        let annotated_img = image::open(&annotated).unwrap().to_rgb8();
        // Top-left corner of the drawn rectangle.
        assert_eq!(annotated_img.get_pixel(4, 4), &Rgb([255, 0, 0]));
        // Untouched interior stays white.
        assert_eq!(annotated_img.get_pixel(9, 8), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_out_of_bounds_box_is_clamped_not_panicking() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("doc___page___0.png");
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(10, 10);
        img.save(&image_path).unwrap();

        let analysis = FormAnalysis {
            blank_components: vec![BlankComponent {
                label: None,
                coordinates: Coordinates {
                    x: 8.0,
                    y: 8.0,
                    width: 50.0,
                    height: 50.0,
                },
            }],
            ..FormAnalysis::default()
        };
        annotate_page_image(&image_path, &analysis).unwrap();
    }

    #[test]
    fn test_save_normalized_layouts_wire_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc_ocr_like.json");

        let layouts = vec![PageLayout {
            page_number: 1,
            objects: vec![NormalizedObject {
                kind: "word".to_owned(),
                text: "Hi".to_owned(),
                bounding_box: PixelBox {
                    x: 1.0,
                    y: 2.0,
                    w: 3.0,
                    h: 4.0,
                },
            }],
            image_path: PathBuf::new(),
            image_width: 100,
            image_height: 100,
        }];

        save_normalized_layouts(&layouts, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["pages"][0]["page_number"], 1);
        assert_eq!(value["pages"][0]["objects"][0]["type"], "word");
        // Image bookkeeping stays out of the wire shape.
        assert!(value["pages"][0].get("image_path").is_none());
    }

    #[test]
    fn test_save_document_result_files() {
        let dir = TempDir::new().unwrap();
        let result = assemble_document(
            vec![PageInferenceResult {
                page_number: 1,
                structured: Some(FormAnalysis::default()),
                raw: Some("{}".to_owned()),
            }],
            FormAnalysis::default(),
            "{}".to_owned(),
        );

        save_document_result(&result, dir.path()).unwrap();

        assert!(dir.path().join("document.json").exists());
        assert!(dir.path().join("page_1.json").exists());
        assert!(dir.path().join("workflow.json").exists());
    }
}
