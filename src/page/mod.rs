//! Per-page artifact construction.
//!
//! For each page of an extracted document this module locates the rendered
//! page image, probes its pixel dimensions, normalizes every object's
//! bounding box into pixel space and emits a [`PageLayout`] with objects
//! sorted by ascending vertical position.
//!
//! ## Page-image matching
//!
//! Rendered images follow the filename convention
//! `<document-base-name>___page___<zero-based-index>.<png|jpg|jpeg>`. A page
//! with no matching image is skipped with a warning rather than failing the
//! whole document: a rendering mismatch in the external tooling should not
//! abort an otherwise-processable submission. Degenerate page bounds abort
//! that page only; sibling pages continue.

use crate::error::PipelineError;
use crate::extract::{RawDocument, RawPage};
use crate::geometry::{PageScale, PixelBox};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// One text fragment with its box mapped into image-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedObject {
    /// Type discriminant carried over from the extraction tool.
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload; empty for objects without one (figures, rules).
    pub text: String,
    pub bounding_box: PixelBox,
}

/// One page's normalized object list plus the matched image.
///
/// Serializes to the normalized-object wire shape
/// (`{"page_number": .., "objects": [..]}`); the image fields are local
/// bookkeeping and stay out of the JSON.
#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    /// 1-based page number.
    pub page_number: u32,
    /// Objects sorted by ascending pixel `y` (stable sort).
    pub objects: Vec<NormalizedObject>,
    #[serde(skip)]
    pub image_path: PathBuf,
    #[serde(skip)]
    pub image_width: u32,
    #[serde(skip)]
    pub image_height: u32,
}

/// Locate the rendered image for one page by filename convention.
///
/// The index token is matched including its trailing dot so page 1 never
/// matches page 10.
///
/// # Errors
///
/// Fails only when the image directory itself cannot be read.
pub fn find_page_image(
    images_dir: &Path,
    base_name: &str,
    page_index: usize,
) -> Result<Option<PathBuf>, PipelineError> {
    let token = format!("___page___{page_index}.");

    let entries =
        std::fs::read_dir(images_dir).map_err(|e| PipelineError::io(images_dir, e))?;

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let extension_ok = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));

        if extension_ok && name.starts_with(base_name) && name.contains(&token) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Build the layout for a single page.
///
/// Returns `Ok(None)` when the page is skipped (no matching image, or an
/// image that cannot be probed).
///
/// # Errors
///
/// Propagates [`crate::error::GeometryError`] for degenerate page bounds and
/// I/O failure on the image directory.
pub fn build_page_layout(
    page: &RawPage,
    page_index: usize,
    base_name: &str,
    images_dir: &Path,
) -> Result<Option<PageLayout>, PipelineError> {
    let Some(image_path) = find_page_image(images_dir, base_name, page_index)? else {
        warn!(
            "no rendered image for {} page {}, skipping page",
            base_name,
            page_index + 1
        );
        return Ok(None);
    };

    let (image_width, image_height) = match image::image_dimensions(&image_path) {
        Ok(dims) => dims,
        Err(e) => {
            warn!(
                "cannot probe image {} for page {}: {e}, skipping page",
                image_path.display(),
                page_index + 1
            );
            return Ok(None);
        }
    };

    let scale = PageScale::new(&page.bounds, image_width, image_height)?;

    let mut objects: Vec<NormalizedObject> = page
        .objects
        .iter()
        .filter_map(|raw| raw.entry())
        .map(|(kind, body)| NormalizedObject {
            kind: kind.to_owned(),
            text: body.source.text.clone().unwrap_or_default(),
            bounding_box: scale.normalize_box(&body.source.bounding_box),
        })
        .collect();

    // Ascending vertical position; stable, no explicit tie-break.
    objects.sort_by(|a, b| a.bounding_box.y.total_cmp(&b.bounding_box.y));

    debug!(
        "page {}: {} objects normalized against {}x{} image",
        page_index + 1,
        objects.len(),
        image_width,
        image_height
    );

    Ok(Some(PageLayout {
        page_number: (page_index + 1) as u32,
        objects,
        image_path,
        image_width,
        image_height,
    }))
}

/// Build layouts for every page of a document, applying the partial-success
/// policy: skipped pages (missing image) and pages with degenerate bounds
/// are logged and excluded; the remaining pages proceed.
///
/// # Errors
///
/// Fails when the image directory cannot be read, or when no page at all
/// could be matched to an image.
pub fn build_document_layouts(
    document: &RawDocument,
    base_name: &str,
    images_dir: &Path,
) -> Result<Vec<PageLayout>, PipelineError> {
    let mut layouts = Vec::with_capacity(document.pages.len());

    for (index, page) in document.pages.iter().enumerate() {
        match build_page_layout(page, index, base_name, images_dir) {
            Ok(Some(layout)) => layouts.push(layout),
            Ok(None) => {}
            Err(PipelineError::Geometry(e)) => {
                warn!("page {}: {e}, aborting this page only", index + 1);
            }
            Err(e) => return Err(e),
        }
    }

    if layouts.is_empty() {
        return Err(PipelineError::NoPages);
    }

    Ok(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_extraction;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    /// Write a solid PNG of the given size under the page-image convention.
    fn write_page_image(dir: &Path, base: &str, index: usize, w: u32, h: u32) -> PathBuf {
        let path = dir.join(format!("{base}___page___{index}.png"));
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(w, h);
        img.save(&path).unwrap();
        path
    }

    fn sample_document() -> RawDocument {
        parse_extraction(
            r#"{
                "pages": [{
                    "bounds": {"left": 0.0, "top": 0.0, "right": 100.0, "bottom": 200.0},
                    "objects": [
                        {"word": {"source": {"bounding_box": {"left": 10.0, "top": 50.0, "right": 30.0, "bottom": 55.0}, "text": "below"}}},
                        {"word": {"source": {"bounding_box": {"left": 10.0, "top": 10.0, "right": 30.0, "bottom": 15.0}, "text": "above"}}},
                        {"figure": {"source": {"bounding_box": {"left": 0.0, "top": 100.0, "right": 50.0, "bottom": 150.0}}}}
                    ]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_find_page_image_exact_index() {
        let dir = TempDir::new().unwrap();
        write_page_image(dir.path(), "doc", 1, 2, 2);
        write_page_image(dir.path(), "doc", 10, 2, 2);

        let found = find_page_image(dir.path(), "doc", 1).unwrap().unwrap();
        let name = found.file_name().unwrap().to_string_lossy().into_owned();
        // Page 1 must not match the page-10 image.
        assert_eq!(name, "doc___page___1.png");
    }

    #[test]
    fn test_find_page_image_rejects_other_documents() {
        let dir = TempDir::new().unwrap();
        write_page_image(dir.path(), "other", 0, 2, 2);

        assert!(find_page_image(dir.path(), "doc", 0).unwrap().is_none());
    }

    #[test]
    fn test_build_page_sorts_by_y_and_defaults_text() {
        let dir = TempDir::new().unwrap();
        // Image at 2x the document scale.
        write_page_image(dir.path(), "doc", 0, 200, 400);

        let doc = sample_document();
        let layout = build_page_layout(&doc.pages[0], 0, "doc", dir.path())
            .unwrap()
            .unwrap();

        assert_eq!(layout.page_number, 1);
        assert_eq!(layout.image_width, 200);
        assert_eq!(layout.image_height, 400);

        let texts: Vec<&str> = layout.objects.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["above", "below", ""]);

        // 2x scaling applied.
        assert_eq!(layout.objects[0].bounding_box.x, 20.0);
        assert_eq!(layout.objects[0].bounding_box.y, 20.0);
        assert_eq!(layout.objects[0].bounding_box.w, 40.0);
        assert_eq!(layout.objects[0].bounding_box.h, 10.0);
        assert_eq!(layout.objects[2].kind, "figure");
    }

    #[test]
    fn test_missing_image_skips_page() {
        let dir = TempDir::new().unwrap();
        let doc = sample_document();

        let layout = build_page_layout(&doc.pages[0], 0, "doc", dir.path()).unwrap();
        assert!(layout.is_none());
    }

    #[test]
    fn test_document_with_no_matchable_pages_fails() {
        let dir = TempDir::new().unwrap();
        let doc = sample_document();

        let err = build_document_layouts(&doc, "doc", dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoPages));
    }

    #[test]
    fn test_degenerate_page_aborts_only_itself() {
        let dir = TempDir::new().unwrap();
        write_page_image(dir.path(), "doc", 0, 100, 100);
        write_page_image(dir.path(), "doc", 1, 100, 100);

        let doc = parse_extraction(
            r#"{
                "pages": [
                    {"bounds": {"left": 0, "top": 0, "right": 0, "bottom": 100}, "objects": []},
                    {"bounds": {"left": 0, "top": 0, "right": 100, "bottom": 100}, "objects": []}
                ]
            }"#,
        )
        .unwrap();

        let layouts = build_document_layouts(&doc, "doc", dir.path()).unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].page_number, 2);
    }

    #[test]
    fn test_normalized_object_wire_shape() {
        let object = NormalizedObject {
            kind: "word".to_owned(),
            text: "Hi".to_owned(),
            bounding_box: PixelBox {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
            },
        };
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["type"], "word");
        assert_eq!(json["text"], "Hi");
        assert_eq!(json["bounding_box"]["x"], 1.0);
        assert_eq!(json["bounding_box"]["w"], 3.0);
    }
}
