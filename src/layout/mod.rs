//! Spatial layout reconstruction: positioned fragments to pseudo-text.
//!
//! Turns a page's normalized objects into an ordered sequence of
//! whitespace-padded lines that approximate the original 2D layout as linear
//! text. The output is a prompt for a vision model, not typesetting; its
//! correctness criterion is determinism plus the geometric rules below.
//!
//! ## Algorithm
//!
//! 1. Sort objects by `(y, x)` ascending.
//! 2. Walk the sorted objects accumulating a current line and a running
//!    union box. An object joins the line when its vertical midpoint is
//!    within half the smaller height of the union box's midpoint.
//! 3. Within a closed line, re-sort by left edge and pad the gap between
//!    consecutive fragments with `floor(gap / approx_char_width)` spaces.
//! 4. Between consecutive emitted lines, insert one empty string when the
//!    lines are not vertically adjacent (gap outside `(0, max_height/2]`).
//!
//! Empty strings in the output are deliberate paragraph/gap markers.

use crate::geometry::PixelBox;
use crate::page::NormalizedObject;

/// Tunables for pseudo-text reconstruction, passed explicitly rather than
/// read from process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    /// Approximate glyph width in pixels at the extraction tool's rendering
    /// resolution; one space is emitted per this many pixels of gap.
    pub approx_char_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            approx_char_width: 10.0,
        }
    }
}

/// Reconstruct one page's pseudo-text lines.
///
/// Deterministic: the same object sequence always yields the same lines.
pub fn reconstruct_page(objects: &[NormalizedObject], config: &LayoutConfig) -> Vec<String> {
    let mut sorted: Vec<&NormalizedObject> = objects.iter().collect();
    sorted.sort_by(|a, b| {
        a.bounding_box
            .top()
            .total_cmp(&b.bounding_box.top())
            .then(a.bounding_box.left().total_cmp(&b.bounding_box.left()))
    });

    // Group into lines, tracking each line's running union box.
    let mut lines: Vec<(String, PixelBox)> = Vec::new();
    let mut current: Vec<&NormalizedObject> = Vec::new();
    let mut union: Option<PixelBox> = None;

    for object in sorted {
        match union {
            Some(u) if is_same_line(&u, &object.bounding_box) => {
                union = Some(u.union(&object.bounding_box));
                current.push(object);
            }
            None => {
                union = Some(object.bounding_box);
                current.push(object);
            }
            Some(u) => {
                lines.push((render_line(&mut current, config), u));
                union = Some(object.bounding_box);
                current.push(object);
            }
        }
    }
    if let Some(u) = union {
        lines.push((render_line(&mut current, config), u));
    }

    // Interleave gap markers between non-adjacent lines.
    let mut result = Vec::with_capacity(lines.len());
    for (i, (text, bbox)) in lines.iter().enumerate() {
        if i > 0 && !is_adjacent_line(&lines[i - 1].1, bbox) {
            result.push(String::new());
        }
        result.push(text.clone());
    }

    result
}

/// Render one closed line left to right with gap-proportional padding.
///
/// The cursor starts at the page's left edge, so an indented first fragment
/// keeps its leading spaces; only trailing whitespace is trimmed.
fn render_line(items: &mut Vec<&NormalizedObject>, config: &LayoutConfig) -> String {
    items.sort_by(|a, b| a.bounding_box.left().total_cmp(&b.bounding_box.left()));

    let mut text = String::new();
    let mut cursor = 0.0_f64;

    for item in items.drain(..) {
        let gap = ((item.bounding_box.left() - cursor) / config.approx_char_width).floor();
        if gap > 0.0 {
            for _ in 0..gap as usize {
                text.push(' ');
            }
        }
        text.push_str(&item.text);
        cursor = item.bounding_box.right();
    }

    text.trim_end().to_owned()
}

/// Two boxes share a line when their vertical midpoints differ by less than
/// half the smaller of the two heights.
fn is_same_line(a: &PixelBox, b: &PixelBox) -> bool {
    let min_height = a.h.min(b.h);
    (a.mid_y() - b.mid_y()).abs() < min_height / 2.0
}

/// Two line boxes are adjacent when the vertical gap between them is in
/// `(0, max_height/2]`. Non-adjacent consecutive lines get an empty-string
/// marker between them.
fn is_adjacent_line(a: &PixelBox, b: &PixelBox) -> bool {
    let v_dist = b.top().min(a.top()) - a.bottom().max(b.bottom());
    v_dist > 0.0 && v_dist <= a.h.max(b.h) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(text: &str, x: f64, y: f64, w: f64, h: f64) -> NormalizedObject {
        NormalizedObject {
            kind: "word".to_owned(),
            text: text.to_owned(),
            bounding_box: PixelBox { x, y, w, h },
        }
    }

    #[test]
    fn test_single_line_with_gap_padding() {
        // Gap of 80px at char width 10 gives exactly 8 spaces.
        let objects = vec![
            object("Hi", 0.0, 0.0, 20.0, 10.0),
            object("there", 100.0, 0.0, 40.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines, vec!["Hi        there".to_owned()]);
    }

    #[test]
    fn test_gap_of_25_px_yields_two_spaces() {
        let objects = vec![
            object("a", 0.0, 0.0, 10.0, 10.0),
            object("b", 35.0, 0.0, 10.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines, vec!["a  b".to_owned()]);
    }

    #[test]
    fn test_midpoints_within_half_min_height_share_a_line() {
        // Midpoints 5.0 and 8.0 differ by 3.0 < min(10, 10)/2.
        let objects = vec![
            object("left", 0.0, 0.0, 30.0, 10.0),
            object("right", 50.0, 3.0, 30.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("left"));
        assert!(lines[0].contains("right"));
    }

    #[test]
    fn test_midpoints_beyond_half_max_height_split_lines() {
        // Midpoints 5.0 and 25.0 differ by 20.0 > max(10, 10)/2.
        let objects = vec![
            object("top", 0.0, 0.0, 30.0, 10.0),
            object("bottom", 0.0, 20.0, 30.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        let text_lines: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
        assert_eq!(text_lines, vec!["top", "bottom"]);
    }

    #[test]
    fn test_adjacent_lines_have_no_gap_marker() {
        // Vertical gap of 4.0 is within (0, 10/2].
        let objects = vec![
            object("first", 0.0, 0.0, 30.0, 10.0),
            object("second", 0.0, 14.0, 30.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines, vec!["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn test_distant_lines_get_gap_marker() {
        // Vertical gap of 30.0 exceeds max(10, 10)/2.
        let objects = vec![
            object("first", 0.0, 0.0, 30.0, 10.0),
            object("second", 0.0, 40.0, 30.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(
            lines,
            vec!["first".to_owned(), String::new(), "second".to_owned()]
        );
    }

    #[test]
    fn test_intra_line_left_to_right_ordering() {
        // Same y, reversed x order in the input.
        let objects = vec![
            object("world", 60.0, 0.0, 50.0, 10.0),
            object("hello", 0.0, 0.0, 50.0, 10.0),
        ];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines, vec!["hello world".to_owned()]);
    }

    #[test]
    fn test_indented_first_fragment_keeps_leading_spaces() {
        let objects = vec![object("indented", 30.0, 0.0, 50.0, 10.0)];
        let lines = reconstruct_page(&objects, &LayoutConfig::default());
        assert_eq!(lines, vec!["   indented".to_owned()]);
    }

    #[test]
    fn test_deterministic() {
        let objects = vec![
            object("b", 50.0, 2.0, 20.0, 10.0),
            object("a", 0.0, 0.0, 20.0, 10.0),
            object("c", 0.0, 40.0, 20.0, 10.0),
            object("d", 30.0, 41.0, 20.0, 10.0),
        ];
        let config = LayoutConfig::default();
        let first = reconstruct_page(&objects, &config);
        for _ in 0..5 {
            assert_eq!(reconstruct_page(&objects, &config), first);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(reconstruct_page(&[], &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn test_custom_char_width() {
        let objects = vec![
            object("a", 0.0, 0.0, 10.0, 10.0),
            object("b", 35.0, 0.0, 10.0, 10.0),
        ];
        let config = LayoutConfig {
            approx_char_width: 5.0,
        };
        // Gap of 25px at width 5 gives 5 spaces.
        let lines = reconstruct_page(&objects, &config);
        assert_eq!(lines, vec!["a     b".to_owned()]);
    }
}
