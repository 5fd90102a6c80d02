// proposal-pdf: pagination and layout engine
//
// Coordinates are points with the origin at the top-left of the page and y
// growing downwards. The renderer flips them into PDF space.

use crate::metrics::Face;
use log::debug;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// A4 portrait in points
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Font sizes in points
pub const TITLE_FONT_SIZE: f32 = 11.5;
pub const BODY_FONT_SIZE: f32 = 10.5;

/// Vertical advances in points
const TITLE_ADVANCE: f32 = 14.0;
const LINE_HEIGHT: f32 = 12.0;
const BLOCK_GAP: f32 = 12.0;

// ============================================================================
// Geometry
// ============================================================================

/// Rounded rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Fixed presentation geometry of one page size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Header band on the first page
    pub header: Rect,
    /// Content container on the first page
    pub first_container: Rect,
    /// Content container on every later page
    pub continuation_container: Rect,
    /// Left edge of text
    pub text_left: f32,
    /// Maximum width of a text line
    pub text_width: f32,
    /// First baseline on the first page
    pub first_page_top: f32,
    /// First baseline on continuation pages
    pub continuation_top: f32,
    /// Distance from the page bottom past which a new page is started
    pub bottom_margin: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        let width = A4_WIDTH_PT;
        let height = A4_HEIGHT_PT;
        let container_top = 135.0;
        PageGeometry {
            width,
            height,
            header: Rect {
                x: 40.0,
                y: 36.0,
                width: width - 80.0,
                height: 78.0,
                radius: 14.0,
            },
            first_container: Rect {
                x: 40.0,
                y: container_top,
                width: width - 80.0,
                height: height - container_top - 60.0,
                radius: 16.0,
            },
            continuation_container: Rect {
                x: 40.0,
                y: 40.0,
                width: width - 80.0,
                height: height - 100.0,
                radius: 16.0,
            },
            text_left: 60.0,
            text_width: width - 120.0,
            first_page_top: container_top + 28.0,
            continuation_top: 70.0,
            bottom_margin: 80.0,
        }
    }

    /// Cursor position past which the current page is considered full.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.bottom_margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::a4()
    }
}

/// What to do with a block that does not fit on the rest of its page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Write the whole block on the page it starts on, then break before the
    /// next block. A block taller than a page runs past the bottom margin.
    #[default]
    KeepTogether,
    /// Break inside a block before a line that would cross the bottom
    /// margin. A title is never left alone at the foot of a page.
    SplitLines,
}

// ============================================================================
// Input and Output
// ============================================================================

/// A titled unit of text destined for the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub value: String,
}

impl Section {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Section {
            title: title.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Title,
    Body,
}

/// One line of text at its baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub kind: LineKind,
    /// Index of the section this line came from
    pub block: usize,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub container: Rect,
    pub lines: Vec<PlacedLine>,
}

/// Paginated result of one layout run.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub geometry: PageGeometry,
    pub pages: Vec<PageLayout>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every placed line in reading order.
    pub fn lines(&self) -> impl Iterator<Item = &PlacedLine> {
        self.pages.iter().flat_map(|p| p.lines.iter())
    }
}

// ============================================================================
// Word Wrap
// ============================================================================

/// Splits `text` into lines no wider than `max_width` at `size`.
///
/// Newlines are hard breaks and blank paragraphs survive as empty lines.
/// Words wider than a whole line are broken between characters.
pub fn wrap_text(text: &str, face: Face, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if face.text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if face.text_width(word, size) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = split_long_word(word, face, size, max_width);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

fn split_long_word(word: &str, face: Face, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for ch in word.chars() {
        let ch_width = face.glyph_width(ch) as f32 * size / 1000.0;
        // Always keep at least one character per piece.
        if !current.is_empty() && current_width + ch_width > max_width {
            pieces.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        current.push(ch);
        current_width += ch_width;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

// ============================================================================
// Pagination
// ============================================================================

/// Lays sections out across pages of a fixed geometry.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    pub geometry: PageGeometry,
    pub policy: OverflowPolicy,
}

struct Cursor {
    pages: Vec<PageLayout>,
    cy: f32,
    top: f32,
}

impl Cursor {
    fn current(&mut self) -> &mut PageLayout {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn at_page_top(&self) -> bool {
        self.cy <= self.top
    }

    fn new_page(&mut self, geometry: &PageGeometry) {
        self.pages.push(PageLayout {
            container: geometry.continuation_container,
            lines: Vec::new(),
        });
        self.cy = geometry.continuation_top;
        self.top = geometry.continuation_top;
    }
}

impl LayoutEngine {
    pub fn new(geometry: PageGeometry, policy: OverflowPolicy) -> Self {
        LayoutEngine { geometry, policy }
    }

    /// Paginates `sections` in order. Never fails; no sections yields a
    /// single page with an empty container.
    pub fn paginate(&self, sections: &[Section]) -> Layout {
        let geometry = &self.geometry;
        let limit = geometry.bottom_limit();
        let left = geometry.text_left;

        let mut cursor = Cursor {
            pages: vec![PageLayout {
                container: geometry.first_container,
                lines: Vec::new(),
            }],
            cy: geometry.first_page_top,
            top: geometry.first_page_top,
        };
        let mut break_pending = false;

        for (block, section) in sections.iter().enumerate() {
            if break_pending {
                cursor.new_page(geometry);
                break_pending = false;
            }

            let body = wrap_text(&section.value, Face::Regular, BODY_FONT_SIZE, geometry.text_width);

            if self.policy == OverflowPolicy::SplitLines
                && !cursor.at_page_top()
                && cursor.cy + TITLE_ADVANCE > limit
            {
                cursor.new_page(geometry);
            }

            let y = cursor.cy;
            cursor.current().lines.push(PlacedLine {
                kind: LineKind::Title,
                block,
                text: section.title.clone(),
                x: left,
                y,
            });
            cursor.cy += TITLE_ADVANCE;

            for text in body {
                if self.policy == OverflowPolicy::SplitLines && cursor.cy > limit {
                    cursor.new_page(geometry);
                }
                let y = cursor.cy;
                cursor.current().lines.push(PlacedLine {
                    kind: LineKind::Body,
                    block,
                    text,
                    x: left,
                    y,
                });
                cursor.cy += LINE_HEIGHT;
            }
            cursor.cy += BLOCK_GAP;

            // Overflow is checked after the block so the next one starts fresh.
            if cursor.cy > limit {
                break_pending = true;
            }
        }

        debug!(
            "event=layout status=ok sections={} pages={} policy={:?}",
            sections.len(),
            cursor.pages.len(),
            self.policy
        );

        Layout {
            geometry: geometry.clone(),
            pages: cursor.pages,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
