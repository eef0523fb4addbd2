//! Page-level input types handed over by the layout and OCR collaborators.

use super::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse layout role of a block, as labelled by the layout model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First-level heading block.
    DocTitle,
    /// Second-level heading block.
    TextTitle,
    /// Body paragraph.
    #[default]
    Text,
    TableTitle,
    Table,
    Figure,
    FigureTitle,
    Header,
    Footer,
    Footnote,
    /// Table of contents.
    Content,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// All roles in label order.
    pub const ALL: [Role; 12] = [
        Role::DocTitle,
        Role::TextTitle,
        Role::Text,
        Role::TableTitle,
        Role::Table,
        Role::Figure,
        Role::FigureTitle,
        Role::Header,
        Role::Footer,
        Role::Footnote,
        Role::Content,
        Role::Unknown,
    ];

    /// The label used on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            Role::DocTitle => "doc_title",
            Role::TextTitle => "text_title",
            Role::Text => "text",
            Role::TableTitle => "table_title",
            Role::Table => "table",
            Role::Figure => "figure",
            Role::FigureTitle => "figure_title",
            Role::Header => "header",
            Role::Footer => "footer",
            Role::Footnote => "footnote",
            Role::Content => "content",
            Role::Unknown => "unknown",
        }
    }

    /// Heading-tagged block roles.
    pub fn is_heading(&self) -> bool {
        matches!(self, Role::DocTitle | Role::TextTitle)
    }

    /// Page furniture that starts out non-informative.
    pub fn is_page_furniture(&self) -> bool {
        matches!(self, Role::Header | Role::Footer | Role::Footnote)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|role| role.label() == s)
            .copied()
            .ok_or_else(|| crate::Error::UnknownRole(s.to_string()))
    }
}

/// A single recognized character with its own box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharBox {
    #[serde(rename = "char")]
    pub ch: char,
    pub bbox: BoundingBox,
}

/// A run of characters sharing one font.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bbox: BoundingBox,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub font_weight: f32,
    #[serde(default)]
    pub font_size: f32,
    /// Character-level boxes, present only on the OCR path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chars: Option<Vec<CharBox>>,
}

impl Span {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            ..Default::default()
        }
    }

    pub fn with_font_weight(mut self, weight: f32) -> Self {
        self.font_weight = weight;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_chars(mut self, chars: Vec<CharBox>) -> Self {
        self.chars = Some(chars);
        self
    }
}

/// Spans sharing a text baseline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub spans: Vec<Span>,
    pub bbox: BoundingBox,
}

impl Line {
    /// Build a line whose box is the union of its spans.
    pub fn from_spans(spans: Vec<Span>) -> Self {
        let bbox = spans
            .iter()
            .map(|s| s.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self { spans, bbox }
    }
}

/// Output of the external table-structure model for one table block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableModelOutput {
    /// HTML skeleton tokens, e.g. `<tr>`, `<td>[]</td>`, `</tr>`.
    pub skeleton: Vec<String>,
    /// Cell boxes in table-crop pixel space, in reading order.
    #[serde(default)]
    pub cells: Vec<BoundingBox>,
}

/// Lines sharing a detected layout role.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
    pub bbox: BoundingBox,
    #[serde(rename = "role_label", alias = "role", default)]
    pub role: Role,
    #[serde(rename = "pnum", alias = "page", default)]
    pub page: u32,
    /// Pre-rendered HTML, only meaningful for table blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Confidence of the table reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableModelOutput>,
}

impl Block {
    pub fn new(role: Role, page: u32, bbox: BoundingBox) -> Self {
        Self {
            role,
            page,
            bbox,
            ..Default::default()
        }
    }

    pub fn with_lines(mut self, lines: Vec<Line>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_table(mut self, table: TableModelOutput) -> Self {
        self.table = Some(table);
        self
    }

    /// All spans of the block in reading order.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }
}

/// One page of layout-model output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "pnum", alias = "number")]
    pub number: u32,
    /// Extent of the page in span coordinates.
    pub bbox: BoundingBox,
    /// Extent of the rendered layout image, when it differs from `bbox`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bbox: Option<BoundingBox>,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(number: u32, bbox: BoundingBox) -> Self {
        Self {
            number,
            bbox,
            image_bbox: None,
            blocks: Vec::new(),
        }
    }

    /// Add a block to the page.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Plain text of the page, one line per row.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .map(|l| l.spans.iter().map(|s| s.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Map a span-space box into layout-image space.
    pub fn to_image_space(&self, bbox: &BoundingBox) -> BoundingBox {
        match &self.image_bbox {
            Some(image) => bbox.rescale(&self.bbox, image),
            None => *bbox,
        }
    }

    /// Check if the page is empty (no content blocks).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.label().parse::<Role>().unwrap(), role);
        }
        assert!("paragraph".parse::<Role>().is_err());
    }

    #[test]
    fn test_unknown_role_deserializes() {
        let role: Role = serde_json::from_str("\"sidebar\"").unwrap();
        assert_eq!(role, Role::Unknown);
    }

    #[test]
    fn test_page_from_json() {
        let json = r#"{
            "pnum": 3,
            "bbox": [0, 0, 600, 800],
            "blocks": [{
                "role_label": "text",
                "pnum": 3,
                "bbox": [10, 10, 200, 30],
                "lines": [{
                    "bbox": [10, 10, 200, 30],
                    "spans": [{"text": "hello", "bbox": [10, 10, 200, 30]}]
                }]
            }]
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.number, 3);
        assert_eq!(page.blocks[0].role, Role::Text);
        assert_eq!(page.plain_text(), "hello");
    }

    #[test]
    fn test_line_bbox_is_union() {
        let line = Line::from_spans(vec![
            Span::new("a", BoundingBox::new(0.0, 0.0, 5.0, 10.0)),
            Span::new("b", BoundingBox::new(6.0, 1.0, 12.0, 11.0)),
        ]);
        assert_eq!(line.bbox, BoundingBox::new(0.0, 0.0, 12.0, 11.0));
    }
}
