//! The reconstructed document unit.

use super::{BoundingBox, Role, Span};
use crate::title::Slot;
use serde::{Deserialize, Serialize};

/// Level value of an element that is not a heading.
pub const NOT_A_TITLE: i32 = -1;

/// Kind of media a cross-reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Table,
    Figure,
}

/// An in-body mention of a captioned table or figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Identifier of the referenced element (`page-order`).
    pub id: String,
    /// Character offset of the mention in the referencing text.
    pub offset: usize,
}

/// Table-specific payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableContent {
    pub table_id: String,
    pub title: Option<String>,
    pub footnote: Option<String>,
    pub figure_url: Option<String>,
    pub trusted: bool,
}

/// Figure-specific payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FigureContent {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub url: Option<String>,
    pub footnote: Option<String>,
}

/// What an element carries beyond its text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    /// Headings and paragraphs; the distinction lives in `title_level`.
    #[default]
    Text,
    /// Table; the element text holds the table HTML.
    Table(TableContent),
    Figure(FigureContent),
}

/// A reconstructed element, owned by a [`Structure`](super::Structure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub text: String,
    pub role: Role,
    pub page_id: u32,
    /// Position within the page.
    pub order_id: u32,
    pub(crate) global_index: usize,
    pub bbox: BoundingBox,
    /// Heading depth, or [`NOT_A_TITLE`].
    pub title_level: i32,
    /// Heading convention matched by the text.
    pub slot: Option<Slot>,
    /// Whether the element contributes to rendered output.
    pub informative: bool,
    pub leaf: bool,
    /// Document-metadata tag (abstract, keyword, author, ...).
    pub meta_name: Option<String>,
    /// Trailing paragraph split off a heading by inline title extraction.
    pub inline_body: Option<String>,
    pub references: Vec<CrossReference>,
    pub content: Content,
    #[serde(skip)]
    pub(crate) line_boxes: Vec<BoundingBox>,
    #[serde(skip)]
    pub(crate) spans: Vec<Span>,
}

impl Element {
    /// Create an element for a block of the given role.
    ///
    /// Header, footer and footnote elements start out non-informative.
    pub fn new(role: Role, page_id: u32, order_id: u32, bbox: BoundingBox, text: impl Into<String>) -> Self {
        let content = match role {
            Role::Table => Content::Table(TableContent {
                table_id: format!("{}-{}", page_id, order_id),
                ..Default::default()
            }),
            Role::Figure => Content::Figure(FigureContent::default()),
            _ => Content::Text,
        };
        Self {
            text: text.into(),
            role,
            page_id,
            order_id,
            global_index: 0,
            bbox,
            title_level: NOT_A_TITLE,
            slot: None,
            informative: !role.is_page_furniture(),
            leaf: false,
            meta_name: None,
            inline_body: None,
            references: Vec::new(),
            content,
            line_boxes: Vec::new(),
            spans: Vec::new(),
        }
    }

    pub fn with_meta_name(mut self, name: impl Into<String>) -> Self {
        self.meta_name = Some(name.into());
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.title_level = level;
        self
    }

    /// Stable `page-order` identifier.
    pub fn id(&self) -> String {
        format!("{}-{}", self.page_id, self.order_id)
    }

    /// Position in the document, assigned once when appended.
    pub fn global_index(&self) -> usize {
        self.global_index
    }

    pub fn is_heading(&self) -> bool {
        self.title_level >= 0
    }

    /// Heading depth, if the element is a heading.
    pub fn heading_level(&self) -> Option<u32> {
        u32::try_from(self.title_level).ok()
    }

    /// Make the element a heading at `level`, clamped at zero.
    pub fn set_level(&mut self, level: i32) {
        self.title_level = level.max(0);
    }

    /// Turn the element back into plain text.
    pub fn demote(&mut self) {
        self.title_level = NOT_A_TITLE;
    }

    /// Boxes of the lines merged into this element.
    pub fn line_boxes(&self) -> &[BoundingBox] {
        &self.line_boxes
    }

    /// Spans merged into this element.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn table(&self) -> Option<&TableContent> {
        match &self.content {
            Content::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut TableContent> {
        match &mut self.content {
            Content::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn figure(&self) -> Option<&FigureContent> {
        match &self.content {
            Content::Figure(f) => Some(f),
            _ => None,
        }
    }

    pub fn figure_mut(&mut self) -> Option<&mut FigureContent> {
        match &mut self.content {
            Content::Figure(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_new_element_defaults() {
        let el = Element::new(Role::Text, 2, 5, bbox(), "body");
        assert_eq!(el.id(), "2-5");
        assert_eq!(el.title_level, NOT_A_TITLE);
        assert!(el.informative);
        assert!(el.heading_level().is_none());
        assert_eq!(el.content, Content::Text);
    }

    #[test]
    fn test_page_furniture_not_informative() {
        assert!(!Element::new(Role::Header, 0, 0, bbox(), "running head").informative);
        assert!(!Element::new(Role::Footnote, 0, 1, bbox(), "1 note").informative);
    }

    #[test]
    fn test_table_content_id() {
        let el = Element::new(Role::Table, 3, 1, bbox(), "<table></table>");
        assert_eq!(el.table().unwrap().table_id, "3-1");
        assert!(el.figure().is_none());
    }

    #[test]
    fn test_set_level_clamps() {
        let mut el = Element::new(Role::DocTitle, 0, 0, bbox(), "Title");
        el.set_level(-3);
        assert_eq!(el.heading_level(), Some(0));
        el.demote();
        assert!(!el.is_heading());
    }
}
