//! Nested document tree.

use crate::model::{Content, CrossReference, Element, Role, Structure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Title {
        id: String,
        text: String,
        elements: Vec<Node>,
    },
    Para {
        id: String,
        text: String,
        corresponding_medium: Vec<CrossReference>,
    },
    Table {
        id: String,
        table_title: Option<String>,
        table_html: String,
        table_footnote: Option<String>,
        table_figure_url: Option<String>,
        table_trust: bool,
    },
    Figure {
        id: String,
        figure_title: Option<String>,
        figure_caption: Option<String>,
        figure_url: Option<String>,
        figure_footnote: Option<String>,
    },
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Title { id, .. }
            | Node::Para { id, .. }
            | Node::Table { id, .. }
            | Node::Figure { id, .. } => id,
        }
    }

    /// Children of a title node; empty for every other node.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Title { elements, .. } => elements,
            _ => &[],
        }
    }

    fn push_child(&mut self, child: Node) {
        if let Node::Title { elements, .. } = self {
            elements.push(child);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(Node::count).sum::<usize>()
    }
}

/// Tree form of a reconstructed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentTree {
    pub file_name: String,
    pub json_tree: Vec<Node>,
    /// Metadata texts keyed by tag, plus first-page running headers,
    /// footers and footnotes keyed by role label.
    pub extra_info: BTreeMap<String, Vec<String>>,
}

impl DocumentTree {
    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.json_tree.iter().map(Node::count).sum()
    }
}

struct OpenTitle {
    level: i32,
    node: Node,
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<Node>,
    stack: Vec<OpenTitle>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(open) => open.node.push_child(node),
            None => self.roots.push(node),
        }
    }

    /// Close every open title at `level` or deeper.
    fn close_from(&mut self, level: i32) {
        while self.stack.last().is_some_and(|open| open.level >= level) {
            if let Some(open) = self.stack.pop() {
                self.attach(open.node);
            }
        }
    }

    fn open(&mut self, level: i32, node: Node) {
        self.close_from(level);
        self.stack.push(OpenTitle { level, node });
    }

    fn finish(mut self) -> Vec<Node> {
        self.close_from(i32::MIN);
        self.roots
    }
}

fn para(el: &Element, text: &str) -> Node {
    Node::Para {
        id: el.id(),
        text: text.to_string(),
        corresponding_medium: el.references.clone(),
    }
}

fn title_node(el: &Element) -> Node {
    let elements = el.inline_body.as_deref().map(|body| para(el, body)).into_iter().collect();
    Node::Title {
        id: el.id(),
        text: el.text.clone(),
        elements,
    }
}

fn media_node(el: &Element) -> Option<Node> {
    match &el.content {
        Content::Table(table) => Some(Node::Table {
            id: el.id(),
            table_title: table.title.clone(),
            table_html: el.text.clone(),
            table_footnote: table.footnote.clone(),
            table_figure_url: table.figure_url.clone(),
            table_trust: table.trusted,
        }),
        Content::Figure(figure) => Some(Node::Figure {
            id: el.id(),
            figure_title: figure.title.clone(),
            figure_caption: figure.caption.clone(),
            figure_url: figure.url.clone(),
            figure_footnote: figure.footnote.clone(),
        }),
        Content::Text => None,
    }
}

/// Build the tree of `structure`.
///
/// Each heading opens a title node below the closest open heading of a
/// smaller level. Paragraphs, tables and figures attach to the innermost
/// open heading, or to the root before the first heading. Captions are
/// carried by their table or figure node rather than emitted as
/// paragraphs.
pub fn build_tree(structure: &Structure, document_name: &str) -> DocumentTree {
    let mut builder = TreeBuilder::default();
    let mut extra_info: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for el in structure {
        if el.page_id == 0 && matches!(el.role, Role::Header | Role::Footer | Role::Footnote) {
            extra_info
                .entry(el.role.label().to_string())
                .or_default()
                .push(el.text.clone());
        }
        if !el.informative {
            continue;
        }
        if let Some(meta) = &el.meta_name {
            extra_info.entry(meta.clone()).or_default().push(el.text.clone());
            continue;
        }

        if el.is_heading() {
            builder.open(el.title_level, title_node(el));
        } else if let Some(node) = media_node(el) {
            builder.attach(node);
        } else if !matches!(el.role, Role::TableTitle | Role::FigureTitle) && !el.text.is_empty() {
            builder.attach(para(el, &el.text));
        }
    }

    let json_tree = builder.finish();
    log::debug!("built tree of {} top-level nodes for {}", json_tree.len(), document_name);
    DocumentTree {
        file_name: document_name.to_string(),
        json_tree,
        extra_info,
    }
}
