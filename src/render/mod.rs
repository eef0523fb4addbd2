//! Rendering of a reconstructed structure to Markdown, a nested tree and JSON.

mod json;
mod markdown;
mod tree;

pub use json::{to_json, JsonFormat};
pub use markdown::to_markdown;
pub use tree::{build_tree, DocumentTree, Node};
