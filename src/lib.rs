//! # unflat
//!
//! Reconstructs hierarchical documents from flat layout-model output.
//!
//! Upstream layout and OCR models hand over a flat list of pages whose
//! blocks carry a coarse role label (`doc_title`, `text`, `table`, ...).
//! This library merges those blocks into paragraphs, infers heading depth
//! from the numbering conventions of Chinese technical documents, fills
//! table skeletons with recognized cell text and pairs captions with their
//! tables and figures. The result renders as Markdown or as a nested tree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unflat::{load_pages, reconstruct};
//!
//! fn main() -> unflat::Result<()> {
//!     let pages = load_pages("pages.json")?;
//!     let structure = reconstruct(&pages)?;
//!
//!     println!("{}", structure.to_markdown());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. Table blocks with table-model output get their skeleton filled.
//! 2. Spans are composed into lines and blocks ([`parser::merge_spans`]).
//! 3. Continuation paragraphs are merged into elements ([`parser::merge_blocks`]).
//! 4. Heading levels are assigned ([`title::TitleLevelParser`]).
//! 5. Captions are attached and cross-references linked ([`caption`]).

pub mod caption;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod text;
pub mod title;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use detect::{DocumentKind, DocumentProfile, Language};
pub use error::{Error, Result};
pub use model::{
    Block, BoundingBox, Content, CrossReference, Element, Line, Page, Role, Span, Structure,
    TableModelOutput, NOT_A_TITLE,
};
pub use parser::{ErrorMode, ReconstructOptions};
pub use render::{DocumentTree, JsonFormat, Node};
pub use title::{Slot, TitleLevelParser};

use rayon::prelude::*;
use std::io::Read;
use std::path::Path;

/// Reconstruct a document with default options.
///
/// # Arguments
///
/// * `pages` - Layout-model pages in reading order
///
/// # Example
///
/// ```
/// use unflat::{reconstruct, Block, BoundingBox, Line, Page, Role, Span};
///
/// let bbox = BoundingBox::new(0.0, 0.0, 200.0, 20.0);
/// let mut page = Page::new(0, BoundingBox::new(0.0, 0.0, 600.0, 800.0));
/// page.add_block(
///     Block::new(Role::Text, 0, bbox)
///         .with_lines(vec![Line::from_spans(vec![Span::new("Hello.", bbox)])]),
/// );
///
/// let structure = reconstruct(&[page]).unwrap();
/// assert_eq!(structure.to_markdown(), "Hello.");
/// ```
pub fn reconstruct(pages: &[Page]) -> Result<Structure> {
    reconstruct_with_options(pages, &ReconstructOptions::default())
}

/// Reconstruct a document with custom options.
///
/// Only broken collaborator contracts are returned as errors; see
/// [`ErrorMode`].
pub fn reconstruct_with_options(pages: &[Page], options: &ReconstructOptions) -> Result<Structure> {
    let mut pages = pages.to_vec();
    if options.parse_tables {
        parser::fill_table_blocks(&mut pages, options.error_mode)?;
    }

    let profile = match (options.language, options.document_kind) {
        (Some(language), Some(kind)) => DocumentProfile { language, kind },
        (language, kind) => {
            let detected = detect::classify(&pages);
            DocumentProfile {
                language: language.unwrap_or(detected.language),
                kind: kind.unwrap_or(detected.kind),
            }
        }
    };

    let merged = parser::merge_spans(&pages);
    let mut structure = parser::merge_blocks(&merged, options);

    match profile.language {
        Language::Chinese => TitleLevelParser::new(profile.kind).predict(&mut structure),
        _ => title::assign_from_roles(&mut structure),
    }

    if options.associate_captions {
        caption::associate(&mut structure);
    }

    log::info!(
        "reconstructed {} pages into {} elements as {}",
        pages.len(),
        structure.len(),
        profile
    );
    Ok(structure)
}

/// Reconstruct several independent documents in parallel.
///
/// Results are returned in input order; one failing document does not
/// affect the others.
pub fn reconstruct_many(documents: &[Vec<Page>], options: &ReconstructOptions) -> Vec<Result<Structure>> {
    documents
        .par_iter()
        .map(|pages| reconstruct_with_options(pages, options))
        .collect()
}

/// Parse layout-model pages from JSON.
pub fn parse_pages_json(json: &str) -> Result<Vec<Page>> {
    Ok(serde_json::from_str(json)?)
}

/// Read layout-model pages from a reader.
pub fn read_pages<R: Read>(reader: R) -> Result<Vec<Page>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load layout-model pages from a JSON file.
pub fn load_pages<P: AsRef<Path>>(path: P) -> Result<Vec<Page>> {
    let file = std::fs::File::open(path)?;
    read_pages(std::io::BufReader::new(file))
}

/// Builder for reconstructing documents.
///
/// # Example
///
/// ```no_run
/// use unflat::{DocumentKind, Unflat};
///
/// let markdown = Unflat::new()
///     .lenient()
///     .with_document_kind(DocumentKind::Guideline)
///     .reconstruct_file("pages.json")?
///     .to_markdown();
/// # Ok::<(), unflat::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unflat {
    options: ReconstructOptions,
}

impl Unflat {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Downgrade broken table contracts to warnings.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Keep table blocks as plain text.
    pub fn without_tables(mut self) -> Self {
        self.options = self.options.without_tables();
        self
    }

    /// Skip caption association.
    pub fn without_captions(mut self) -> Self {
        self.options = self.options.with_captions(false);
        self
    }

    /// Override the detected document kind.
    pub fn with_document_kind(mut self, kind: DocumentKind) -> Self {
        self.options = self.options.with_document_kind(kind);
        self
    }

    /// Override the detected language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.options = self.options.with_language(language);
        self
    }

    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Reconstruct from pages already in memory.
    pub fn reconstruct(&self, name: impl Into<String>, pages: &[Page]) -> Result<Reconstruction> {
        Ok(Reconstruction {
            name: name.into(),
            structure: reconstruct_with_options(pages, &self.options)?,
        })
    }

    /// Reconstruct from a pages JSON file; the file stem names the document.
    pub fn reconstruct_file<P: AsRef<Path>>(&self, path: P) -> Result<Reconstruction> {
        let path = path.as_ref();
        let pages = load_pages(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.reconstruct(name, &pages)
    }
}

/// A reconstructed document together with its name.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub name: String,
    pub structure: Structure,
}

impl Reconstruction {
    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        self.structure.to_markdown()
    }

    /// Build the nested document tree.
    pub fn to_tree(&self) -> DocumentTree {
        self.structure.to_tree(&self.name)
    }

    /// Serialize the document tree.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.to_tree(), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pages_json_rejects_short_bbox() {
        let json = r#"[{"pnum": 0, "bbox": [0, 0, 600], "blocks": []}]"#;
        assert!(parse_pages_json(json).is_err());
    }

    #[test]
    fn test_empty_document() {
        let structure = reconstruct(&[]).unwrap();
        assert!(structure.is_empty());
        assert_eq!(structure.to_markdown(), "");
    }

    #[test]
    fn test_builder_options() {
        let builder = Unflat::new().lenient().without_tables().with_document_kind(DocumentKind::Book);
        assert_eq!(builder.options().error_mode, ErrorMode::Lenient);
        assert!(!builder.options().parse_tables);
        assert_eq!(builder.options().document_kind, Some(DocumentKind::Book));
    }
}
