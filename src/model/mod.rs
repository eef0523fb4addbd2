//! Document model types.
//!
//! The input side (`Page`, `Block`, `Line`, `Span`) mirrors what the layout
//! and OCR collaborators emit. The output side is a [`Structure`]: a flat,
//! globally indexed arena of [`Element`]s that the reconstruction stages
//! mutate in place before it is rendered.

mod element;
mod geometry;
mod page;
mod structure;

pub use element::{
    Content, CrossReference, Element, FigureContent, MediaKind, TableContent, NOT_A_TITLE,
};
pub use geometry::{range_overlap, BoundingBox};
pub use page::{Block, CharBox, Line, Page, Role, Span, TableModelOutput};
pub use structure::Structure;
