//! Heading recognition and heading-depth inference.
//!
//! Headings in Chinese technical documents are numbered in one of a fixed
//! set of conventions (`第一章`, `一、`, `（一）`, `1.2.3`, `①`, ...). The
//! classifier in [`patterns`] maps a text to its [`Slot`] in that taxonomy;
//! [`TitleLevelParser`] turns the sequence of slots into heading levels.

mod inline;
mod level;
mod order;
mod patterns;
mod relations;

pub use inline::{extract as extract_inline_title, split_inline_title, InlineSplit};
pub use level::{assign_from_roles, predict_levels, TitleLevelParser};
pub use order::{book_index, chinese_numeral, is_next_in_sequence, title_order};
pub use patterns::{
    classify, header_content, is_empty_chapter, is_lowest_cue, looks_like_heading, not_title,
    starts_numbering, Slot,
};
pub use relations::{SlotRelations, SlotSet};
