//! From layout-model pages to a flat element structure.

mod layout;
mod merger;
mod options;
mod table_matcher;

pub use layout::{compose_line_text, merge_spans, MergedBlock, MergedLine};
pub use merger::{escape_markdown, join_lines, merge_blocks};
pub use options::{ErrorMode, ReconstructOptions};
pub use table_matcher::{
    cell_fragments, dominant_rotation, fill_table_blocks, match_cells, match_in_order, table_html,
    CellFragment, TableMatch,
};
