//! Table skeleton matching.
//!
//! The external table-structure model returns an HTML skeleton whose cells
//! are `[]` placeholders, plus a box per detected cell. Cell text is cut out
//! of the page's characters, and the fragments are aligned greedily with the
//! skeleton's logical grid: a fragment fills a grid cell when its x-range
//! overlaps the matched cell above it, or its y-range overlaps the matched
//! cell to its left. Fragments that fit nowhere are forced into the current
//! cell and mark the table untrusted.

use super::options::ErrorMode;
use crate::error::{Error, Result};
use crate::model::{range_overlap, Block, BoundingBox, Page, Role};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder for cell text inside skeleton tokens.
pub const PLACEHOLDER: &str = "[]";

/// Minimum range overlap for a fragment to align with a neighbouring cell.
const OVERLAP_THRESHOLD: f32 = 0.2;

/// Minimum share of a character box inside a cell for it to count as cell text.
const CELL_COVERAGE: f32 = 0.3;

static CELL_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(/?)(tr|td|th)\b([^>]*)>").unwrap());
static SPAN_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(rowspan|colspan)\s*=\s*["']?(\d+)"#).unwrap());
static INNER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Text recognized inside one detected table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFragment {
    pub text: String,
    pub bbox: BoundingBox,
}

impl CellFragment {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A filled skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMatch {
    /// Skeleton tokens with every placeholder resolved.
    pub tokens: Vec<String>,
    /// False when any fragment had to be forced into a cell.
    pub trusted: bool,
}

impl TableMatch {
    /// The filled skeleton as one HTML fragment.
    pub fn body(&self) -> String {
        self.tokens.concat()
    }

    /// The filled skeleton wrapped in a minimal styled HTML page.
    pub fn to_html(&self) -> String {
        table_html(&self.body())
    }
}

/// Wrap table rows in the HTML page used for rendered tables.
pub fn table_html(rows: &str) -> String {
    format!(
        r#"<html>
<head> <meta charset="UTF-8">
<style>
table, th, td {{
    border: 1px solid black;
    font-size: 10px;
}}
</style> </head>
<body>
<table frame="hsides" rules="groups" width="100%">
{}
</table> </body> </html>"#,
        rows
    )
}

/// Whether a skeleton token is a cell placeholder.
pub fn is_placeholder(token: &str) -> bool {
    matches!(
        token,
        "<td>[]</td>" | ">[]</td>" | "<th>[]</th>" | ">[]</th>"
    )
}

/// Why the greedy aligner gave up on a skeleton.
#[derive(Debug)]
enum Misaligned {
    ColumnOverflow { row: usize },
    MoreCellsThanPlaceholders { cells: usize, placeholders: usize },
}

impl fmt::Display for Misaligned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Misaligned::ColumnOverflow { row } => write!(f, "row {} overflows the widest row", row),
            Misaligned::MoreCellsThanPlaceholders { cells, placeholders } => write!(
                f,
                "{} grid cells for {} placeholders",
                cells, placeholders
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SkeletonCell {
    rowspan: usize,
    colspan: usize,
    has_text: bool,
}

/// Parse skeleton tokens into rows of cells.
fn parse_skeleton(tokens: &[String]) -> Vec<Vec<SkeletonCell>> {
    let html = tokens.concat();
    let mut rows: Vec<Vec<SkeletonCell>> = Vec::new();
    let mut open: Option<(SkeletonCell, usize)> = None;

    for caps in CELL_TAG.captures_iter(&html) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let closing = caps.get(1).map_or(false, |m| !m.as_str().is_empty());
        let tag = tag.as_str().to_ascii_lowercase();

        match (tag.as_str(), closing) {
            ("tr", false) => rows.push(Vec::new()),
            ("tr", true) => {}
            (_, false) => {
                let attrs = caps.get(3).map_or("", |m| m.as_str());
                let mut cell = SkeletonCell {
                    rowspan: 1,
                    colspan: 1,
                    has_text: false,
                };
                for attr in SPAN_ATTR.captures_iter(attrs) {
                    let value = attr[2].parse::<usize>().unwrap_or(1).max(1);
                    if attr[1].eq_ignore_ascii_case("rowspan") {
                        cell.rowspan = value;
                    } else {
                        cell.colspan = value;
                    }
                }
                open = Some((cell, whole.end()));
            }
            (_, true) => {
                if let Some((mut cell, start)) = open.take() {
                    let inner = INNER_TAG.replace_all(&html[start..whole.start()], "");
                    cell.has_text = !inner.trim().is_empty();
                    if rows.is_empty() {
                        rows.push(Vec::new());
                    }
                    if let Some(row) = rows.last_mut() {
                        row.push(cell);
                    }
                }
            }
        }
    }
    rows
}

/// Rectangle of a grid cell in (row, col) space, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRect {
    row0: usize,
    col0: usize,
    row1: usize,
    col1: usize,
}

#[derive(Debug, Clone, Copy)]
struct LookupEntry {
    rect: CellRect,
    bbox: Option<BoundingBox>,
}

/// Logical occupancy grid of a skeleton.
struct Grid {
    /// Top-left cells that expect text, in skeleton order.
    anchors: Vec<CellRect>,
    lookup: Vec<Vec<Option<LookupEntry>>>,
    width: usize,
}

#[derive(Debug, Clone, Copy)]
struct Occupancy {
    taken: bool,
    rowspan: usize,
    colspan: usize,
}

impl Grid {
    fn build(rows: &[Vec<SkeletonCell>]) -> std::result::Result<Self, Misaligned> {
        let height = rows.len();
        let width = rows
            .iter()
            .map(|r| r.iter().map(|c| c.colspan).sum::<usize>())
            .max()
            .unwrap_or(0);
        let mut occupancy: Vec<Vec<Option<Occupancy>>> = vec![vec![None; width]; height];

        for (ri, row) in rows.iter().enumerate() {
            let mut col = 0;
            for cell in row {
                while col < width && occupancy[ri][col].map_or(false, |o| o.taken) {
                    col += 1;
                }
                for r in 0..cell.rowspan {
                    for c in 0..cell.colspan {
                        let anchor = r == 0 && c == 0;
                        if !anchor && ri + r >= height {
                            continue;
                        }
                        let slot = occupancy[ri + r]
                            .get_mut(col + c)
                            .ok_or(Misaligned::ColumnOverflow { row: ri })?;
                        *slot = Some(Occupancy {
                            taken: !anchor || !cell.has_text,
                            rowspan: cell.rowspan,
                            colspan: cell.colspan,
                        });
                    }
                }
                col += 1;
            }
        }

        let mut anchors = Vec::new();
        let mut lookup = vec![vec![None; width]; height];
        for (r, row) in occupancy.iter().enumerate() {
            for (c, occ) in row.iter().enumerate() {
                if let Some(occ) = occ {
                    let rect = CellRect {
                        row0: r,
                        col0: c,
                        row1: r + occ.rowspan,
                        col1: c + occ.colspan,
                    };
                    if !occ.taken {
                        anchors.push(rect);
                    }
                    lookup[r][c] = Some(LookupEntry { rect, bbox: None });
                }
            }
        }

        Ok(Self {
            anchors,
            lookup,
            width,
        })
    }

    fn bbox_at(&self, row: usize, col: usize) -> Option<BoundingBox> {
        self.lookup.get(row)?.get(col)?.as_ref()?.bbox
    }

    fn set_bbox(&mut self, rect: CellRect, bbox: BoundingBox) {
        if let Some(Some(entry)) = self.lookup.get_mut(rect.row0).and_then(|r| r.get_mut(rect.col0)) {
            entry.bbox = Some(bbox);
        }
    }

    /// x-range of the nearest matched cell above with the same column span.
    fn above_span(&self, pos: CellRect) -> Option<(f32, f32)> {
        (0..pos.row0).rev().find_map(|r| {
            let entry = self.lookup[r].get(pos.col0)?.as_ref()?;
            let bbox = entry.bbox?;
            (entry.rect.col0 == pos.col0 && entry.rect.col1 == pos.col1).then_some((bbox.x0, bbox.x1))
        })
    }

    /// y-range of the nearest matched cell to the left with the same row span.
    fn left_span(&self, pos: CellRect) -> Option<(f32, f32)> {
        let row = self.lookup.get(pos.row0)?;
        (0..pos.col0).rev().find_map(|c| {
            let entry = row[c].as_ref()?;
            let bbox = entry.bbox?;
            (entry.rect.row0 == pos.row0 && entry.rect.row1 == pos.row1).then_some((bbox.y0, bbox.y1))
        })
    }

    /// Whether a fragment box would sit consistently in the cell at `pos`.
    fn fits(&self, pos: CellRect, fragment: &BoundingBox) -> bool {
        if let Some(above) = self.above_span(pos) {
            if range_overlap(above, (fragment.x0, fragment.x1)) <= OVERLAP_THRESHOLD {
                return false;
            }
            return match self.bbox_at(pos.row0, pos.col0) {
                Some(own) => range_overlap((own.y0, own.y1), (fragment.y0, fragment.y1)) > OVERLAP_THRESHOLD,
                None => true,
            };
        }
        if let Some(left) = self.left_span(pos) {
            return range_overlap(left, (fragment.y0, fragment.y1)) > OVERLAP_THRESHOLD;
        }
        true
    }
}

fn mid(range: (f32, f32)) -> f32 {
    (range.0 + range.1) / 2.0
}

/// Greedy alignment state.
struct Aligner<'a> {
    grid: Grid,
    fragments: &'a [CellFragment],
    filled: Vec<Option<String>>,
    give_up: bool,
}

impl<'a> Aligner<'a> {
    fn assign(&mut self, cell: usize, fragment: &CellFragment) {
        let rect = self.grid.anchors[cell];
        self.grid.set_bbox(rect, fragment.bbox);
        self.filled[cell] = Some(fragment.text.clone());
    }

    fn absorb_into(&mut self, cell: usize, fragment: &CellFragment) {
        let text = self.filled[cell].get_or_insert_with(String::new);
        text.push_str(&fragment.text);
    }

    /// Align fragments with anchors in order. Returns how many fragments
    /// were consumed; the rest had no cell left.
    fn run(&mut self) -> usize {
        let mut cell_id = 0;
        let mut frag_id = 0;
        let anchors = self.grid.anchors.clone();
        let fragments = self.fragments;

        while frag_id < fragments.len() && cell_id < anchors.len() {
            let pos = anchors[cell_id];
            let fragment = &fragments[frag_id];
            let fb = fragment.bbox;

            let (from_above, aligned) = if let Some(above) = self.grid.above_span(pos) {
                let hit = range_overlap(above, (fb.x0, fb.x1)) > OVERLAP_THRESHOLD
                    || (pos.col0 == 0 && mid(above) > mid((fb.x0, fb.x1)));
                (true, hit)
            } else if let Some(left) = self.grid.left_span(pos) {
                (false, range_overlap(left, (fb.y0, fb.y1)) > OVERLAP_THRESHOLD)
            } else {
                (false, true)
            };

            if aligned {
                self.assign(cell_id, fragment);
                frag_id += 1;
                cell_id += 1;
                continue;
            }

            // The fragment may belong to the next cell (a skipped cell) ...
            if cell_id + 1 < anchors.len() && self.grid.fits(anchors[cell_id + 1], &fb) {
                log::debug!("fragment {} skips ahead to cell {}", frag_id, cell_id + 1);
                self.assign(cell_id + 1, fragment);
                frag_id += 1;
                cell_id += 2;
                continue;
            }
            // ... or continue the previous one (an over-split cell).
            if cell_id > 0 && self.grid.fits(anchors[cell_id - 1], &fb) {
                log::debug!("fragment {} joins cell {}", frag_id, cell_id - 1);
                self.grid.set_bbox(anchors[cell_id - 1], fb);
                self.absorb_into(cell_id - 1, fragment);
                frag_id += 1;
                continue;
            }

            let mut recovered = false;
            if from_above && cell_id > 0 {
                let prev = anchors[cell_id - 1];
                let prev_bbox = self.grid.bbox_at(prev.row0, prev.col0);
                let same_line = prev_bbox.map_or(false, |pb| {
                    range_overlap((pb.y0, pb.y1), (fb.y0, fb.y1)) > OVERLAP_THRESHOLD
                });
                if prev.row0 < pos.row0 && same_line {
                    self.absorb_into(cell_id - 1, fragment);
                    frag_id += 1;
                    recovered = true;
                } else if prev.row0 == pos.row0 && same_line {
                    let left_of_up_right = if pos.col0 + 1 < self.grid.width {
                        pos.row0
                            .checked_sub(1)
                            .and_then(|r| self.grid.bbox_at(r, pos.col0 + 1))
                            .map_or(false, |ur| mid((fb.x0, fb.x1)) < mid((ur.x0, ur.x1)))
                    } else {
                        true
                    };
                    if left_of_up_right {
                        self.assign(cell_id, fragment);
                        frag_id += 1;
                        cell_id += 1;
                        recovered = true;
                    }
                }
            }

            if !recovered {
                log::debug!("forcing fragment {} into cell {}", frag_id, cell_id);
                self.assign(cell_id, fragment);
                frag_id += 1;
                cell_id += 1;
                self.give_up = true;
            }
        }
        frag_id
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn fill_placeholders(tokens: &[String], mut texts: impl Iterator<Item = String>) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            if is_placeholder(token) {
                let text = texts.next().unwrap_or_default();
                token.replace(PLACEHOLDER, &escape_html(&text))
            } else {
                token.clone()
            }
        })
        .collect()
}

fn align(tokens: &[String], fragments: &[CellFragment]) -> std::result::Result<TableMatch, Misaligned> {
    let grid = Grid::build(&parse_skeleton(tokens))?;
    let placeholders = tokens.iter().filter(|t| is_placeholder(t)).count();
    if grid.anchors.len() > placeholders {
        return Err(Misaligned::MoreCellsThanPlaceholders {
            cells: grid.anchors.len(),
            placeholders,
        });
    }

    let cells = grid.anchors.len();
    let mut aligner = Aligner {
        grid,
        fragments,
        filled: vec![None; cells],
        give_up: false,
    };
    let consumed = aligner.run();
    if consumed < fragments.len() {
        log::debug!(
            "dropped {} surplus fragments after filling {} cells",
            fragments.len() - consumed,
            cells
        );
    }

    let texts = aligner.filled.into_iter().map(Option::unwrap_or_default);
    Ok(TableMatch {
        tokens: fill_placeholders(tokens, texts),
        trusted: !aligner.give_up,
    })
}

/// Fill placeholders strictly in order. Always untrusted.
pub fn match_in_order(tokens: &[String], fragments: &[CellFragment]) -> TableMatch {
    let texts = fragments.iter().map(|f| f.text.clone());
    TableMatch {
        tokens: fill_placeholders(tokens, texts),
        trusted: false,
    }
}

/// Align cell fragments with a skeleton.
///
/// Never fails: a skeleton the grid cannot represent degrades to
/// [`match_in_order`].
pub fn match_cells(tokens: &[String], fragments: &[CellFragment]) -> TableMatch {
    match align(tokens, fragments) {
        Ok(matched) => matched,
        Err(reason) => {
            log::warn!("table alignment failed ({}), filling cells in order", reason);
            match_in_order(tokens, fragments)
        }
    }
}

/// Dominant text rotation of a block, weighted by character count.
pub fn dominant_rotation(block: &Block) -> i32 {
    let mut weights: BTreeMap<i32, usize> = BTreeMap::new();
    for span in block.spans().filter(|s| !s.text.is_empty()) {
        let angle = (span.rotation.trunc() as i32).rem_euclid(360);
        *weights.entry(angle).or_insert(0) += span.text.chars().count();
    }
    weights
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map_or(0, |(angle, _)| angle)
}

/// Cut the text of every model cell out of a table block.
///
/// Cell boxes come in table-crop pixel space and are rotated back and
/// translated into layout-image space to collect text; span and character
/// boxes are rescaled from page space into the same space. Fragments keep
/// the upright crop-space box so rows and columns stay in skeleton order
/// for rotated tables.
pub fn cell_fragments(page: &Page, block: &Block, cells: &[BoundingBox]) -> Vec<CellFragment> {
    let rotation = dominant_rotation(block);
    let size = match rotation {
        90 | 270 => (block.bbox.height(), block.bbox.width()),
        _ => (block.bbox.width(), block.bbox.height()),
    };

    cells
        .iter()
        .map(|cell| {
            let local = if rotation != 0 {
                cell.rotate(rotation, size)
            } else {
                *cell
            };
            let projected = local.translate(block.bbox.x0, block.bbox.y0);

            let mut char_text = String::new();
            let mut span_text = String::new();
            for span in block.spans() {
                match &span.chars {
                    Some(chars) => {
                        for c in chars {
                            if page.to_image_space(&c.bbox).intersection_pct(&projected) >= CELL_COVERAGE {
                                char_text.push(c.ch);
                            }
                        }
                    }
                    None => {
                        if page.to_image_space(&span.bbox).intersection_pct(&projected) >= CELL_COVERAGE {
                            span_text.push_str(&span.text);
                        }
                    }
                }
            }
            let text = if char_text.is_empty() { span_text } else { char_text };
            CellFragment::new(text, *cell)
        })
        .collect()
}

/// Fill every table block that carries table-model output.
///
/// A block whose model output has more than twice as many cells as the
/// skeleton has placeholders breaks the model contract: it is an error in
/// strict mode and is filled in order in lenient mode.
pub fn fill_table_blocks(pages: &mut [Page], mode: ErrorMode) -> Result<()> {
    for page_index in 0..pages.len() {
        let snapshot = pages[page_index].clone();
        for (block_index, block) in pages[page_index].blocks.iter_mut().enumerate() {
            if block.role != Role::Table {
                continue;
            }
            let Some(model) = &block.table else {
                continue;
            };

            let source = &snapshot.blocks[block_index];
            let fragments = cell_fragments(&snapshot, source, &model.cells);
            let placeholders = model.skeleton.iter().filter(|t| is_placeholder(t)).count();

            let matched = if placeholders > 0 && fragments.len() > 2 * placeholders {
                match mode {
                    ErrorMode::Strict => {
                        return Err(Error::TableCellMismatch {
                            page: snapshot.number,
                            placeholders,
                            fragments: fragments.len(),
                        })
                    }
                    ErrorMode::Lenient => {
                        log::warn!(
                            "table on page {} has {} fragments for {} placeholders",
                            snapshot.number,
                            fragments.len(),
                            placeholders
                        );
                        match_in_order(&model.skeleton, &fragments)
                    }
                }
            } else {
                match_cells(&model.skeleton, &fragments)
            };

            log::debug!(
                "filled table on page {} ({} cells, trusted={})",
                snapshot.number,
                fragments.len(),
                matched.trusted
            );
            block.html = Some(matched.to_html());
            block.trusted = Some(matched.trusted);
        }
    }
    Ok(())
}
