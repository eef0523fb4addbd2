//! Line text composition.
//!
//! Turns the spans of each line into final text. On the OCR path spans carry
//! per-character boxes; characters are regrouped by vertical overlap so that
//! smaller, offset runs can be rendered as LaTeX-style sub/superscripts
//! (`$_{2}$`, `$^{+}$`).

use crate::model::{BoundingBox, CharBox, Line, Page, Role, Span};
use serde::{Deserialize, Serialize};

/// Vertical overlap above which a character joins the running group.
const SAME_BASELINE_RATIO: f32 = 0.65;

/// Characters that never appear inside a sub/superscript.
const NON_SCRIPT_CHARS: &str = "&%$#_}{~^【】？～、，；：;:,。》><《￥`·()、";

/// Punctuation accepted by [`is_only_punctuation`] besides ASCII punctuation.
const EXTRA_PUNCTUATION: &str = "。？，！：（）【】《》——“”‘’";

/// A line with its composed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedLine {
    pub text: String,
    pub bbox: BoundingBox,
    /// Lower-cased font names of the line's spans.
    pub fonts: Vec<String>,
}

/// A block whose lines have been composed into text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedBlock {
    pub lines: Vec<MergedLine>,
    pub bbox: BoundingBox,
    pub role: Role,
    pub page: u32,
    pub html: Option<String>,
    pub trusted: Option<bool>,
    pub spans: Vec<Span>,
}

/// Compose the text of every line on every page.
///
/// Lines without spans are dropped, and so are text blocks left without
/// lines. Table and figure blocks are always kept.
pub fn merge_spans(pages: &[Page]) -> Vec<Vec<MergedBlock>> {
    pages
        .iter()
        .map(|page| {
            page.blocks
                .iter()
                .filter_map(|block| {
                    let mut spans = Vec::new();
                    let lines: Vec<MergedLine> = block
                        .lines
                        .iter()
                        .filter(|line| !line.spans.is_empty())
                        .map(|line| {
                            spans.extend(line.spans.iter().cloned());
                            MergedLine {
                                text: compose_line_text(line),
                                bbox: line.bbox,
                                fonts: line.spans.iter().map(|s| s.font_name.to_lowercase()).collect(),
                            }
                        })
                        .collect();
                    let is_media = matches!(block.role, Role::Table | Role::Figure);
                    if lines.is_empty() && !is_media {
                        return None;
                    }
                    Some(MergedBlock {
                        lines,
                        bbox: block.bbox,
                        role: block.role,
                        page: block.page,
                        html: block.html.clone(),
                        trusted: block.trusted,
                        spans,
                    })
                })
                .collect()
        })
        .collect()
}

/// Final text of a line.
///
/// Consecutive unrotated spans with character boxes are composed together;
/// other spans contribute their literal text.
pub fn compose_line_text(line: &Line) -> String {
    let mut text = String::new();
    let mut run: Vec<CharBox> = Vec::new();

    for span in &line.spans {
        match &span.chars {
            Some(chars) if span.rotation.trunc() == 0.0 => run.extend(chars.iter().cloned()),
            _ => {
                if !run.is_empty() {
                    text.push_str(&compose_chars(&mut run));
                    run.clear();
                }
                text.push_str(&span.text);
            }
        }
    }
    if !run.is_empty() {
        text.push_str(&compose_chars(&mut run));
    }
    text
}

#[derive(Clone, Copy, PartialEq)]
enum ScriptPosition {
    Baseline,
    Below,
    Above,
}

/// Regroup characters by vertical overlap and emit sub/superscripts.
fn compose_chars(chars: &mut [CharBox]) -> String {
    // OCR tends to emit a closing bracket before the opening one.
    for i in 0..chars.len().saturating_sub(1) {
        if matches!(chars[i].ch, '（' | '《' | '(') && chars[i + 1].ch == ']' {
            chars.swap(i, i + 1);
        }
    }

    let mut text = String::new();
    let mut group = String::new();
    let mut group_range: Option<(f32, f32)> = None;
    let mut group_height = 0.0f32;
    let mut position = ScriptPosition::Baseline;

    for c in chars.iter() {
        if c.ch == '\r' || c.ch == '\n' {
            continue;
        }
        let (y0, y1) = (c.bbox.y0, c.bbox.y1);
        let height = y1 - y0;
        let is_space = c.ch == ' ' || c.ch == '\u{3000}';

        let Some((gy0, gy1)) = group_range else {
            if height != 0.0 && !is_space {
                group_range = Some((y0, y1));
                group_height = height;
            }
            group.push(c.ch);
            continue;
        };

        if vertical_ratio((y0, y1), (gy0, gy1)) > SAME_BASELINE_RATIO || height == 0.0 || is_space {
            group.push(c.ch);
            continue;
        }

        let char_center = (y0 + y1) / 2.0;
        let group_center = (gy0 + gy1) / 2.0;
        if height > group_height {
            let pos = if group_center > char_center {
                ScriptPosition::Below
            } else {
                ScriptPosition::Above
            };
            text.push_str(&wrap_script(&group, pos));
            position = ScriptPosition::Baseline;
        } else {
            text.push_str(&group);
            position = if char_center > group_center {
                ScriptPosition::Below
            } else {
                ScriptPosition::Above
            };
        }
        group_range = Some((y0, y1));
        group_height = height;
        group.clear();
        group.push(c.ch);
    }

    text.push_str(&wrap_script(&group, position));
    text
}

fn wrap_script(group: &str, position: ScriptPosition) -> String {
    match position {
        ScriptPosition::Below if is_plausible_script(group) => format!("$_{{{}}}$", group),
        ScriptPosition::Above if is_plausible_script(group) => format!("$^{{{}}}$", group),
        _ => group.to_string(),
    }
}

/// Overlap of two vertical ranges relative to the taller one.
fn vertical_ratio(a: (f32, f32), b: (f32, f32)) -> f32 {
    let inter = a.1.min(b.1) - a.0.max(b.0);
    let taller = (a.1 - a.0).max(b.1 - b.0);
    if inter <= 0.0 || taller <= 0.0 {
        0.0
    } else {
        inter / taller
    }
}

/// Whether `text` is a believable sub/superscript run.
pub fn is_plausible_script(text: &str) -> bool {
    if text.trim().chars().count() > 9 {
        return false;
    }
    if text.chars().filter(|c| c.is_ascii_uppercase()).count() > 3 {
        return false;
    }
    if text.chars().filter(|c| c.is_ascii_lowercase()).count() > 4 {
        return false;
    }
    if is_only_punctuation(text) {
        return false;
    }
    if text.chars().any(|c| crate::text::is_cjk(c) || c == '.') {
        return false;
    }
    !text.chars().any(|c| NON_SCRIPT_CHARS.contains(c))
}

fn is_only_punctuation(text: &str) -> bool {
    let stripped: String = text.chars().filter(|c| *c != ' ').collect();
    !stripped.is_empty()
        && stripped
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace() || EXTRA_PUNCTUATION.contains(c))
}
