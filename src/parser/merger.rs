//! Block merging: composed blocks become a flat [`Structure`] of elements.
//!
//! Paragraph blocks that continue the previous paragraph (same column, no
//! sentence end, similar line height) are appended to the previous element
//! instead of starting a new one.

use super::layout::MergedBlock;
use super::options::ReconstructOptions;
use crate::model::{Content, Element, Role, Structure};
use crate::text::is_cjk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Vertical gap beyond which two blocks on one page are never joined.
const MAX_BLOCK_GAP: f32 = 10.0;

static HYPHEN_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)[\p{Lo}\p{Ll}\d][-—¬]\s?$").unwrap());
static HYPHEN_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-—¬]\s?$").unwrap());
static LOWER_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s?[\p{Lo}\p{Ll}\d]").unwrap());
static OPEN_LINE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)[\p{Lo}\p{Ll}\d][,;(—"'*]?\s?$"#).unwrap());
static LETTER_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s?[\p{L}\d]").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。ๆ.?!？！]\s?$").unwrap());
static ENUMERATION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([①②③④⑤⑥⑦⑧⑨⑩]|\(\d\)).+").unwrap());

/// Join two text fragments of a block with the given role.
pub fn join_lines(line1: &str, line2: &str, role: Role) -> String {
    if HYPHEN_END.is_match(line1) && LOWER_START.is_match(line2) {
        let head = HYPHEN_TAIL.replace(line1, "");
        return format!("{}{}", head.trim_end(), line2.trim_start());
    }

    let last = line1.chars().filter(|c| *c != '\n').last();
    let first = line2.chars().find(|c| *c != '\n');
    if let (Some(a), Some(b)) = (last, first) {
        if is_cjk(a) && is_cjk(b) {
            return format!("{}{}", line1.trim_end(), line2.trim_start());
        }
    }

    if role.is_heading() {
        return format!("{} {}", line1.trim_end(), line2.trim_start());
    }
    if OPEN_LINE_END.is_match(line1) && LETTER_START.is_match(line2) {
        return format!("{} {}", line1.trim_end(), line2.trim_start());
    }
    if role == Role::Table {
        return format!("{}\n\n{}", line1, line2);
    }
    format!("{} {}", line1, line2)
}

/// Whether `text` ends a sentence.
pub fn ends_sentence(text: &str) -> bool {
    SENTENCE_END.is_match(text)
}

/// Whether `text` starts with a circled or parenthesized enumeration marker.
pub fn starts_enumeration(text: &str) -> bool {
    ENUMERATION_START.is_match(text)
}

/// Escape `#` unless it is already escaped.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if c == '#' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn escape_for(role: Role, text: &str) -> String {
    if role.is_heading() || role == Role::Table {
        text.to_string()
    } else {
        escape_markdown(text)
    }
}

/// Whether `block` looks like a visual continuation of `element`.
///
/// Compares the height of the element's last line with the block's first
/// line, the alignment of the element's right edge and the font weight of
/// the adjoining spans.
pub fn similar_text_height(element: &Element, block: &MergedBlock) -> bool {
    let boxes = element.line_boxes();
    let (Some(last), Some(first)) = (boxes.last(), block.lines.first()) else {
        return false;
    };

    let mut el_height = last.height();
    let bl_height = first.bbox.height();
    if el_height == 0.0 && boxes.len() >= 2 {
        el_height = boxes[boxes.len() - 2].height();
    }
    let max_height = el_height.max(bl_height);
    let min_height = el_height.min(bl_height);
    let ratio = (max_height - min_height) / (max_height + 0.0001);

    let right_distance = if boxes.len() >= 2 {
        boxes[boxes.len() - 2].x1 - last.x1
    } else {
        0.0
    };

    let spans = element.spans();
    let el_weight = match spans {
        [.., prev, last] if last.text.trim().is_empty() => Some(prev.font_weight),
        [.., last] => Some(last.font_weight),
        [] => None,
    };
    let bl_weight = block.spans.first().map(|s| s.font_weight);

    ratio < 0.3 && right_distance.abs() < 2.0 * bl_height && el_weight == bl_weight
}

fn join_block_text(block: &MergedBlock) -> String {
    let mut text = String::new();
    for line in &block.lines {
        if text.is_empty() {
            text = line.text.clone();
        } else {
            text = join_lines(&text, &line.text, block.role);
        }
    }
    text
}

fn new_element(block: &MergedBlock, page_id: u32, order_id: u32, text: String) -> Element {
    let mut element = Element::new(block.role, page_id, order_id, block.bbox, text);
    element.line_boxes = block.lines.iter().map(|l| l.bbox).collect();
    element.spans = block.spans.clone();
    if let Content::Table(table) = &mut element.content {
        table.trusted = block.trusted.unwrap_or(false);
    }
    element
}

/// Build the element structure from composed blocks.
pub fn merge_blocks(pages: &[Vec<MergedBlock>], options: &ReconstructOptions) -> Structure {
    let mut structure = Structure::new();
    let mut prev_role: Option<Role> = None;
    let mut prev_para: Option<&MergedBlock> = None;
    let mut prev_text = String::new();
    let mut prev_index = 0usize;

    for (page_id, page) in pages.iter().enumerate() {
        let page_id = page_id as u32;
        for (order_id, block) in page.iter().enumerate() {
            let order_id = order_id as u32;

            if block.role != Role::Text {
                let text = match (block.role, &block.html) {
                    (Role::Table, Some(html)) if options.parse_tables => html.clone(),
                    (Role::Figure, _) => String::new(),
                    _ => escape_for(block.role, &join_block_text(block)),
                };
                structure.push(new_element(block, page_id, order_id, text));
                prev_role = Some(block.role);
                continue;
            }

            let text = join_block_text(block);
            let starts_new = match prev_para {
                None => true,
                Some(prev) if prev.page == block.page && prev.bbox.y0 < block.bbox.y0 - MAX_BLOCK_GAP => {
                    true
                }
                Some(_) => {
                    ends_sentence(&prev_text)
                        || prev_role.map_or(false, |r| r.is_heading())
                        || starts_enumeration(&text)
                        || !similar_text_height(&structure[prev_index], block)
                }
            };

            if starts_new {
                prev_index = structure.push(new_element(block, page_id, order_id, escape_markdown(&text)));
                prev_text = text;
            } else {
                let joined = join_lines(&prev_text, &text, block.role);
                log::debug!(
                    "joining block {}-{} into element {}",
                    page_id,
                    order_id,
                    prev_index
                );
                if let Some(element) = structure.get_mut(prev_index) {
                    element.text = escape_markdown(&joined);
                    element.line_boxes.extend(block.lines.iter().map(|l| l.bbox));
                    element.spans.extend(block.spans.iter().cloned());
                }
                prev_text = joined;
            }
            prev_para = Some(block);
            prev_role = Some(block.role);
        }
    }

    log::debug!(
        "merged {} pages into {} elements",
        pages.len(),
        structure.len()
    );
    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Span};
    use crate::parser::layout::MergedLine;

    fn block(role: Role, page: u32, bbox: BoundingBox, lines: &[&str]) -> MergedBlock {
        let line_height = bbox.height() / lines.len().max(1) as f32;
        let merged: Vec<MergedLine> = lines
            .iter()
            .enumerate()
            .map(|(i, t)| MergedLine {
                text: t.to_string(),
                bbox: BoundingBox::new(
                    bbox.x0,
                    bbox.y0 + i as f32 * line_height,
                    bbox.x1,
                    bbox.y0 + (i + 1) as f32 * line_height,
                ),
                fonts: vec![],
            })
            .collect();
        let spans = merged
            .iter()
            .map(|l| Span::new(l.text.clone(), l.bbox).with_font_weight(400.0))
            .collect();
        MergedBlock {
            lines: merged,
            bbox,
            role,
            page,
            html: None,
            trusted: None,
            spans,
        }
    }

    #[test]
    fn test_join_cjk_without_space() {
        assert_eq!(join_lines("中文", "句子", Role::Text), "中文句子");
    }

    #[test]
    fn test_join_hyphenated_word() {
        assert_eq!(join_lines("recon-", "struction", Role::Text), "reconstruction");
        assert_eq!(join_lines("well—", "known", Role::Text), "wellknown");
    }

    #[test]
    fn test_join_heading_and_table() {
        assert_eq!(join_lines("Chapter One ", " Intro", Role::DocTitle), "Chapter One Intro");
        assert_eq!(join_lines("A1.", "B2", Role::Table), "A1.\n\nB2");
        assert_eq!(join_lines("end.", "Next", Role::Text), "end. Next");
    }

    #[test]
    fn test_sentence_end_and_enumeration() {
        assert!(ends_sentence("这是结尾。"));
        assert!(ends_sentence("done! "));
        assert!(!ends_sentence("continues,"));
        assert!(starts_enumeration("①第一项"));
        assert!(starts_enumeration("(2) second"));
        assert!(!starts_enumeration("plain"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("C# and \\# ok"), "C\\# and \\# ok");
        assert_eq!(escape_markdown(&escape_markdown("#tag")), "\\#tag");
    }

    #[test]
    fn test_continuation_across_pages_is_merged() {
        let options = ReconstructOptions::default();
        let pages = vec![
            vec![block(Role::Text, 0, BoundingBox::new(50.0, 700.0, 500.0, 740.0), &["一段没有结束的", "文字继续"])],
            vec![block(Role::Text, 1, BoundingBox::new(50.0, 60.0, 500.0, 80.0), &["到下一页结束。"])],
        ];
        let s = merge_blocks(&pages, &options);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].text, "一段没有结束的文字继续到下一页结束。");
        assert_eq!(s[0].line_boxes().len(), 3);
    }

    #[test]
    fn test_sentence_end_starts_new_element() {
        let options = ReconstructOptions::default();
        let pages = vec![
            vec![block(Role::Text, 0, BoundingBox::new(50.0, 700.0, 500.0, 720.0), &["第一句。"])],
            vec![block(Role::Text, 1, BoundingBox::new(50.0, 60.0, 500.0, 80.0), &["第二句。"])],
        ];
        let s = merge_blocks(&pages, &options);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_blocks_below_on_same_page_stay_apart() {
        let options = ReconstructOptions::default();
        let pages = vec![vec![
            block(Role::Text, 0, BoundingBox::new(50.0, 100.0, 500.0, 120.0), &["first"]),
            block(Role::Text, 0, BoundingBox::new(50.0, 140.0, 500.0, 160.0), &["second"]),
        ]];
        assert_eq!(merge_blocks(&pages, &options).len(), 2);
    }

    #[test]
    fn test_non_paragraph_roles() {
        let options = ReconstructOptions::default();
        let mut table = block(Role::Table, 0, BoundingBox::new(0.0, 0.0, 100.0, 100.0), &["A.", "B."]);
        table.html = Some("<table></table>".into());
        table.trusted = Some(true);
        let figure = block(Role::Figure, 0, BoundingBox::new(0.0, 100.0, 100.0, 200.0), &["noise"]);
        let title = block(Role::DocTitle, 0, BoundingBox::new(0.0, 200.0, 100.0, 220.0), &["# Title"]);
        let s = merge_blocks(&[vec![table.clone(), figure, title]], &options);
        assert_eq!(s[0].text, "<table></table>");
        assert!(s[0].table().unwrap().trusted);
        assert_eq!(s[1].text, "");
        assert_eq!(s[2].text, "# Title");

        let plain = merge_blocks(&[vec![table]], &options.clone().without_tables());
        assert_eq!(plain[0].text, "A.\n\nB.");
    }
}
