//! Markdown rendering of a reconstructed structure.

use crate::model::{Element, Structure};

fn push_block(output: &mut String, block: &str) {
    let block = block.trim();
    if block.is_empty() {
        return;
    }
    if !output.is_empty() {
        output.push_str("\n\n");
    }
    output.push_str(block);
}

fn render_element(output: &mut String, el: &Element) {
    match el.heading_level() {
        Some(level) => {
            let prefix = "#".repeat(level as usize + 1);
            push_block(output, &format!("{} {}", prefix, el.text.trim()));
            if let Some(body) = &el.inline_body {
                push_block(output, body);
            }
        }
        None => push_block(output, &el.text),
    }
}

/// Render `structure` as Markdown.
///
/// Headings get `level + 1` hashes. Non-informative and metadata elements
/// are skipped; tables are emitted as their HTML.
pub fn to_markdown(structure: &Structure) -> String {
    let mut output = String::new();
    for el in structure.iter().filter(|el| el.informative && el.meta_name.is_none()) {
        render_element(&mut output, el);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Role};

    fn el(role: Role, text: &str, level: i32) -> Element {
        Element::new(role, 0, 0, BoundingBox::new(0.0, 0.0, 1.0, 1.0), text).with_level(level)
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let s: Structure = vec![
            el(Role::DocTitle, "第一章 绪论", 0),
            el(Role::TextTitle, "一、概述", 2),
            el(Role::Text, "正文。", -1),
        ]
        .into_iter()
        .collect();
        assert_eq!(to_markdown(&s), "# 第一章 绪论\n\n### 一、概述\n\n正文。");
    }

    #[test]
    fn test_skips_hidden_and_meta() {
        let mut hidden = el(Role::Text, "merged away", -1);
        hidden.informative = false;
        let s: Structure = vec![
            hidden,
            el(Role::Text, "摘要", -1).with_meta_name("chinese_abstract"),
            el(Role::Header, "running head", -1),
            el(Role::Figure, "", -1),
            el(Role::Text, "body", -1),
        ]
        .into_iter()
        .collect();
        assert_eq!(to_markdown(&s), "body");
    }

    #[test]
    fn test_inline_body_follows_heading() {
        let mut heading = el(Role::TextTitle, "1.2 诊断：", 1);
        heading.inline_body = Some("空腹血糖。".to_string());
        let s: Structure = vec![heading].into_iter().collect();
        assert_eq!(to_markdown(&s), "## 1.2 诊断：\n\n空腹血糖。");
    }
}
