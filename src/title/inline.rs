//! Split a heading fused with its first paragraph.
//!
//! Upstream segmentation sometimes returns `1.2 诊断：糖尿病的诊断分为...`
//! as a single block. The extractor keeps the leading heading fragment as
//! the element text and moves the remainder into [`Element::inline_body`].

use crate::model::Element;
use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns whose match is certainly a heading; the body drops the prefix.
const CERTAIN: [usize; 6] = [0, 1, 2, 3, 4, 7];

/// Pattern whose match carries one trailing delimiter that is not part of
/// the heading.
const TRAILING_DELIMITER: usize = 3;

static INLINE_TITLES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let outline = r"^\d+(\s*[\.﹒．]\s*\d+){1,5}\s*";
    let words = r"[\d\x{4e00}-\x{9fff}a-zA-Z\s\(\)αβ（）ⅡⅢⅣⅤⅥⅠ/、，\.,~‑\-]";
    [
        r"^[\[【][\x{4e00}-\x{9fff}、]{1,20}[】\]]".to_string(),
        format!(r"{outline}{words}{{1,30}}[:：;；]"),
        format!(r"{outline}{words}{{1,50}}[\(（][A-Za-z,‑\-\s]+[）\)]"),
        format!(r"{outline}[\d\x{{4e00}}-\x{{9fff}}a-zA-Z\(\)αβⅡⅢⅣⅤⅥⅠ（）/、~\-]{{2,30}}\s"),
        format!(r"{outline}{words}{{1,50}}[\(（]"),
        format!(r"{outline}[\x{{4e00}}-\x{{9fff}}a-zA-Z\(\)αβⅡⅢⅣⅤⅥⅠ（）/、~\-]{{1,30}}[\(（]图\d+\-\d+[）\)]"),
        format!(r"{outline}[\x{{4e00}}-\x{{9fff}}a-zA-Z\(\)αβ（）/、~\-\s]{{1,30}}[①②③④⑤]"),
        format!(r"{outline}.{{10}}\]"),
        r"^\d+\s*[\x{4e00}-\x{9fff}a-zA-Z，,\(\)\.\-‑（）/、~\s]{3,30}[:：;；]".to_string(),
        r"^\d+\s*[\x{4e00}-\x{9fff}a-zA-Z\(\)\.\-‑（）/、~]{3,30}\s".to_string(),
        r"^[^。！？!?,，]{3,30}[:：;；]".to_string(),
        r"^[^。！？!?,，]{1,30}[\(（][A-Za-z,\s\-]+[）\)]".to_string(),
        r"^[^。！？!?,，\s][\x{4e00}-\x{9fff}a-zA-Z\(\)（）/、~\-]{3,30}\s".to_string(),
        r"^[^。！？!?,，]{1,30}[\(（]图\d+\-\d+[）\)]".to_string(),
        r"^[\x{4e00}-\x{9fff}a-zA-Z、,\(\)（）\s\.\d，]{1,30}[。?？！①②③④⑤]".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Heading and body parts of a fused text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSplit {
    pub heading: String,
    pub body: String,
}

/// Find a leading heading fragment in `text`.
///
/// Returns `None` when no pattern matches or the match covers the whole text.
pub fn split_inline_title(text: &str) -> Option<InlineSplit> {
    let content = text.trim();
    for (i, re) in INLINE_TITLES.iter().enumerate() {
        let Some(found) = re.find(content) else {
            continue;
        };
        if found.end() == content.len() {
            return None;
        }
        let body = if CERTAIN.contains(&i) {
            content[found.end()..].trim_start().to_string()
        } else {
            content.to_string()
        };
        let mut heading = found.as_str();
        if i == TRAILING_DELIMITER {
            if let Some((idx, _)) = heading.char_indices().last() {
                heading = &heading[..idx];
            }
        }
        return Some(InlineSplit {
            heading: heading.trim_end().to_string(),
            body,
        });
    }
    None
}

/// Apply [`split_inline_title`] to an element in place.
///
/// Returns `true` when the element was split.
pub fn extract(element: &mut Element) -> bool {
    match split_inline_title(&element.text) {
        Some(split) => {
            log::debug!("split inline title {:?} from element {}", split.heading, element.global_index());
            element.text = split.heading;
            element.inline_body = Some(split.body);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Role};

    #[test]
    fn test_bracket_header_split() {
        let split = split_inline_title("【用法用量】口服，一次1片。").unwrap();
        assert_eq!(split.heading, "【用法用量】");
        assert_eq!(split.body, "口服，一次1片。");
    }

    #[test]
    fn test_outline_with_colon() {
        let split = split_inline_title("1.2 诊断：糖尿病的诊断分为很多类型。").unwrap();
        assert_eq!(split.heading, "1.2 诊断：");
        assert_eq!(split.body, "糖尿病的诊断分为很多类型。");
    }

    #[test]
    fn test_outline_with_space_drops_delimiter() {
        let split = split_inline_title("1.3 治疗原则 控制血糖并预防并发症的发生。").unwrap();
        assert_eq!(split.heading, "1.3 治疗原则");
        assert_eq!(split.body, "控制血糖并预防并发症的发生。");
    }

    #[test]
    fn test_uncertain_pattern_keeps_full_body() {
        let text = "诊断标准：空腹血糖大于等于7.0毫摩尔每升。";
        let split = split_inline_title(text).unwrap();
        assert_eq!(split.heading, "诊断标准：");
        assert_eq!(split.body, text);
    }

    #[test]
    fn test_whole_match_unchanged() {
        assert!(split_inline_title("【禁忌】").is_none());
        assert!(split_inline_title("没有任何标点的一段文字但是非常长并且没有任何结束").is_none());
    }

    #[test]
    fn test_extract_element() {
        let mut el = Element::new(
            Role::Text,
            0,
            0,
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            "【不良反应】偶见皮疹。",
        );
        assert!(extract(&mut el));
        assert_eq!(el.text, "【不良反应】");
        assert_eq!(el.inline_body.as_deref(), Some("偶见皮疹。"));
    }
}
