//! Slot-local sequence numbers (`第三章` is 3, `（二）` is 2, `1.2.4` is 4).

use super::patterns::{outline_prefix, Slot};
use once_cell::sync::Lazy;
use regex::Regex;

static BOOK_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第([○\-一二三四五六七八九十\d]*)(章|篇|部分|节)").unwrap());
static HALF_BOOK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(上|下)篇").unwrap());
static CHINESE_ORDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?\s*([一二三四五六七八九十][一二三四五六七八九十]?[一二三四五六七八九十]?)\s*\)?").unwrap()
});
static DIGIT_ORDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(?\s*(\d+)\s*\)?").unwrap());

fn digit(c: char) -> Option<u32> {
    "零一二三四五六七八九".chars().position(|d| d == c).map(|p| p as u32)
}

/// Value of a Chinese numeral between 零 and 一百.
///
/// Only the canonical spellings are accepted: `十一` but not `一十一`.
pub fn chinese_numeral(text: &str) -> Option<u32> {
    let chars: Vec<char> = text.chars().collect();
    match chars.as_slice() {
        ['一', '百'] => Some(100),
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', unit] => digit(*unit).filter(|u| *u > 0).map(|u| 10 + u),
        [tens, '十'] => digit(*tens).filter(|t| *t > 1).map(|t| t * 10),
        [tens, '十', unit] => {
            let t = digit(*tens).filter(|t| *t > 1)?;
            let u = digit(*unit).filter(|u| *u > 0)?;
            Some(t * 10 + u)
        }
        _ => None,
    }
}

/// Number of a `第N章` / `第N篇` / `第N部分` / `第N节` marker, or 0/1 for
/// `上篇` / `下篇`.
pub fn book_index(text: &str) -> Option<u32> {
    if let Some(caps) = BOOK_INDEX.captures(text) {
        let number = &caps[1];
        return number.parse().ok().or_else(|| chinese_numeral(number));
    }
    HALF_BOOK
        .captures(text)
        .map(|caps| if &caps[1] == "上" { 0 } else { 1 })
}

/// Sequence number of a heading within its slot.
pub fn title_order(text: &str, slot: Slot) -> Option<u32> {
    match slot {
        Slot::PART | Slot::CHAPTER | Slot::SECTION => book_index(text),
        Slot::CHINESE_ENUM | Slot::PAREN_CHINESE => CHINESE_ORDER
            .captures(text)
            .and_then(|caps| chinese_numeral(&caps[1])),
        Slot::NUMERAL | Slot::PAREN_NUMERAL | Slot::HALF_PAREN_NUMERAL => {
            DIGIT_ORDER.captures(text).and_then(|caps| caps[1].parse().ok())
        }
        s if s.is_outline() => outline_prefix(text, usize::MAX).and_then(|c| c.last().copied()),
        _ => None,
    }
}

/// Whether `next` continues the numbering of `previous` in the same slot.
pub fn is_next_in_sequence(previous: &str, next: &str, slot: Slot) -> bool {
    match (title_order(previous, slot), title_order(next, slot)) {
        (Some(p), Some(n)) => p.checked_add(1) == Some(n),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chinese_numeral() {
        assert_eq!(chinese_numeral("零"), Some(0));
        assert_eq!(chinese_numeral("三"), Some(3));
        assert_eq!(chinese_numeral("十"), Some(10));
        assert_eq!(chinese_numeral("十二"), Some(12));
        assert_eq!(chinese_numeral("二十"), Some(20));
        assert_eq!(chinese_numeral("九十九"), Some(99));
        assert_eq!(chinese_numeral("一百"), Some(100));
        assert_eq!(chinese_numeral("一十"), None);
        assert_eq!(chinese_numeral("十零"), None);
        assert_eq!(chinese_numeral(""), None);
    }

    #[test]
    fn test_book_index() {
        assert_eq!(book_index("第三章 糖尿病"), Some(3));
        assert_eq!(book_index("第12章"), Some(12));
        assert_eq!(book_index("第二节 病因"), Some(2));
        assert_eq!(book_index("下篇 临床"), Some(1));
        assert_eq!(book_index("绪论"), None);
    }

    #[test]
    fn test_title_order_per_slot() {
        assert_eq!(title_order("（三）诊断", Slot::PAREN_CHINESE), Some(3));
        assert_eq!(title_order("二十一、附录", Slot::CHINESE_ENUM), Some(21));
        assert_eq!(title_order("(12) 随访", Slot::PAREN_NUMERAL), Some(12));
        assert_eq!(title_order("1.2.4 范围", Slot::OUTLINE_3), Some(4));
        assert_eq!(title_order("参考文献", Slot::LOWEST), None);
    }

    #[test]
    fn test_sequence() {
        assert!(is_next_in_sequence("第一章", "第二章", Slot::CHAPTER));
        assert!(is_next_in_sequence("1.1 a", "1.2 b", Slot::OUTLINE_2));
        assert!(!is_next_in_sequence("1.1 a", "1.3 b", Slot::OUTLINE_2));
    }

    #[test]
    fn test_sequence_at_numeric_limit() {
        assert_eq!(book_index("第4294967295章 甲"), Some(u32::MAX));
        assert!(!is_next_in_sequence("第4294967295章 甲", "第二章 丙", Slot::CHAPTER));
        assert!(!is_next_in_sequence("1.4294967295 甲", "1.2 丙", Slot::OUTLINE_2));
        assert!(!is_next_in_sequence("第4294967295章", "第0章", Slot::CHAPTER));
    }
}
