//! Heading-pattern taxonomy.
//!
//! Every heading convention the classifier understands is a [`Slot`]. The
//! ordered slot matchers are plain data so each convention can be tested
//! on its own.

use crate::model::Role;
use crate::text::contains_cjk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a heading convention in the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(u8);

impl Slot {
    /// `第一篇`, `上篇`, `第二部分`, `第三讲`
    pub const PART: Slot = Slot(0);
    /// `第一章`
    pub const CHAPTER: Slot = Slot(1);
    /// `第一节`
    pub const SECTION: Slot = Slot(2);
    /// `一、`
    pub const CHINESE_ENUM: Slot = Slot(3);
    /// `【用法用量】`
    pub const BRACKET: Slot = Slot(4);
    /// `（一）`
    pub const PAREN_CHINESE: Slot = Slot(5);
    /// `1.` or `1 标题`
    pub const NUMERAL: Slot = Slot(6);
    /// `1.1`
    pub const OUTLINE_2: Slot = Slot(7);
    /// `1.1.1`
    pub const OUTLINE_3: Slot = Slot(8);
    /// `1.1.1.1`
    pub const OUTLINE_4: Slot = Slot(9);
    /// `1.1.1.1.1` and deeper
    pub const OUTLINE_5: Slot = Slot(10);
    /// `(1)`
    pub const PAREN_NUMERAL: Slot = Slot(11);
    /// `1)`
    pub const HALF_PAREN_NUMERAL: Slot = Slot(12);
    /// `①`, `a.`
    pub const CIRCLED: Slot = Slot(13);
    /// Tagged `doc_title` but matched by no pattern.
    pub const UNMATCHED_DOC: Slot = Slot(14);
    /// Tagged `text_title` but matched by no pattern.
    pub const UNMATCHED_TEXT: Slot = Slot(15);
    /// Cue phrases such as `参考文献` or `思考题`.
    pub const LOWEST: Slot = Slot(16);

    /// Number of slots in the taxonomy.
    pub const COUNT: usize = 17;

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Slot for a raw index, if in range.
    pub fn from_index(index: usize) -> Option<Slot> {
        (index < Self::COUNT).then_some(Slot(index as u8))
    }

    /// All slots in taxonomy order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..Self::COUNT as u8).map(Slot)
    }

    /// Whether the slot is one of the dotted outline conventions.
    pub fn is_outline(self) -> bool {
        (7..=10).contains(&self.0)
    }

    /// Whether the slot is one of the two unmatched-heading sentinels.
    pub fn is_unmatched(self) -> bool {
        self == Self::UNMATCHED_DOC || self == Self::UNMATCHED_TEXT
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "part",
            1 => "chapter",
            2 => "section",
            3 => "chinese_enum",
            4 => "bracket",
            5 => "paren_chinese",
            6 => "numeral",
            7 => "outline_2",
            8 => "outline_3",
            9 => "outline_4",
            10 => "outline_5",
            11 => "paren_numeral",
            12 => "half_paren_numeral",
            13 => "circled",
            14 => "unmatched_doc",
            15 => "unmatched_text",
            _ => "lowest",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a slot recognizes its text.
#[derive(Debug)]
enum Matcher {
    Pattern(Regex),
    /// Dotted outline with an exact number of `.N` groups, or at least
    /// `groups` when `open` is set.
    Outline { groups: usize, open: bool },
}

impl Matcher {
    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Outline { groups, open } => match outline_prefix(text, 3) {
                Some(found) if found.len() > 1 => {
                    let n = found.len() - 1;
                    if *open {
                        n >= *groups
                    } else {
                        n == *groups
                    }
                }
                _ => false,
            },
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

const CIRCLED_MARKS: &str = "①②③④⑤⑥⑦⑧⑨⑩ⅡⅢⅣⅤⅥⅦⅧⅨⅩⅪⅫⅰⅱⅲⅳⅴⅵⅶⅷⅸ❶❷❸❹❺❻❼❽❾❿⓫⓬⓭⓮⓯⓰⓱⓲⓳⓴";

/// Slot matchers in priority order.
static TAXONOMY: Lazy<Vec<(Slot, Matcher)>> = Lazy::new(|| {
    vec![
        (
            Slot::PART,
            Matcher::Pattern(re(concat!(
                r"^(第|上|下)((\d+)|(\\math(rm|bf)?\s?(I{0,3})|N|Ⅱ|Ⅲ|Ⅳ|Ⅴ|Ⅵ|Ⅶ)",
                r"|([一二三四五六七八九十][○一二三四五六七八九十]?[一二三四五六七八九十]?))?(篇|部分|讲).{0,50}$"
            ))),
        ),
        (
            Slot::CHAPTER,
            Matcher::Pattern(re(concat!(
                r"^([^\x{4e00}-\x{9fff}]{0,4}第((\d+)|([一二三四五六七八九十]",
                r"[○一二三四五六七八九十]?[一二三四五六七八九十]?))?章[^。]{0,50})$"
            ))),
        ),
        (
            Slot::SECTION,
            Matcher::Pattern(re(concat!(
                r"^([^\x{4e00}-\x{9fff}]{0,4}第((\d+)|([一二三四五六七八九十][○一二三四五六七八九十]?",
                r"[一二三四五六七八九十]?))?[爷节][^。]{0,70})$"
            ))),
        ),
        (
            Slot::CHINESE_ENUM,
            Matcher::Pattern(re(
                r"^[一二三四五六÷七八九十][○\-一二三四五六七八九十]?[○\-一二三四五六七八九十]?(([、，。].+)|(.{0,50})$)",
            )),
        ),
        (
            Slot::BRACKET,
            Matcher::Pattern(re(r"^[\[【][\x{4e00}-\x{9fff}a-zA-Z、~\d\-]{1,20}[\]】]")),
        ),
        (
            Slot::PAREN_CHINESE,
            Matcher::Pattern(re(
                r"^[\(（][\-一二三四五六七八九十][○一二三四五六七八九十]?[○一二三四五六七八九十]?[）\)].+",
            )),
        ),
        (
            Slot::NUMERAL,
            Matcher::Pattern(re(concat!(
                r"^((\d{1,3}\s*[\.，。﹒、．,\x{4e00}-\x{9fff}a-zA-Z]\s*\D.*)",
                r#"|(\d{1,3}\s*[\x{4e00}-\x{9fff}a-zA-Z\s"“《]+))"#
            ))),
        ),
        (Slot::OUTLINE_2, Matcher::Outline { groups: 1, open: false }),
        (Slot::OUTLINE_3, Matcher::Outline { groups: 2, open: false }),
        (Slot::OUTLINE_4, Matcher::Outline { groups: 3, open: false }),
        (Slot::OUTLINE_5, Matcher::Outline { groups: 4, open: true }),
        (Slot::PAREN_NUMERAL, Matcher::Pattern(re(r"^[\(（]\s*\d\d?\d?\s*[）\)].+"))),
        (Slot::HALF_PAREN_NUMERAL, Matcher::Pattern(re(r"^[1-9][0-9]?\s*\d?[）\)].+"))),
        (
            Slot::CIRCLED,
            Matcher::Pattern(re(&format!(
                r"^([{marks}].+|[abcdef]\s*[,\.、][\x{{4e00}}-\x{{9fff}}]+|[{marks}ⅹ]+[\x{{4e00}}-\x{{9fff}}a-zA-Z\s]+)",
                marks = CIRCLED_MARKS
            ))),
        ),
    ]
});

/// Stricter "looks like a short heading" validators.
static SHORT_HEADING: Lazy<Vec<Regex>> = Lazy::new(|| {
    let numeral = r"[○\-一二三四五六七八九十]";
    vec![
        re(&format!(
            r"^(第|上|下)((\d+)|([\-一二三四五六∴七八九十]{n}?{n}?))?(篇|部分|讲)[^。]{{0,30}}$",
            n = numeral
        )),
        re(&format!(
            r"^(第((\d+)|([\-一二三四五六∴七八九十]{n}?{n}?))章[^。]{{0,30}})$",
            n = numeral
        )),
        re(&format!(
            r"^(第((\d+)|([\-一二三四五六∴七八九十]{n}?{n}?))节[^。]{{0,30}})$",
            n = numeral
        )),
        re(&format!(
            r"^([一二三四五六÷七八九十]{n}?{n}?[、，]?|-[,、。\.])[^。；]{{1,30}}$",
            n = numeral
        )),
        re(concat!(
            r"^(([〔【][\x{4e00}-\x{9fff}a-zA-Z、~\d\-\(\)]{1,20}[】〕])|",
            r"(\[[\x{4e00}-\x{9fff}a-zA-Z、~\-\(\)]{1,20}\]))$"
        )),
        re(&format!(
            r"^[\(（][\-一二三四五∓六七八九十]{n}?{n}?[）\)][^。；]{{1,30}}$",
            n = numeral
        )),
        re(r"^\d{1,3}\s?[\.，﹒、．,\x{4e00}-\x{9fff}a-zA-Z][^。]{1,30}$"),
        re(r"^[\(（][1-9][0-9]?[）\)][^。]{1,30}$"),
        re(r"^[1-9][0-9]?[）\)][^。]{1,30}$"),
        re(&format!(r"^[{}][^。]{{1,50}}$", CIRCLED_MARKS)),
    ]
});

/// Texts that look like a heading marker but are body text
/// (`3年`, `二氧化碳`, `[1] reference`, ...).
static NOT_TITLE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(concat!(
            r"^\d+\s?(\.\d+)*(年|世纪|月|型|期|种|个|岁|根|周|次|条|倍|度|毫升|克|",
            r"毫克|千|万|号|亿|斤|点|分钟|株|项|点|名|组|余位|已经给出|对([^于]|$)).*"
        )),
        re(r"^\d+\s?(\.\d+)*(mm|％|cm|m|nm|km|kg|μ|g|mg|倍|元|s|min|h|Hz|%|kb|∼|=|点|°).*"),
        re(r"^20\d\d版.*"),
        re(r"^199\d.*"),
        re(r"^[12]型糖尿病.*"),
        re(r"[\[【]\s*\**(中[国图]分类号|[Dd][Oo][Ii]|Abstract|ABSTRACT|关键词|Keywords|KEYWORDS|摘要|Summary|编者按)\**\s*[\]】]"),
        re(concat!(
            r"^一(切|批|战|线|些|群|点|般|型|部|条|氧|个|种|样|直|天|幅|次|定|边",
            r"|起|战|来|担|旦|路|期|汽|锥状叶|是|侧|致|体化|提到|项|方面|开始|同|系列).*"
        )),
        re(r"^-\d.*"),
        re(r"^\d+(\.\d+)?(元|年|天|月|小时|\-|\+|\*|➗|÷).*"),
        re(r"^\d+~\d+个.+"),
        re(r"^四(肢|肽|酸|分体|聚体|氯化碳|氢生物|链|体|联体|面体|线).*"),
        re(concat!(
            r"^三(叉脑|战|线|叉神经|链结构|氧|酸循环|羧酸|烯生育|脂肪酰基甘油|联管|丁基|",
            r"磷酸|酸环|尖杉|脑室|尖学说|角嵴|子养亲汤|七|核苷酸|硅酸镁|唑仑|要|不要|系法模式|体|螺旋|叉神经|酯血症).*"
        )),
        re(r"^二(腹|零|战|线|个|尖瓣|联管|侧|油|氧|战|维码|丁基|棱镜|甲基|乙基|丙基|丁基|胺|巯丙醇|甲双胍|盐酸|硫基|甲苯|型糖尿病).*"),
        re(r"^(十二指肠|六淫|五苓散|十二经脉|二巯基丙醇|一分子|羧酸|一碳单位|五味子|五官科|18-三体综合征|十字|八宝门|五脏|六腑).*"),
        re(r"^[\-一二三四五六七八九十○]+[维件亿万千年月天是级大倍日种类个诊代根多名起位点氟氯株位味步氢胎岁下跟周次度升阶段].*"),
        re(r"^[\-一二三四五六七八九十○]+(聚体|星级|环|疗程|世纪|房室).*"),
        re(r"^\[[abcdefghijk]\].+"),
        re(r"^\[\s?\d+\s?\].+"),
    ]
});

static LOWEST_CUE: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"(要点：|推荐阅读资料|学习目标|病例|要点提示|学习要点|参\s*考\s*文\s*献|参考资料|教学要求|通讯作者|收稿日期|",
        r"教学内容|阅读文献|关键词|微信扫描|【中图分类号】|Summary|【摘要】|\[摘要\]|",
        r"思考题|练习题|分析题|参考书|学生自测题|推荐网站|问题与思考|推荐书目|教学目标|",
        r"内容提示|内容提要|知识点|小贴士|临床病例|二至丸|习题|KEY POINTS)"
    ))
});

/// Markers that open a new numbering run (`第一章`, `一、`, `1.1`, `①`, ...).
static LEVEL_START: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"^(第[一1](篇|部分|讲)[^。]{0,30})"),
        re(r"^(第[一1]章[^。]{0,30})"),
        re(r"^(第[一1]节[^。]{0,30})"),
        re(r"^[\-一][、，].+"),
        re(r"^[\(（][\-一][）\)].+"),
        re(r"^1\s*[\.﹒．]?\s*\D+"),
        re(r"^[\(（]1[）\)].+"),
        re(r"^①.+"),
    ]
});

static EMPTY_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"^(第|上|下)(\d+|[\-一二三四五六七八九十][○\-一二三四五六七八九十]?",
        r"[○\-一二三四五六七八九十]?)?(篇|部分|章|节|讲)[^\x{4e00}-\x{9fff}a-zA-Z]?"
    ))
});

static CHAPTER_MARKER: Lazy<Regex> = Lazy::new(|| {
    re(concat!(
        r"^[^\x{4e00}-\x{9fff}]{0,4}第((\d+)|([\-一二三四五六七八九十][○\-一二三四五六七八九十]?",
        r"[○\-一二三四五六七八九十]?))?章"
    ))
});

static POSITION_MARK: Lazy<Regex> = Lazy::new(|| re(r"<\d+-\d+>"));
static LATIN_RUN: Lazy<Regex> = Lazy::new(|| re(r"[A-Za-z]+"));
static OUTLINE_HEAD: Lazy<Regex> = Lazy::new(|| re(r"^\d{1,3}\s*[\.﹒．]\s*"));
static PART_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"^第[\d一二三四]部分"));

fn is_outline_separator(c: char) -> bool {
    matches!(c, '.' | '﹒' | '．')
}

/// Parse a leading dotted outline such as `1.2.3`.
///
/// Each component may have at most `max_digits` digits. Returns the numeric
/// components, or `None` when the text does not start with a number.
pub(crate) fn outline_prefix(text: &str, max_digits: usize) -> Option<Vec<u32>> {
    fn digits(s: &str, max: usize) -> Option<(u32, &str)> {
        let end = s
            .char_indices()
            .take_while(|(i, c)| c.is_ascii_digit() && *i < max)
            .map(|(i, c)| i + c.len_utf8())
            .last()?;
        Some((s[..end].parse().ok()?, &s[end..]))
    }

    let (first, mut rest) = digits(text, max_digits)?;
    let mut components = vec![first];
    loop {
        let after_space = rest.trim_start();
        let Some(sep) = after_space.chars().next().filter(|c| is_outline_separator(*c)) else {
            break;
        };
        let after_sep = after_space[sep.len_utf8()..].trim_start();
        match digits(after_sep, max_digits) {
            Some((value, tail)) => {
                components.push(value);
                rest = tail;
            }
            None => break,
        }
    }
    Some(components)
}

/// Components of a `1.2` to `1.2.3.4.5.6` outline marker.
pub(crate) fn outline_sign(text: &str) -> Option<Vec<u32>> {
    outline_prefix(text, usize::MAX).filter(|c| (2..=6).contains(&c.len()))
}

/// Strip layout position markers such as `<3-12>`.
pub(crate) fn strip_position_marks(text: &str) -> String {
    POSITION_MARK.replace_all(text, "").into_owned()
}

/// Index (1-based) of the first body-text pattern matching `text`.
pub fn not_title(text: &str) -> Option<usize> {
    let text = text.trim();
    NOT_TITLE.iter().position(|re| re.is_match(text)).map(|i| i + 1)
}

/// Whether `text` passes the stricter short-heading validators.
pub fn looks_like_heading(text: &str) -> bool {
    let text = text.trim();
    SHORT_HEADING.iter().any(|re| re.is_match(text))
}

/// Whether `text` contains a lowest-priority cue phrase.
pub fn is_lowest_cue(text: &str) -> bool {
    LOWEST_CUE.is_match(text)
}

/// Whether `text` opens a numbering run (`第一章`, `一、`, `1.1.1`, `(1)`).
pub fn starts_numbering(text: &str) -> bool {
    if LEVEL_START.iter().any(|re| re.is_match(text)) {
        return true;
    }
    // 1.1 through 1.1.1.1.1
    match outline_prefix(text, usize::MAX) {
        Some(c) => (2..=5).contains(&c.len()) && c.iter().all(|n| *n == 1) && text.starts_with('1'),
        None => false,
    }
}

/// Whether `text` is a Part/Chapter/Section marker with no title text.
pub fn is_empty_chapter(text: &str) -> bool {
    let text = strip_position_marks(text);
    EMPTY_CHAPTER.replace(&text, "").is_empty()
}

/// Whether `text` is a bare "Part N" marker (`第二部分`).
pub(crate) fn is_part_number(text: &str) -> bool {
    PART_NUMBER.is_match(&strip_position_marks(text))
}

/// Chapter title with its `第N章` marker removed, reduced to ideographs and
/// letters for comparison between running headers and headings.
pub fn header_content(text: &str) -> String {
    let stripped = CHAPTER_MARKER.replace(text, "");
    crate::text::normalized_key(stripped.trim())
}

/// Match `text` against the slot taxonomy.
///
/// `role` breaks ties for texts that look like body content and supplies the
/// sentinel slots for role-tagged headings without a recognizable marker.
pub fn classify(text: &str, role: Role) -> Option<Slot> {
    let mut text = strip_position_marks(text.trim());
    text = text.replace("+\\equiv", "十三").replace("\\equiv", "三");

    if !contains_cjk(&text) && text.chars().any(|c| matches!(c, '=' | '√' | '≤')) {
        // equation
        return None;
    }

    let matched = TAXONOMY
        .iter()
        .find(|(_, m)| m.is_match(&text))
        .map(|(slot, _)| *slot);

    match matched {
        Some(slot) if slot == Slot::PART || slot == Slot::CHAPTER => {
            (LATIN_RUN.replace_all(&text, "").chars().count() < 35).then_some(slot)
        }
        Some(slot) if matches!(slot, Slot::CHINESE_ENUM | Slot::BRACKET | Slot::NUMERAL) => {
            if not_title(&text).is_some() {
                unmatched_slot(role)
            } else {
                Some(slot)
            }
        }
        Some(Slot::OUTLINE_2) => {
            if matches!(not_title(&text), Some(2..=4)) {
                return None;
            }
            let unmarked = OUTLINE_HEAD.replace(&text, "");
            if not_title(&unmarked).is_some() {
                Some(Slot::NUMERAL)
            } else {
                Some(Slot::OUTLINE_2)
            }
        }
        Some(slot) => Some(slot),
        None if role.is_heading() && is_lowest_cue(&text) => Some(Slot::LOWEST),
        None => unmatched_slot(role),
    }
}

fn unmatched_slot(role: Role) -> Option<Slot> {
    match role {
        Role::DocTitle => Some(Slot::UNMATCHED_DOC),
        Role::TextTitle => Some(Slot::UNMATCHED_TEXT),
        _ => None,
    }
}
