//! Document language and kind detection.
//!
//! The heading state machine needs a document-type hint and a language.
//! Callers may supply both; otherwise they are guessed from the text of
//! the first pages.

use crate::model::Page;
use crate::text::count_cjk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of leading pages inspected by [`classify`].
const SAMPLE_PAGES: usize = 5;

/// Section headers of a drug package insert.
const DRUG_MARKERS: [&str; 6] = ["【药品名称】", "【成份】", "【性状】", "【适应症】", "【规格】", "【用法用量】"];

static GUIDELINE_CUES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^([［【\[][摘提]要[】］\]]\s*|摘要：|摘要目的：)",
        r"(通讯作者[;:：]|通信作者[;:：]|通讯作者邮箱[;:：]|通信作者单位[;:：])",
        r"基金项目",
        r"文献标识",
        r"中[国图]分类号",
        r"文章编号",
        r"专家共识|指南",
        r"(DOI[;:：]|doi[;:：]|Doi[;:：])",
        r"[【\[]?\s*(Abstract|ABSTRACT)\s*(OBJECTIVE|Objective)?\s*[】\]:：；]",
        r"([［【\[]关键词[】］\]]|关键词：)",
        r"([［【\[]\s*Key\s*words\s*[】］\]]|Key\s*words[:;：])",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Dominant language of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Chinese,
    English,
    /// Neither; typically a scan with broken text extraction.
    Garbage,
}

/// Kind of document, used to adjust the heading relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Book,
    DrugInstruction,
    Guideline,
    Unknown,
}

impl DocumentKind {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Book => "book",
            DocumentKind::DrugInstruction => "drug-instruction",
            DocumentKind::Guideline => "guideline",
            DocumentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "book" => Ok(DocumentKind::Book),
            "drug-instruction" | "drug" => Ok(DocumentKind::DrugInstruction),
            "guideline" => Ok(DocumentKind::Guideline),
            "unknown" => Ok(DocumentKind::Unknown),
            other => Err(crate::Error::Other(format!("unknown document kind: {}", other))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Language::Chinese => "chinese",
            Language::English => "english",
            Language::Garbage => "garbage",
        };
        f.write_str(label)
    }
}

/// Detected language and kind of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub language: Language,
    pub kind: DocumentKind,
}

impl fmt::Display for DocumentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.language)
    }
}

/// Guess the language of `text`.
///
/// Empty text is assumed to be a scanned Chinese book.
pub fn detect_language(text: &str) -> Language {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return Language::Chinese;
    }
    let ascii_letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if ascii_letters as f64 / total as f64 > 0.9 {
        Language::English
    } else if count_cjk(text) > 10 {
        Language::Chinese
    } else {
        Language::Garbage
    }
}

/// Guess the kind of document from its text.
pub fn detect_kind(text: &str) -> DocumentKind {
    if text.trim().is_empty() {
        return DocumentKind::Unknown;
    }
    if DRUG_MARKERS.iter().filter(|m| text.contains(*m)).count() >= 3 {
        return DocumentKind::DrugInstruction;
    }
    if GUIDELINE_CUES.iter().filter(|re| re.is_match(text)).count() >= 2 {
        return DocumentKind::Guideline;
    }
    DocumentKind::Book
}

/// Detect language and kind from the first pages of a document.
///
/// # Arguments
/// * `pages` - Pages in reading order
///
/// # Example
/// ```
/// use unflat::detect::{classify, DocumentKind, Language};
///
/// let profile = classify(&[]);
/// assert_eq!(profile.language, Language::Chinese);
/// assert_eq!(profile.kind, DocumentKind::Unknown);
/// ```
pub fn classify(pages: &[Page]) -> DocumentProfile {
    let text = pages
        .iter()
        .take(SAMPLE_PAGES)
        .map(Page::plain_text)
        .collect::<Vec<_>>()
        .join("\n");
    let profile = DocumentProfile {
        language: detect_language(&text),
        kind: detect_kind(&text),
    };
    log::info!("detected document profile: {}", profile);
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(""), Language::Chinese);
        assert_eq!(detect_language("The quick brown fox jumps over the lazy dog"), Language::English);
        assert_eq!(detect_language("糖尿病是一组以高血糖为特征的代谢性疾病。"), Language::Chinese);
        assert_eq!(detect_language("12 34 ## ?? 56"), Language::Garbage);
    }

    #[test]
    fn test_detect_drug_instruction() {
        let text = "阿莫西林胶囊说明书\n【药品名称】\n通用名称\n【成份】\n阿莫西林\n【性状】\n胶囊";
        assert_eq!(detect_kind(text), DocumentKind::DrugInstruction);
    }

    #[test]
    fn test_detect_guideline() {
        let text = "2型糖尿病防治指南\n【摘要】本文介绍\n关键词：糖尿病；指南";
        assert_eq!(detect_kind(text), DocumentKind::Guideline);
    }

    #[test]
    fn test_detect_book() {
        assert_eq!(detect_kind("第一章 绪论\n第一节 概述"), DocumentKind::Book);
        assert_eq!(detect_kind("   "), DocumentKind::Unknown);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("drug_instruction".parse::<DocumentKind>().unwrap(), DocumentKind::DrugInstruction);
        assert_eq!("Guideline".parse::<DocumentKind>().unwrap(), DocumentKind::Guideline);
        assert!("novel".parse::<DocumentKind>().is_err());
    }
}
