//! Table and figure caption association.
//!
//! Captions are paired with the tables and figures on the same page by
//! geometry. Once a caption is known, its `表 3-1` / `Figure 2` token is
//! searched for in the surrounding body paragraphs and every mention is
//! recorded as a [`CrossReference`].

mod assignment;

pub use assignment::min_cost_assignment;

use crate::model::{CrossReference, Element, MediaKind, Role, Structure};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static TABLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(TABLE|Table|表)\s?(\d+(?:-\d+)*)").unwrap());
static FIGURE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(FIGURE|Figure|图)\s?(\d+(?:-\d+)*)").unwrap());

impl MediaKind {
    fn media_role(self) -> Role {
        match self {
            MediaKind::Table => Role::Table,
            MediaKind::Figure => Role::Figure,
        }
    }

    fn caption_role(self) -> Role {
        match self {
            MediaKind::Table => Role::TableTitle,
            MediaKind::Figure => Role::FigureTitle,
        }
    }

    fn id_pattern(self) -> &'static Regex {
        match self {
            MediaKind::Table => &TABLE_ID,
            MediaKind::Figure => &FIGURE_ID,
        }
    }
}

fn title_of(el: &Element, kind: MediaKind) -> Option<&str> {
    match kind {
        MediaKind::Table => el.table().and_then(|t| t.title.as_deref()),
        MediaKind::Figure => el.figure().and_then(|f| f.title.as_deref()),
    }
}

fn set_title(el: &mut Element, kind: MediaKind, title: String) {
    match kind {
        MediaKind::Table => {
            if let Some(table) = el.table_mut() {
                table.title = Some(title);
            }
        }
        MediaKind::Figure => {
            if let Some(figure) = el.figure_mut() {
                figure.title = Some(title);
            }
        }
    }
}

/// Distance from the bottom centre of a table or figure to the centre of a
/// caption.
fn caption_distance(media: &Element, caption: &Element) -> f64 {
    let (mx, my) = media.bbox.bottom_center();
    let (cx, cy) = caption.bbox.center();
    f64::from(mx - cx).hypot(f64::from(my - cy))
}

/// Pair every table and figure with a caption on its page.
///
/// A page with exactly one medium and one caption pairs them directly;
/// otherwise the pairing minimizes the total caption distance. Leftover
/// captions stay unattached.
pub fn match_captions(structure: &mut Structure) {
    for kind in [MediaKind::Table, MediaKind::Figure] {
        let mut by_page: BTreeMap<u32, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for (i, el) in structure.iter().enumerate() {
            if el.role == kind.media_role() {
                by_page.entry(el.page_id).or_default().0.push(i);
            } else if el.role == kind.caption_role() {
                by_page.entry(el.page_id).or_default().1.push(i);
            }
        }

        for (page, (media, captions)) in by_page {
            if media.is_empty() || captions.is_empty() {
                continue;
            }
            let pairs = if media.len() == 1 && captions.len() == 1 {
                vec![(0, 0)]
            } else {
                let cost: Vec<Vec<f64>> = media
                    .iter()
                    .map(|m| {
                        captions
                            .iter()
                            .map(|c| caption_distance(&structure[*m], &structure[*c]))
                            .collect()
                    })
                    .collect();
                min_cost_assignment(&cost)
            };

            for (m, c) in pairs {
                let title = structure[captions[c]].text.clone();
                log::debug!("page {}: {:?} {} captioned {:?}", page, kind, media[m], title);
                if let Some(el) = structure.get_mut(media[m]) {
                    set_title(el, kind, title);
                }
            }
        }
    }
}

/// Body paragraphs that may mention a caption token.
fn is_body_paragraph(el: &Element) -> bool {
    el.role == Role::Text && !el.is_heading()
}

/// Record mentions of captioned tables and figures in nearby paragraphs.
///
/// Paragraphs up to one page before or after the medium are searched; the
/// offset is the character position of the first occurrence.
pub fn link_references(structure: &mut Structure) {
    let mut links: Vec<(usize, CrossReference)> = Vec::new();

    for (eid, el) in structure.iter().enumerate() {
        for kind in [MediaKind::Table, MediaKind::Figure] {
            if el.role != kind.media_role() {
                continue;
            }
            let Some(title) = title_of(el, kind) else {
                continue;
            };
            let Some(token) = kind.id_pattern().find(title).map(|m| m.as_str()) else {
                log::warn!("caption {:?} carries no {:?} identifier", title, kind);
                continue;
            };
            let id = match kind {
                MediaKind::Table => el.table().map_or_else(|| el.id(), |t| t.table_id.clone()),
                MediaKind::Figure => el.id(),
            };

            let page = el.page_id;
            let backward = structure.as_slice()[..eid]
                .iter()
                .enumerate()
                .rev()
                .take_while(|(_, other)| other.page_id + 1 >= page);
            let forward = structure.as_slice()[eid..]
                .iter()
                .enumerate()
                .map(|(i, other)| (i + eid, other))
                .take_while(|(_, other)| other.page_id <= page + 1);

            for (other_idx, other) in backward.chain(forward) {
                if !is_body_paragraph(other) {
                    continue;
                }
                if let Some(byte) = other.text.find(token) {
                    let offset = other.text[..byte].chars().count();
                    links.push((
                        other_idx,
                        CrossReference {
                            kind,
                            id: id.clone(),
                            offset,
                        },
                    ));
                }
            }
        }
    }

    for (idx, reference) in links {
        if let Some(el) = structure.get_mut(idx) {
            el.references.push(reference);
        }
    }
}

/// Attach captions, then link in-text mentions.
pub fn associate(structure: &mut Structure) {
    match_captions(structure);
    link_references(structure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;

    fn el(role: Role, page: u32, order: u32, bbox: [f32; 4], text: &str) -> Element {
        Element::new(role, page, order, BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]), text)
    }

    #[test]
    fn test_single_caption_direct() {
        let mut s: Structure = vec![
            el(Role::TableTitle, 0, 0, [0.0, 0.0, 100.0, 10.0], "表1 患者基线特征"),
            el(Role::Table, 0, 1, [0.0, 20.0, 100.0, 80.0], "<table></table>"),
        ]
        .into_iter()
        .collect();
        match_captions(&mut s);
        assert_eq!(s[1].table().unwrap().title.as_deref(), Some("表1 患者基线特征"));
    }

    #[test]
    fn test_multiple_captions_by_distance() {
        let mut s: Structure = vec![
            el(Role::Table, 0, 0, [0.0, 0.0, 100.0, 50.0], "<table>a</table>"),
            el(Role::TableTitle, 0, 1, [0.0, 52.0, 100.0, 60.0], "表1 A"),
            el(Role::Table, 0, 2, [0.0, 100.0, 100.0, 150.0], "<table>b</table>"),
            el(Role::TableTitle, 0, 3, [0.0, 152.0, 100.0, 160.0], "表2 B"),
        ]
        .into_iter()
        .collect();
        match_captions(&mut s);
        assert_eq!(s[0].table().unwrap().title.as_deref(), Some("表1 A"));
        assert_eq!(s[2].table().unwrap().title.as_deref(), Some("表2 B"));
    }

    #[test]
    fn test_table_without_caption() {
        let mut s: Structure = vec![
            el(Role::Table, 0, 0, [0.0, 0.0, 100.0, 50.0], "<table></table>"),
            el(Role::TableTitle, 1, 0, [0.0, 52.0, 100.0, 60.0], "表1 A"),
        ]
        .into_iter()
        .collect();
        associate(&mut s);
        assert!(s[0].table().unwrap().title.is_none());
    }

    #[test]
    fn test_figure_caption() {
        let mut s: Structure = vec![
            el(Role::Figure, 2, 0, [0.0, 0.0, 100.0, 50.0], ""),
            el(Role::FigureTitle, 2, 1, [0.0, 52.0, 100.0, 60.0], "图2-1 流程"),
            el(Role::Text, 2, 2, [0.0, 70.0, 100.0, 80.0], "流程见图2-1。"),
        ]
        .into_iter()
        .collect();
        associate(&mut s);
        assert_eq!(s[0].figure().unwrap().title.as_deref(), Some("图2-1 流程"));
        assert_eq!(
            s[2].references,
            vec![CrossReference {
                kind: MediaKind::Figure,
                id: "2-0".to_string(),
                offset: 3,
            }]
        );
    }

    #[test]
    fn test_reference_window() {
        let mut s: Structure = vec![
            el(Role::Text, 0, 0, [0.0, 0.0, 100.0, 10.0], "如表3所示，远处提及。"),
            el(Role::Text, 2, 0, [0.0, 0.0, 100.0, 10.0], "结果如表3所示。"),
            el(Role::TableTitle, 3, 0, [0.0, 0.0, 100.0, 10.0], "表3 结果"),
            el(Role::Table, 3, 1, [0.0, 20.0, 100.0, 80.0], "<table></table>"),
            el(Role::Text, 4, 0, [0.0, 0.0, 100.0, 10.0], "表3显示"),
            el(Role::Text, 5, 0, [0.0, 0.0, 100.0, 10.0], "表3"),
        ]
        .into_iter()
        .collect();
        associate(&mut s);
        assert!(s[0].references.is_empty());
        assert_eq!(s[1].references.len(), 1);
        assert_eq!(s[1].references[0].offset, 3);
        assert_eq!(s[1].references[0].id, "3-1");
        assert_eq!(s[4].references[0].offset, 0);
        assert!(s[5].references.is_empty());
    }
}
