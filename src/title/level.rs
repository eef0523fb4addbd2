//! Heading-depth inference.
//!
//! [`TitleLevelParser::predict`] walks the structure once, left to right.
//! Each element is classified into a [`Slot`]; its depth is then derived
//! from the nearest preceding heading and the slot relations. Later
//! headings may correct the depth of earlier ones when the numbering
//! reveals that a run was misjudged.

use super::inline;
use super::order::is_next_in_sequence;
use super::patterns::{
    self, header_content, is_empty_chapter, is_part_number, looks_like_heading, not_title,
    outline_sign, starts_numbering, strip_position_marks, Slot,
};
use super::relations::{SlotRelations, SlotSet};
use crate::detect::DocumentKind;
use crate::model::{Content, Element, Role, Structure, NOT_A_TITLE};
use crate::text::count_cjk;
use std::collections::HashMap;

/// Number of accepted chapter headings checked for running-header repeats.
const RECENT_CHAPTERS: usize = 10;

/// Metadata tags that end the backward search of unmatched headings.
const STOP_META: [&str; 4] = [
    "chinese_abstract",
    "english_abstract",
    "chinese_keyword",
    "english_keyword",
];

/// Merging into a chapter marker only absorbs fragments shorter than this.
const MAX_MERGE_CHARS: usize = 18;

/// Assigns heading levels to the elements of one document.
#[derive(Debug, Clone)]
pub struct TitleLevelParser {
    kind: DocumentKind,
    relations: SlotRelations,
    /// Normalized keys of accepted chapter headings, oldest first.
    chapters: Vec<String>,
    seen_heading: bool,
}

fn is_live_heading(el: &Element) -> bool {
    el.title_level != NOT_A_TITLE && el.informative
}

/// First outline component (`2` in `2.1.3`).
fn leading_number(text: &str) -> Option<u32> {
    text.split(['.', '﹒', '．']).next()?.trim().parse().ok()
}

/// Whether `next` starts a new top-level number compared with `previous`.
fn real_jump(previous: &str, next: &str) -> bool {
    matches!((leading_number(previous), leading_number(next)), (Some(p), Some(n)) if p < n)
}

fn is_parent_of(parent: &Element, son: &Element) -> bool {
    if parent.slot == Some(Slot::CHAPTER) {
        return true;
    }
    match (outline_sign(&parent.text), outline_sign(&son.text)) {
        (Some(p), Some(s)) => p.len() <= s.len() && p.iter().zip(&s).all(|(a, b)| a == b),
        _ => false,
    }
}

fn is_brother_of(big: &Element, little: &Element) -> bool {
    match (outline_sign(&big.text), outline_sign(&little.text)) {
        (Some(b), Some(l)) if b.len() == l.len() => b[..b.len() - 1] == l[..l.len() - 1],
        _ => false,
    }
}

fn parents_of(slot: Slot) -> SlotSet {
    match slot {
        Slot::OUTLINE_2 => SlotSet::of(&[0, 1, 2, 6]),
        Slot::OUTLINE_3 => SlotSet::of(&[7]),
        Slot::OUTLINE_4 => SlotSet::of(&[8]),
        Slot::OUTLINE_5 => SlotSet::of(&[9]),
        _ => SlotSet::EMPTY,
    }
}

fn sons_of(slot: Slot) -> SlotSet {
    match slot {
        Slot::OUTLINE_2 => SlotSet::of(&[8, 9, 10]),
        Slot::OUTLINE_3 => SlotSet::of(&[9, 10]),
        Slot::OUTLINE_4 => SlotSet::of(&[10]),
        _ => SlotSet::EMPTY,
    }
}

/// Re-level the headings strictly between `anchor` and `eid` that were
/// placed at or above the anchor.
///
/// Consecutive headings of the same slot share a level; a new slot goes one
/// level below the previous heading.
fn justify_between(els: &mut [Element], anchor: usize, eid: usize) {
    let anchor_level = els[anchor].title_level;
    let mut by_slot: HashMap<Option<Slot>, i32> = HashMap::new();
    let mut last = anchor;

    for inter in anchor + 1..eid {
        if !is_live_heading(&els[inter]) {
            continue;
        }
        if els[inter].title_level <= anchor_level {
            let slot = els[inter].slot;
            let level = if slot == els[last].slot {
                els[last].title_level
            } else if let Some(level) = by_slot.get(&slot) {
                *level
            } else {
                els[last].title_level + 1
            };
            by_slot.insert(slot, level);
            log::debug!("re-levelled element {} to {}", inter, level);
            els[inter].set_level(level);
        }
        last = inter;
    }
}

/// Raise the headings after `pre` that were not placed below it, keeping
/// their relative depths.
fn renumber_run(els: &mut [Element], pre: usize, eid: usize) {
    let pre_level = els[pre].title_level;
    for (ith, inter) in (pre + 1..eid).enumerate() {
        let shift = if ith == 0 {
            1
        } else {
            (els[inter].title_level - els[pre + 1].title_level + 1).max(1)
        };
        if els[inter].title_level <= pre_level && is_live_heading(&els[inter]) {
            els[inter].set_level(pre_level + shift);
        }
    }
}

impl TitleLevelParser {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            relations: SlotRelations::for_document(kind),
            chapters: Vec::new(),
            seen_heading: false,
        }
    }

    /// Relations in their current, possibly adjusted, state.
    pub fn relations(&self) -> &SlotRelations {
        &self.relations
    }

    fn reset(&mut self) {
        self.relations = SlotRelations::for_document(self.kind);
        self.chapters.clear();
        self.seen_heading = false;
    }

    fn recent_chapters(&self) -> impl Iterator<Item = &String> {
        let start = self.chapters.len().saturating_sub(RECENT_CHAPTERS);
        self.chapters[start..].iter()
    }

    fn record_chapter(&mut self, text: &str) {
        self.chapters.push(header_content(text));
    }

    /// Assign `title_level` to every element of `structure`.
    ///
    /// Never fails: an element whose depth cannot be anchored continues at
    /// the depth of the preceding heading.
    pub fn predict(&mut self, structure: &mut Structure) {
        self.reset();

        for eid in 0..structure.len() {
            let slot = {
                let el = &structure[eid];
                patterns::classify(&el.text, el.role)
            };
            if let Some(el) = structure.get_mut(eid) {
                el.slot = slot;
            }

            if self.merge_title(structure, eid) {
                let text = structure[eid - 1].text.clone();
                self.record_chapter(&text);
                continue;
            }

            let Some(slot) = slot else {
                continue;
            };
            let els = structure.as_mut_slice();

            if slot == Slot::PART || slot == Slot::CHAPTER {
                if els[eid].role.is_page_furniture() {
                    if !self.accept_running_header(&mut els[eid]) {
                        continue;
                    }
                } else if self.is_repeated_chapter(els, eid) {
                    log::debug!("element {} repeats a chapter heading", eid);
                    els[eid].informative = false;
                    continue;
                } else {
                    let text = els[eid].text.clone();
                    self.record_chapter(&text);
                }
            }

            if !els[eid].informative {
                continue;
            }

            if !self.seen_heading {
                els[eid].set_level(0);
                self.seen_heading = true;
                continue;
            }

            let level = self.resolve_level(els, eid, slot);
            log::debug!("element {} ({}) -> level {}", eid, slot, level);
            els[eid].set_level(level);
        }

        self.post_process(structure.as_mut_slice());

        log::info!(
            "assigned {} heading levels over {} elements",
            structure.iter().filter(|el| is_live_heading(el)).count(),
            structure.len()
        );
    }

    /// Absorb a short fragment into a preceding bare `第N章`/`第N篇` marker.
    fn merge_title(&self, structure: &mut Structure, eid: usize) -> bool {
        if structure.len() < 2 || eid == 0 {
            return false;
        }
        let el = &structure[eid];
        if el.content != Content::Text {
            return false;
        }
        let title = strip_position_marks(&el.text);
        let slot = el.slot;
        let last = &structure[eid - 1];
        let after_empty_marker =
            matches!(last.slot, Some(Slot::PART | Slot::CHAPTER)) && is_empty_chapter(&last.text);

        let mergeable = if self.relations.go_back().has(slot) {
            true
        } else if !title.contains('。')
            && title.chars().count() < MAX_MERGE_CHARS
            && (slot.is_none() || not_title(&title).is_some())
        {
            true
        } else {
            if last.slot == Some(Slot::PART) && is_empty_chapter(&last.text) && is_part_number(&last.text) {
                let last = &mut structure.as_mut_slice()[eid - 1];
                last.demote();
                last.slot = Some(Slot::UNMATCHED_DOC);
            }
            false
        };

        if !mergeable || !after_empty_marker {
            return false;
        }
        match structure.merge_consecutive(eid - 1, eid) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("could not merge title fragment {}: {}", eid, e);
                false
            }
        }
    }

    /// Promote a running header carrying a chapter title unless the same
    /// title was accepted recently.
    fn accept_running_header(&mut self, el: &mut Element) -> bool {
        let key = header_content(&el.text);
        if self.recent_chapters().any(|recent| *recent == key) {
            return false;
        }
        el.informative = true;
        self.chapters.push(key);
        true
    }

    fn is_repeated_chapter(&self, els: &[Element], eid: usize) -> bool {
        let el = &els[eid];
        let key = header_content(&el.text);
        if !key.is_empty() && self.recent_chapters().any(|recent| *recent == key) {
            return true;
        }
        for pre in els[..eid].iter().rev() {
            if pre.page_id == el.page_id && pre.slot == el.slot {
                return true;
            }
            if pre.page_id < el.page_id {
                break;
            }
        }
        false
    }

    fn resolve_level(&mut self, els: &mut [Element], eid: usize, slot: Slot) -> i32 {
        let ancestors = self.relations.ancestors(slot);
        let successors = self.relations.successors(slot);
        let undefined = self.relations.undefined();
        let go_back = self.relations.go_back();

        let last = (0..eid)
            .rev()
            .find(|i| is_live_heading(&els[*i]))
            .unwrap_or(eid - 1);
        let last_level = els[last].title_level;
        let last_slot = els[last].slot;

        if last_slot == Some(Slot::BRACKET) && self.kind == DocumentKind::DrugInstruction {
            self.relations.document_title_below_bracket();
        }

        let resolved = if last_slot == Some(slot) {
            Some(last_level)
        } else if ancestors.has(last_slot) {
            Some(last_level + 1)
        } else if successors.has(last_slot) || undefined.contains(slot) {
            Some(self.return_to_outer(els, eid, slot, last, ancestors, successors))
        } else if go_back.contains(slot) {
            Some(self.reanchor_unmatched(els, eid, last, ancestors, successors))
        } else if undefined.has(last_slot) || go_back.has(last_slot) {
            self.below_context_header(els, eid, slot, last, ancestors)
        } else if slot.is_outline() {
            self.justify_by_peer_or_parent(els, eid, slot).or_else(|| {
                (starts_numbering(&els[eid].text)
                    && last_slot == Some(Slot::NUMERAL)
                    && starts_numbering(&els[last].text))
                .then_some(last_level + 1)
            })
        } else if last_slot.is_some_and(Slot::is_outline) {
            self.after_outline(els, eid, slot, last, ancestors)
        } else {
            None
        };

        resolved.unwrap_or_else(|| {
            log::debug!("no anchor for element {}, continuing at level {}", eid, last_level);
            last_level
        })
    }

    /// The previous heading is nested below the current slot: search back
    /// for the heading this one continues.
    fn return_to_outer(
        &self,
        els: &mut [Element],
        eid: usize,
        slot: Slot,
        last: usize,
        ancestors: SlotSet,
        successors: SlotSet,
    ) -> i32 {
        let undefined = self.relations.undefined();
        let prev = &els[eid - 1];
        if undefined.contains(slot)
            && prev.title_level != NOT_A_TITLE
            && (looks_like_heading(&prev.text) || self.relations.go_back().has(prev.slot))
        {
            return prev.title_level + 1;
        }

        let last_level = els[last].title_level;
        let mut uppermost = last_level;
        for pre in (0..last).rev() {
            if !is_live_heading(&els[pre]) {
                continue;
            }
            let (pre_level, pre_slot) = (els[pre].title_level, els[pre].slot);
            if successors.has(pre_slot) {
                uppermost = uppermost.min(pre_level);
            } else if ancestors.has(pre_slot) {
                return if undefined.contains(slot) {
                    last_level + 1
                } else {
                    pre_level + 1
                };
            } else if pre_slot == Some(slot) {
                if is_next_in_sequence(&els[pre].text, &els[eid].text, slot) {
                    renumber_run(els, pre, eid);
                }
                return pre_level;
            }
        }

        if uppermost != last_level {
            uppermost + i32::from(undefined.contains(slot))
        } else {
            last_level
        }
    }

    /// Unmatched role-tagged headings nest below the closest recognizable
    /// heading.
    fn reanchor_unmatched(
        &self,
        els: &[Element],
        eid: usize,
        last: usize,
        ancestors: SlotSet,
        successors: SlotSet,
    ) -> i32 {
        let go_back = self.relations.go_back();
        let last_level = els[last].title_level;
        let prev = &els[eid - 1];
        let below_prev = (prev.title_level != NOT_A_TITLE
            && (looks_like_heading(&prev.text) || go_back.has(prev.slot)))
        .then_some(prev.title_level + 1);

        let mut uppermost: Option<i32> = None;
        for pre in els[..eid].iter().rev().filter(|el| is_live_heading(el)) {
            if successors.has(pre.slot) {
                uppermost = Some(uppermost.map_or(pre.title_level, |u| u.min(pre.title_level)));
            } else if pre.meta_name.as_deref().is_some_and(|m| STOP_META.contains(&m)) {
                return last_level + 1;
            } else if ancestors.has(pre.slot) {
                return last_level + 1;
            } else if go_back.has(pre.slot) {
                return pre.title_level;
            } else if starts_numbering(&els[last].text) {
                return last_level + 1;
            }
        }

        below_prev.or(uppermost).unwrap_or(last_level)
    }

    /// The previous heading is a `【】` header or an unmatched heading.
    fn below_context_header(
        &self,
        els: &mut [Element],
        eid: usize,
        slot: Slot,
        last: usize,
        ancestors: SlotSet,
    ) -> Option<i32> {
        let undefined = self.relations.undefined();
        let last_level = els[last].title_level;

        if starts_numbering(&els[eid].text) {
            // A new run below the header: place it relative to the heading
            // that preceded the header.
            for pre in (0..last).rev() {
                if !is_live_heading(&els[pre]) {
                    continue;
                }
                let (pre_level, pre_slot) = (els[pre].title_level, els[pre].slot);
                if pre_slot == Some(slot) {
                    els[last].set_level(pre_level - 1);
                    return Some(pre_level);
                } else if ancestors.has(pre_slot) {
                    els[last].set_level(pre_level + 1);
                    return Some(pre_level + 2);
                } else if undefined.has(pre_slot) && undefined.has(els[last].slot) {
                    return Some(els[last].title_level + 1);
                }
            }
            return Some(last_level + 1);
        }

        for pre in (0..eid).rev() {
            if !is_live_heading(&els[pre]) {
                continue;
            }
            let (pre_level, pre_slot) = (els[pre].title_level, els[pre].slot);
            if pre_slot == Some(slot) {
                if is_next_in_sequence(&els[pre].text, &els[eid].text, slot) {
                    els[last].set_level(pre_level + 1);
                }
                return Some(pre_level);
            }
            if ancestors.has(pre_slot) {
                return Some(pre_level + 1);
            }
        }
        None
    }

    /// Place a dotted outline heading by its parent or sibling outline.
    fn justify_by_peer_or_parent(&mut self, els: &mut [Element], eid: usize, slot: Slot) -> Option<i32> {
        let parents = parents_of(slot);
        let sons = sons_of(slot);
        let ancestors = self.relations.ancestors(slot);

        for (bid, bt) in (0..eid).rev().enumerate() {
            if !is_live_heading(&els[bt]) {
                continue;
            }
            let (bt_level, bt_slot) = (els[bt].title_level, els[bt].slot);

            if parents.has(bt_slot) {
                if slot == Slot::OUTLINE_2 {
                    if bt_slot != Some(Slot::NUMERAL) {
                        return Some(bt_level + 1);
                    }
                    if starts_numbering(&els[eid].text) && els[bt].text.trim_start().starts_with('1') {
                        self.relations.numeral_contains_outlines();
                        return Some(bt_level + 1);
                    }
                    // A bare numeral is weak evidence; look for an outline
                    // heading that fixes the depth instead.
                    for again in (0..=bt).rev() {
                        if !is_live_heading(&els[again]) {
                            continue;
                        }
                        if let Some(level) = Self::justify_digit(els, bt, again, eid) {
                            return Some(level);
                        }
                    }
                    return Some(bt_level + 1);
                } else if is_parent_of(&els[bt], &els[eid]) {
                    if bid != 0 {
                        justify_between(els, bt, eid);
                    }
                    return Some(els[bt].title_level + 1);
                }
            } else if sons.has(bt_slot) {
                justify_between(els, bt, eid);
                let depth = bt_slot.map_or(0, |s| s.index() as i32 - slot.index() as i32);
                return Some(els[bt].title_level - depth);
            } else if bt_slot == Some(slot) {
                if is_brother_of(&els[bt], &els[eid]) {
                    if bid != 0 {
                        justify_between(els, bt, eid);
                    }
                    return Some(els[bt].title_level);
                }
            } else if ancestors.has(bt_slot) {
                return Some(bt_level + 1);
            }
        }
        None
    }

    /// Depth of a `1.1` outline following a bare numeral `bt`, judged from
    /// an earlier heading `again`.
    fn justify_digit(els: &mut [Element], bt: usize, again: usize, eid: usize) -> Option<i32> {
        let again_level = els[again].title_level;
        let offset = match els[again].slot? {
            Slot::OUTLINE_5 => 3,
            Slot::OUTLINE_4 => 2,
            Slot::OUTLINE_3 => 1,
            Slot::OUTLINE_2 => 0,
            Slot::PART | Slot::CHAPTER | Slot::SECTION => return Some(els[bt].title_level + 1),
            _ => return None,
        };
        if real_jump(&els[again].text, &els[eid].text) {
            els[bt].set_level(again_level - offset - 1);
        } else {
            justify_between(els, again, eid);
        }
        Some(again_level - offset)
    }

    /// The previous heading is a dotted outline.
    fn after_outline(
        &mut self,
        els: &[Element],
        eid: usize,
        slot: Slot,
        last: usize,
        ancestors: SlotSet,
    ) -> Option<i32> {
        if starts_numbering(&els[eid].text) {
            if let Some(last_slot) = els[last].slot {
                if self.relations.ancestors(last_slot).contains(Slot::NUMERAL) {
                    self.relations.nest_below_outlines(slot);
                }
            }
            return Some(els[last].title_level + 1);
        }
        for pre in els[..eid].iter().rev().filter(|el| is_live_heading(el)) {
            if pre.slot == Some(slot) {
                return Some(pre.title_level);
            }
            if ancestors.has(pre.slot) {
                return Some(pre.title_level + 1);
            }
        }
        None
    }

    fn post_process(&self, els: &mut [Element]) {
        self.demote_after_lowest(els);
        mark_leaves(els);

        let n = els.len();
        for i in 0..n {
            let cjk = count_cjk(&els[i].text);
            if !els[i].leaf && els[i].title_level != NOT_A_TITLE && cjk > 30 {
                inline::extract(&mut els[i]);
            }
            if !els[i].leaf {
                continue;
            }
            if cjk > 50 {
                els[i].demote();
            }
            let next = (i + 1).min(n - 1);
            if els[next].title_level == els[i].title_level {
                els[i].demote();
            }
            if !looks_like_heading(&els[i].text) {
                els[i].demote();
            }
        }
    }

    /// Numbered body lines following a `参考文献`-style cue are list items,
    /// not headings.
    fn demote_after_lowest(&self, els: &mut [Element]) {
        let mut previous_distinct: Option<Slot> = None;
        let mut last_slot: Option<Slot> = None;
        for el in els.iter_mut() {
            let listy = matches!(
                el.slot,
                Some(Slot::NUMERAL | Slot::OUTLINE_2 | Slot::PAREN_NUMERAL | Slot::CIRCLED)
            );
            if listy
                && (previous_distinct == Some(Slot::LOWEST) || last_slot == Some(Slot::LOWEST))
                && el.role == Role::Text
            {
                el.demote();
            }
            if let Some(slot) = el.slot {
                if last_slot != Some(slot) && last_slot != Some(Slot::CIRCLED) {
                    previous_distinct = last_slot;
                }
                last_slot = Some(slot);
            }
        }
    }
}

/// Flag fine-grained numbered headings with no finer heading below them.
fn mark_leaves(els: &mut [Element]) {
    let n = els.len();
    for el in els.iter_mut() {
        el.leaf = false;
    }
    for i in 1..n.saturating_sub(1) {
        let level = els[i].title_level;
        let differs = |el: &Element| el.title_level != NOT_A_TITLE && el.title_level != level;
        let left = els[..i].iter().rev().find(|el| differs(el)).map(|el| el.title_level);
        let right = els[i + 1..].iter().find(|el| differs(el)).map(|el| el.title_level);
        let fine_grained = matches!(
            els[i].slot,
            Some(Slot::NUMERAL | Slot::PAREN_NUMERAL | Slot::HALF_PAREN_NUMERAL | Slot::CIRCLED)
        );
        els[i].leaf = match (left, right) {
            (Some(l), Some(r)) => level >= l && level >= r && fine_grained && l != 0 && r != 0,
            _ => false,
        };
    }
}

/// Assign levels from the role tags alone: `doc_title` is 0, `text_title` is 1.
pub fn assign_from_roles(structure: &mut Structure) {
    for el in structure.iter_mut() {
        match el.role {
            Role::DocTitle => el.set_level(0),
            Role::TextTitle => el.set_level(1),
            _ => {}
        }
    }
}

/// Run [`TitleLevelParser`] over `structure` with fresh relations.
pub fn predict_levels(structure: &mut Structure, kind: DocumentKind) {
    TitleLevelParser::new(kind).predict(structure);
}
