//! Precedence relations between heading slots.
//!
//! `ancestors(s)` lists the slots that may contain a heading of slot `s`;
//! `successors(s)` lists the slots that may appear nested below it. A fresh
//! [`SlotRelations`] is built for every document and adjusted as the
//! classifier learns how that document numbers its headings.

use super::patterns::Slot;
use crate::detect::DocumentKind;
use std::fmt;

/// Compact set of slots.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SlotSet(u32);

impl SlotSet {
    pub const EMPTY: SlotSet = SlotSet(0);

    pub fn of(slots: &[u8]) -> Self {
        slots.iter().fold(Self::EMPTY, |set, s| SlotSet(set.0 | (1u32 << *s)))
    }

    /// Set holding every slot index in `range`.
    pub fn range(range: std::ops::RangeInclusive<u8>) -> Self {
        range.fold(Self::EMPTY, |set, s| SlotSet(set.0 | (1u32 << s)))
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.0 & (1u32 << slot.index()) != 0
    }

    /// Membership for an optional slot; `None` is never a member.
    pub fn has(&self, slot: Option<Slot>) -> bool {
        slot.is_some_and(|s| self.contains(s))
    }

    pub fn insert(&mut self, slot: Slot) {
        self.0 |= 1u32 << slot.index();
    }

    pub fn remove(&mut self, slot: Slot) {
        self.0 &= !(1u32 << slot.index());
    }

    pub fn extend(&mut self, other: SlotSet) {
        self.0 |= other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::all().filter(move |s| self.contains(*s))
    }
}

impl fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|s| s.index())).finish()
    }
}

/// Ancestor/successor tables for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRelations {
    ancestors: [SlotSet; Slot::COUNT],
    successors: [SlotSet; Slot::COUNT],
    /// Slots whose nesting depends on context (`【】` headers).
    undefined: SlotSet,
    /// Sentinel slots that re-anchor on their neighbours.
    go_back: SlotSet,
}

impl SlotRelations {
    /// Relations shared by every kind of document.
    pub fn base() -> Self {
        const UNMATCHED: [u8; 2] = [14, 15];
        let with_unmatched = |mut set: SlotSet| {
            set.extend(SlotSet::of(&UNMATCHED));
            set
        };

        let successors = [
            SlotSet::range(1..=16),
            SlotSet::range(2..=16),
            SlotSet::range(3..=16),
            SlotSet::of(&[5, 6, 7, 11, 12, 13, 16]),
            SlotSet::of(&[13, 16]),
            SlotSet::of(&[6, 11, 12, 13, 16]),
            SlotSet::of(&[11, 12, 13, 16]),
            SlotSet::of(&[8, 9, 10, 11, 12, 13, 16]),
            SlotSet::of(&[9, 10, 11, 12, 13, 16]),
            SlotSet::of(&[10, 11, 12, 13, 16]),
            SlotSet::of(&[11, 12, 13, 16]),
            SlotSet::of(&[12, 13, 16]),
            SlotSet::of(&[13, 16]),
            SlotSet::of(&[16]),
            SlotSet::of(&[7, 8, 9, 10, 11, 12, 13, 16]),
            SlotSet::of(&[7, 8, 9, 10, 11, 12, 13, 16]),
            SlotSet::EMPTY,
        ];

        let ancestors = [
            SlotSet::EMPTY,
            SlotSet::of(&[0]),
            SlotSet::of(&[0, 1]),
            SlotSet::of(&[0, 1, 2]),
            SlotSet::of(&[0, 1, 2]),
            SlotSet::of(&[0, 1, 2, 3]),
            SlotSet::of(&[0, 1, 2, 3, 5]),
            SlotSet::of(&[0, 1, 2]),
            SlotSet::of(&[0, 1, 2, 7]),
            SlotSet::of(&[0, 1, 2, 7, 8]),
            SlotSet::of(&[0, 1, 2, 7, 8, 9]),
            with_unmatched(SlotSet::of(&[0, 1, 2, 3, 5, 6, 7, 8, 9, 10])),
            with_unmatched(SlotSet::of(&[0, 1, 2, 3, 5, 6, 7, 8, 9, 10, 11])),
            with_unmatched(SlotSet::range(0..=12)),
            SlotSet::of(&[0, 1, 2]),
            SlotSet::of(&[0, 1, 2]),
            SlotSet::range(0..=15),
        ];

        Self {
            ancestors,
            successors,
            undefined: SlotSet::of(&[4]),
            go_back: SlotSet::of(&UNMATCHED),
        }
    }

    /// Relations adjusted for a document-type hint.
    ///
    /// Outside books, bare and Chinese-numeral enumerations may contain
    /// dotted outlines. Drug inserts are organised by `【】` section headers
    /// placed directly below the document title.
    pub fn for_document(kind: DocumentKind) -> Self {
        let mut rel = Self::base();
        let dotted = SlotSet::range(7..=10);

        if kind != DocumentKind::Book {
            rel.successors[Slot::CHINESE_ENUM.index()].extend(dotted);
            rel.successors[Slot::NUMERAL.index()].extend(dotted);
            for slot in dotted.iter() {
                rel.ancestors[slot.index()].extend(SlotSet::of(&[3, 6]));
            }
        }

        if kind == DocumentKind::DrugInstruction {
            rel.undefined = SlotSet::EMPTY;
            rel.ancestors[Slot::BRACKET.index()] = SlotSet::of(&[14]);
            rel.successors[Slot::BRACKET.index()] = SlotSet::of(&[0, 1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15, 16]);
            for slot in Slot::all().filter(|s| *s != Slot::BRACKET && *s != Slot::UNMATCHED_DOC) {
                rel.ancestors[slot.index()].insert(Slot::BRACKET);
            }
        }
        rel
    }

    pub fn ancestors(&self, slot: Slot) -> SlotSet {
        self.ancestors[slot.index()]
    }

    pub fn successors(&self, slot: Slot) -> SlotSet {
        self.successors[slot.index()]
    }

    pub fn undefined(&self) -> SlotSet {
        self.undefined
    }

    pub fn go_back(&self) -> SlotSet {
        self.go_back
    }

    pub(crate) fn ancestors_mut(&mut self, slot: Slot) -> &mut SlotSet {
        &mut self.ancestors[slot.index()]
    }

    pub(crate) fn successors_mut(&mut self, slot: Slot) -> &mut SlotSet {
        &mut self.successors[slot.index()]
    }

    /// A `1`-style numeral turned out to head a run of dotted outlines.
    pub(crate) fn numeral_contains_outlines(&mut self) {
        let dotted = SlotSet::range(7..=10);
        self.successors_mut(Slot::NUMERAL).extend(dotted);
        for slot in dotted.iter() {
            self.ancestors_mut(slot).insert(Slot::NUMERAL);
        }
    }

    /// In a drug insert, a `【】` header has been seen: unmatched document
    /// titles now nest below it, and the header itself has no ancestor.
    pub(crate) fn document_title_below_bracket(&mut self) {
        self.ancestors_mut(Slot::UNMATCHED_DOC).insert(Slot::BRACKET);
        *self.ancestors_mut(Slot::BRACKET) = SlotSet::EMPTY;
        self.successors_mut(Slot::BRACKET).insert(Slot::UNMATCHED_DOC);
    }

    /// A numbering run of `slot` restarted directly below a dotted outline
    /// whose ancestors include bare numerals: `slot` nests below them.
    pub(crate) fn nest_below_outlines(&mut self, slot: Slot) {
        self.successors_mut(slot).remove(Slot::NUMERAL);
        self.ancestors_mut(Slot::NUMERAL).remove(slot);
        self.ancestors_mut(slot).extend(SlotSet::of(&[6, 7, 8, 9]));
        self.successors_mut(Slot::NUMERAL).insert(slot);
    }
}

impl Default for SlotRelations {
    fn default() -> Self {
        Self::base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_set_ops() {
        let mut set = SlotSet::of(&[1, 3]);
        assert!(set.contains(Slot::CHAPTER));
        assert!(!set.contains(Slot::SECTION));
        set.insert(Slot::SECTION);
        set.remove(Slot::CHAPTER);
        assert_eq!(set, SlotSet::of(&[2, 3]));
        assert!(!set.has(None));
        assert_eq!(SlotSet::range(7..=10).iter().count(), 4);
    }

    #[test]
    fn test_base_relations() {
        let rel = SlotRelations::base();
        assert!(rel.ancestors(Slot::OUTLINE_3).contains(Slot::OUTLINE_2));
        assert!(rel.ancestors(Slot::OUTLINE_2).contains(Slot::CHAPTER));
        assert!(!rel.ancestors(Slot::OUTLINE_2).contains(Slot::NUMERAL));
        assert!(rel.successors(Slot::CHAPTER).contains(Slot::LOWEST));
        assert!(rel.ancestors(Slot::PART).is_empty());
        assert!(rel.undefined().contains(Slot::BRACKET));
        assert!(rel.go_back().contains(Slot::UNMATCHED_TEXT));
    }

    #[test]
    fn test_non_book_outlines_nest_in_numerals() {
        let rel = SlotRelations::for_document(DocumentKind::Guideline);
        assert!(rel.ancestors(Slot::OUTLINE_2).contains(Slot::NUMERAL));
        assert!(rel.ancestors(Slot::OUTLINE_5).contains(Slot::CHINESE_ENUM));
        assert!(rel.successors(Slot::NUMERAL).contains(Slot::OUTLINE_4));

        let book = SlotRelations::for_document(DocumentKind::Book);
        assert_eq!(book, SlotRelations::base());
    }

    #[test]
    fn test_drug_instruction_brackets() {
        let rel = SlotRelations::for_document(DocumentKind::DrugInstruction);
        assert!(rel.undefined().is_empty());
        assert_eq!(rel.ancestors(Slot::BRACKET), SlotSet::of(&[14]));
        assert!(rel.ancestors(Slot::CHINESE_ENUM).contains(Slot::BRACKET));
        assert!(rel.ancestors(Slot::LOWEST).contains(Slot::BRACKET));
        assert!(!rel.ancestors(Slot::UNMATCHED_DOC).contains(Slot::BRACKET));
        assert!(!rel.successors(Slot::BRACKET).contains(Slot::UNMATCHED_DOC));
    }

    #[test]
    fn test_runtime_adjustments() {
        let mut rel = SlotRelations::base();
        rel.numeral_contains_outlines();
        assert!(rel.ancestors(Slot::OUTLINE_3).contains(Slot::NUMERAL));

        rel.document_title_below_bracket();
        assert!(rel.ancestors(Slot::BRACKET).is_empty());
        assert!(rel.successors(Slot::BRACKET).contains(Slot::UNMATCHED_DOC));
    }

    #[test]
    fn test_bracket_header_outranks_document_title() {
        let mut rel = SlotRelations::for_document(DocumentKind::DrugInstruction);
        rel.document_title_below_bracket();
        assert!(rel.ancestors(Slot::UNMATCHED_DOC).contains(Slot::BRACKET));
        assert!(!rel.ancestors(Slot::BRACKET).contains(Slot::UNMATCHED_DOC));
        assert!(rel.ancestors(Slot::BRACKET).is_empty());
    }
}
