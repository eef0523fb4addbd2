//! Append-only, globally indexed element arena.

use super::Element;
use crate::error::{Error, Result};
use crate::render::{self, DocumentTree};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// The ordered elements of one reconstructed document.
///
/// Elements are never removed. A merge marks the absorbed element
/// non-informative, so an element's `global_index` always equals its
/// position in the arena.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Structure {
    elements: Vec<Element>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append an element and return its global index.
    pub fn push(&mut self, mut element: Element) -> usize {
        let index = self.elements.len();
        element.global_index = index;
        self.elements.push(element);
        index
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub fn last(&self) -> Option<&Element> {
        self.elements.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Element> {
        self.elements.last_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Element> {
        self.elements.iter_mut()
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable view over the elements. The arena length cannot change through it.
    pub fn as_mut_slice(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    /// Append the text of `second` to `first` and mark `second` non-informative.
    ///
    /// Merging an element into itself is a no-op. `second` must directly
    /// follow `first`.
    pub fn merge_consecutive(&mut self, first: usize, second: usize) -> Result<()> {
        if first == second {
            return Ok(());
        }
        if second != first + 1 || second >= self.elements.len() {
            return Err(Error::Other(format!(
                "cannot merge element {} into {} (length {})",
                second,
                first,
                self.elements.len()
            )));
        }
        let (head, tail) = self.elements.split_at_mut(second);
        let target = &mut head[first];
        let absorbed = &mut tail[0];
        target.text.push_str(&absorbed.text);
        absorbed.informative = false;
        log::debug!("merged element {} into {}", second, first);
        Ok(())
    }

    /// Replace the element at `index`, keeping its global index.
    pub fn replace(&mut self, index: usize, mut element: Element) -> Result<Element> {
        let len = self.elements.len();
        let slot = self
            .elements
            .get_mut(index)
            .ok_or_else(|| Error::Other(format!("index {} out of range (length {})", index, len)))?;
        element.global_index = index;
        Ok(std::mem::replace(slot, element))
    }

    /// Render the structure as Markdown.
    pub fn to_markdown(&self) -> String {
        render::to_markdown(self)
    }

    /// Build the nested document tree.
    pub fn to_tree(&self, document_name: &str) -> DocumentTree {
        render::build_tree(self, document_name)
    }
}

impl Index<usize> for Structure {
    type Output = Element;

    fn index(&self, index: usize) -> &Element {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a Structure {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl FromIterator<Element> for Structure {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut structure = Structure::new();
        for element in iter {
            structure.push(element);
        }
        structure
    }
}
