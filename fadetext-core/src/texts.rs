//! The ordered set of strings a rotator cycles through.

use crate::error::InvalidConfiguration;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Ordered, non-empty sequence of display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSet {
    texts: Vec<String>,
}

impl TextSet {
    /// Collect `texts` into a set.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::EmptyTexts`] if `texts` yields nothing.
    pub fn new<I, S>(texts: I) -> Result<Self, InvalidConfiguration>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        if texts.is_empty() {
            return Err(InvalidConfiguration::EmptyTexts);
        }
        Ok(Self { texts })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.texts.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.texts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.texts.iter()
    }

    /// Position after `position`, wrapping to 0 after the last text.
    #[must_use]
    pub fn next_position(&self, position: usize) -> usize {
        (position + 1) % self.texts.len()
    }

    /// Randomly permute the texts in place.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.texts.shuffle(rng);
    }
}

impl<'a> IntoIterator for &'a TextSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.texts.iter()
    }
}

/// Resource-style lookup of named string arrays.
///
/// Declarative configuration may refer to texts by id instead of listing them
/// inline; anything that can resolve an id to an ordered list of strings can
/// back that lookup.
pub trait StringArrays {
    /// Get the string array registered under `id`.
    fn string_array(&self, id: &str) -> Option<Vec<String>>;
}

impl StringArrays for BTreeMap<String, Vec<String>> {
    fn string_array(&self, id: &str) -> Option<Vec<String>> {
        self.get(id).cloned()
    }
}

impl<S: BuildHasher> StringArrays for HashMap<String, Vec<String>, S> {
    fn string_array(&self, id: &str) -> Option<Vec<String>> {
        self.get(id).cloned()
    }
}

/// Lookup that never resolves anything, for hosts without resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStringArrays;

impl StringArrays for NoStringArrays {
    fn string_array(&self, _id: &str) -> Option<Vec<String>> {
        None
    }
}
