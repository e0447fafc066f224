//! # Name Index
//!
//! Case-insensitive, name-keyed index over one store's descriptors.
//!
//! The join between stores is 1:1 by [`NameKey`]. When several items on one
//! side share a key, the last one indexed becomes the join representative and
//! the earlier ones are kept as *shadowed* entries. Shadowed entries never
//! take part in matching, but the reconciler still classifies them so that
//! every scanned item lands in exactly one category.
//!
//! Identity is the item id: a store that lists the same id twice (a file
//! reachable through two parent folders) contributes one entry.

use crate::descriptor::ItemDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Lower-cased item name used as the join key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ItemDescriptor> for NameKey {
    fn from(descriptor: &ItemDescriptor) -> Self {
        Self::new(&descriptor.name)
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name-keyed view over one store's scan
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    /// Every descriptor, in scan order
    entries: Vec<ItemDescriptor>,
    /// Key -> position of the join representative in `entries`
    by_key: HashMap<NameKey, usize>,
    /// Keys in the order they were first seen
    key_order: Vec<NameKey>,
    /// Ids already indexed
    ids: HashSet<String>,
}

impl NameIndex {
    /// Build an index from descriptors in scan order.
    ///
    /// Deterministic: the same input always yields the same representatives
    /// and the same iteration order.
    pub fn build(descriptors: impl IntoIterator<Item = ItemDescriptor>) -> Self {
        let mut index = Self::default();
        for descriptor in descriptors {
            index.insert(descriptor);
        }
        index
    }

    fn insert(&mut self, descriptor: ItemDescriptor) {
        if !self.ids.insert(descriptor.id.clone()) {
            return;
        }

        let key = NameKey::from(&descriptor);
        let position = self.entries.len();
        self.entries.push(descriptor);

        if self.by_key.insert(key.clone(), position).is_none() {
            self.key_order.push(key);
        }
    }

    /// Join representative for a key
    pub fn get(&self, key: &NameKey) -> Option<&ItemDescriptor> {
        self.by_key
            .get(key)
            .and_then(|&position| self.entries.get(position))
    }

    pub fn contains_key(&self, key: &NameKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Representatives in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&NameKey, &ItemDescriptor)> + '_ {
        self.key_order
            .iter()
            .filter_map(move |key| self.get(key).map(|descriptor| (key, descriptor)))
    }

    /// Descriptors hidden behind a later same-named item, in scan order
    pub fn shadowed(&self) -> impl Iterator<Item = &ItemDescriptor> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(position, descriptor)| {
                self.by_key.get(&NameKey::from(*descriptor)) != Some(position)
            })
            .map(|(_, descriptor)| descriptor)
    }

    /// Descriptors in scan order, minus the representatives of `consumed` keys
    pub fn unconsumed<'a>(
        &'a self,
        consumed: &'a HashSet<NameKey>,
    ) -> impl Iterator<Item = &'a ItemDescriptor> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(position, descriptor)| {
                let key = NameKey::from(*descriptor);
                !(consumed.contains(&key) && self.by_key.get(&key) == Some(position))
            })
            .map(|(_, descriptor)| descriptor)
    }

    /// Every descriptor in scan order
    pub fn entries(&self) -> &[ItemDescriptor] {
        &self.entries
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.key_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_order.is_empty()
    }

    /// Number of scanned descriptors, shadowed ones included
    pub fn item_count(&self) -> usize {
        self.entries.len()
    }
}

/// Index a collection of descriptors by name
pub fn index(descriptors: impl IntoIterator<Item = ItemDescriptor>) -> NameIndex {
    NameIndex::build(descriptors)
}
