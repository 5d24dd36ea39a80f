//! Ordered replacer maps.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::Display;

use super::Replacer;
use crate::{Error, Result};

static COPY_ORIGINAL: Replacer = Replacer::CopyOriginal;

/// An ordered map from key to [`Replacer`], with at most one replacer per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacerSet<K: Ord> {
    replacers: BTreeMap<K, Replacer>,
}

impl<K: Ord> Default for ReplacerSet<K> {
    fn default() -> Self {
        Self {
            replacers: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Display> ReplacerSet<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a replacer for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateReplacer`] if `key` already has one; the
    /// existing replacer is kept.
    pub fn insert(&mut self, key: K, replacer: Replacer) -> Result<()> {
        if self.replacers.contains_key(&key) {
            return Err(Error::DuplicateReplacer {
                key: key.to_string(),
            });
        }
        self.replacers.insert(key, replacer);
        Ok(())
    }

    /// Returns the replacer registered for `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&Replacer>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.replacers.get(key)
    }

    /// Returns the replacer for `key`, defaulting to [`Replacer::CopyOriginal`].
    pub fn resolve<Q>(&self, key: &Q) -> &Replacer
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.replacers.get(key).unwrap_or(&COPY_ORIGINAL)
    }

    /// Returns `true` if `key` has a replacer.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.replacers.contains_key(key)
    }

    /// Removes and returns the replacer for `key`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Replacer>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.replacers.remove(key)
    }

    /// Number of registered replacers.
    pub fn len(&self) -> usize {
        self.replacers.len()
    }

    /// Returns `true` if no replacers are registered.
    pub fn is_empty(&self) -> bool {
        self.replacers.is_empty()
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.replacers.keys()
    }

    /// Iterates over key/replacer pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Replacer)> {
        self.replacers.iter()
    }
}

impl<K: Ord> IntoIterator for ReplacerSet<K> {
    type Item = (K, Replacer);
    type IntoIter = std::collections::btree_map::IntoIter<K, Replacer>;

    fn into_iter(self) -> Self::IntoIter {
        self.replacers.into_iter()
    }
}
