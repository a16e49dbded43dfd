//! BSON document: an insertion-ordered, case-sensitive key/value mapping
//! (spec §3, REDESIGN FLAGS). BSON documents proper are ordered and
//! case-sensitive, so this is backed by `indexmap::IndexMap` rather than a
//! plain hash map, keeping the familiar `insert`/`get`/`remove` shape.

use indexmap::IndexMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Clone, PartialEq, Default)]
pub struct Document {
    inner: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Document {
        Document {
            inner: IndexMap::new(),
        }
    }

    /// Inserts a key/value pair, preserving first-seen order but keeping the
    /// last value written for a repeated key (spec §3 duplicate-key rule).
    ///
    /// Fails with `Serialization` if `key` contains a null byte, which cannot
    /// round-trip through BSON's null-terminated CString key framing.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Document> {
        let key = key.into();
        check_key(&key)?;
        self.inner.insert(key, value.into());
        Ok(self)
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.inner.get(key.as_ref())
    }

    pub fn get_mut(&mut self, key: impl AsRef<str>) -> Option<&mut Value> {
        self.inner.get_mut(key.as_ref())
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.inner.contains_key(key.as_ref())
    }

    /// Removes a key, preserving the relative order of the remaining keys.
    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<Value> {
        self.inner.shift_remove(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The key written first. Used by the EJSON first-key dispatch heuristic
    /// (spec §6.2) to decide which `$`-envelope a document matches. Fails if
    /// the document is empty (spec §3).
    pub fn get_first_key(&self) -> Result<&str> {
        self.inner
            .keys()
            .next()
            .map(String::as_str)
            .ok_or_else(|| Error::invalid_operation("get_first_key called on an empty document"))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.inner.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.as_bytes().contains(&0) {
        return Err(Error::serialization(
            "document key contains a null byte, which bson cannot encode",
        ));
    }
    Ok(())
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            // FromIterator can't fail; a null-byte key is silently dropped
            // rather than panicking the process.
            let _ = doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut doc = Document::new();
        doc.insert("z", 1i32).unwrap();
        doc.insert("a", 2i32).unwrap();
        doc.insert("m", 3i32).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn is_case_sensitive() {
        let mut doc = Document::new();
        doc.insert("Key", 1i32).unwrap();
        assert!(doc.get("key").is_none());
        assert!(doc.get("Key").is_some());
    }

    #[test]
    fn repeated_key_keeps_last_value_but_first_position() {
        let mut doc = Document::new();
        doc.insert("a", 1i32).unwrap();
        doc.insert("b", 2i32).unwrap();
        doc.insert("a", 3i32).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a").unwrap().as_i32().unwrap(), 3);
    }

    #[test]
    fn remove_preserves_order_of_remainder() {
        let mut doc = Document::new();
        doc.insert("a", 1i32).unwrap();
        doc.insert("b", 2i32).unwrap();
        doc.insert("c", 3i32).unwrap();
        doc.remove("b");
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn rejects_null_byte_in_key() {
        let mut doc = Document::new();
        assert!(doc.insert("a\0b", 1i32).is_err());
    }

    #[test]
    fn get_first_key_fails_on_empty_document() {
        let doc = Document::new();
        assert!(doc.get_first_key().is_err());
    }
}
