//! Insertion-ordered header map with case-insensitive lookup

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// HTTP headers, preserving insertion order.
///
/// Lookup and replacement are case-insensitive; the casing of the
/// first insertion wins for output.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing an existing value in place
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut headers = HeaderMap::new();
        headers.set("X-B", "1");
        headers.set("X-A", "2");
        headers.set("Content-Type", "application/json");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["X-B", "X-A", "Content-Type"]);
    }

    #[test]
    fn test_case_insensitive_lookup_and_replace() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/plain");
        headers.set("content-type", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        // First casing wins
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Content-Type"]);
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let mut headers = HeaderMap::new();
        headers.set("B", "1");
        headers.set("A", "2");
        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"B":"1","A":"2"}"#);
    }
}
