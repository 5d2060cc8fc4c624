//! Ordered multimap from field name to every value submitted under it.

/// Field names mapped to their values.
///
/// Names iterate in the order they were first seen; values sharing a name
/// keep their encounter order. Form submissions are small, so lookups are
/// linear scans over a `Vec` rather than hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap<V> {
    entries: Vec<(String, Vec<V>)>,
}

impl<V> Default for FieldMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> FieldMap<V> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`.
    pub fn append(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// All values for `name`, or `None` if the name never appeared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[V]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, values)| values.as_slice())
    }

    /// The first value for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&V> {
        self.get(name).and_then(<[V]>::first)
    }

    /// Returns true if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Field names in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(name, values)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no field was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert every value, keeping names and ordering.
    #[must_use]
    pub fn map_values<U>(self, mut f: impl FnMut(V) -> U) -> FieldMap<U> {
        FieldMap {
            entries: self
                .entries
                .into_iter()
                .map(|(k, values)| (k, values.into_iter().map(&mut f).collect()))
                .collect(),
        }
    }
}

impl<V> IntoIterator for FieldMap<V> {
    type Item = (String, Vec<V>);
    type IntoIter = std::vec::IntoIter<(String, Vec<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_groups_by_name_in_first_seen_order() {
        let mut map = FieldMap::new();
        map.append("b", 1);
        map.append("a", 2);
        map.append("b", 3);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(&[1, 3][..]));
        assert_eq!(map.first("a"), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn missing_name() {
        let map: FieldMap<u8> = FieldMap::new();
        assert!(map.is_empty());
        assert!(!map.contains("x"));
        assert_eq!(map.get("x"), None);
        assert_eq!(map.first("x"), None);
    }

    #[test]
    fn map_values_keeps_layout() {
        let mut map = FieldMap::new();
        map.append("n", "1");
        map.append("n", "2");
        let parsed = map.map_values(|v| v.parse::<u32>().unwrap());
        assert_eq!(parsed.get("n"), Some(&[1, 2][..]));
    }
}
