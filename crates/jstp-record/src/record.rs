use crate::value::Value;

/// An ordered mapping from string keys to [`Value`]s.
///
/// Keys are unique; order is insertion order and is preserved for
/// deterministic serialization, but per the record grammar it carries no
/// input semantics of its own (a reader must not depend on key order to
/// interpret a packet — only the header/verb key *names* matter).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a key. If the key already exists, its value is
    /// replaced in place (the entry keeps its original position); the
    /// record format's "duplicate keys keep the last" rule is applied this
    /// way so serialization stays deterministic.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the first key in insertion order, if any.
    ///
    /// Packets use this to read the "header key" that names the packet
    /// kind (the record format does not otherwise distinguish a first key;
    /// the packet layer is the one that assigns this meaning).
    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }

    /// Returns the second key in insertion order, if any (the packet
    /// format's "verb key").
    pub fn second_key(&self) -> Option<&str> {
        self.entries.get(1).map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_update_in_place() {
        let mut r = Record::new();
        r.insert("a", Value::Int(1));
        r.insert("b", Value::Int(2));
        r.insert("a", Value::Int(3));
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("a"), Some(&Value::Int(3)));
        assert_eq!(r.first_key(), Some("a"));
    }
}
