//! Server capability cache.

use std::fmt;

/// Ordered set of capability strings as advertised by a server.
///
/// Lookups are case-insensitive and match on the keyword: `PIPELINING`
/// matches `pipelining`, `SIZE` matches `SIZE 35882577` and `AUTH` matches
/// `AUTH=PLAIN`. A query that itself contains `=` or a space must match a
/// whole entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: Vec<String>,
}

impl CapabilitySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry, keeping server order.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Returns the first entry matching `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| matches(entry, name))
            .map(String::as_str)
    }

    /// Returns true if `name` is advertised.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the parameter text of the first entry matching `name`.
    ///
    /// For `SIZE 1000` this is `1000`; for `AUTH=PLAIN` it is `PLAIN`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        let entry = self.get(name)?;
        let split = entry.find(['=', ' '])?;
        Some(entry[split + 1..].trim())
    }

    /// Iterates over the entries in server order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn keyword(entry: &str) -> &str {
    entry.find(['=', ' ']).map_or(entry, |i| &entry[..i])
}

fn matches(entry: &str, query: &str) -> bool {
    if query.contains(['=', ' ']) {
        entry.eq_ignore_ascii_case(query)
    } else {
        keyword(entry).eq_ignore_ascii_case(query)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(String::as_str)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entries.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> CapabilitySet {
        ["IMAP4rev1", "AUTH=PLAIN", "AUTH=XOAUTH2", "SIZE 35882577", "STARTTLS"]
            .into_iter()
            .collect()
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let caps = caps();
        assert!(caps.contains("imap4rev1"));
        assert!(caps.contains("starttls"));
        assert!(!caps.contains("IDLE"));
    }

    #[test]
    fn keyword_matches_parameterized_entries() {
        let caps = caps();
        assert_eq!(caps.get("auth"), Some("AUTH=PLAIN"));
        assert_eq!(caps.get("SIZE"), Some("SIZE 35882577"));
        assert_eq!(caps.value("size"), Some("35882577"));
        assert_eq!(caps.value("STARTTLS"), None);
    }

    #[test]
    fn full_query_matches_whole_entry() {
        let caps = caps();
        assert!(caps.contains("auth=xoauth2"));
        assert!(!caps.contains("AUTH=LOGIN"));
        assert!(!caps.contains("SIZE 1"));
    }

    #[test]
    fn keeps_server_order() {
        let set = caps();
        let listed: Vec<&str> = set.iter().collect();
        assert_eq!(listed[0], "IMAP4rev1");
        assert_eq!(listed[4], "STARTTLS");
        assert_eq!(set.len(), 5);
    }
}
