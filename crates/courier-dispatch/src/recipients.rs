//! Recipient list cleanup.

use std::collections::HashSet;

use courier_protocol::is_valid_email;

/// The addresses a dispatch will actually send to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet {
    /// Valid, trimmed, de-duplicated addresses in first-seen order.
    pub addresses: Vec<String>,
    /// Entries dropped as empty, malformed, or duplicate.
    pub skipped: usize,
}

impl RecipientSet {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }
}

/// Trims every entry and keeps the ones shaped like an email address.
///
/// Dropped entries are counted, never reported as failures. Exact
/// duplicates (after trimming) collapse to their first occurrence.
pub fn filter_recipients<S: AsRef<str>>(raw: &[S]) -> RecipientSet {
    let mut seen = HashSet::new();
    let mut set = RecipientSet::default();

    for entry in raw {
        let address = entry.as_ref().trim();
        if is_valid_email(address) && seen.insert(address) {
            set.addresses.push(address.to_string());
        } else {
            set.skipped += 1;
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_recipients_drops_invalid_and_empty() {
        let set = filter_recipients(&["a@x.com", "not-an-email", "", "b@x.com"]);
        assert_eq!(set.addresses, vec!["a@x.com", "b@x.com"]);
        assert_eq!(set.skipped, 2);
    }

    #[test]
    fn test_filter_recipients_trims_and_dedupes_in_order() {
        let set = filter_recipients(&[" b@x.com", "a@x.com", "b@x.com  ", "a@x.com"]);
        assert_eq!(set.addresses, vec!["b@x.com", "a@x.com"]);
        assert_eq!(set.skipped, 2);
    }

    #[test]
    fn test_filter_recipients_all_invalid_is_empty() {
        let set = filter_recipients(&["   ", "@", "x@y"]);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
