//! Common types shared by storage backends and their consumers.

use std::ops::Bound;

use bytes::Bytes;

/// Key-value pair returned from range queries.
///
/// ```
/// use bytes::Bytes;
/// use keyward_storage::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("config/issuers"), Bytes::from(r#"{"default":""}"#));
/// assert_eq!(kv.key_str(), Some("config/issuers"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Returns the key as UTF-8 when it is valid text.
    #[must_use]
    pub fn key_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.key).ok()
    }
}

/// Builds the half-open range covering every key that starts with `prefix`.
///
/// The upper bound is the prefix with its last non-`0xFF` byte incremented;
/// a prefix made only of `0xFF` bytes (or an empty prefix) is unbounded above.
///
/// ```
/// use std::ops::Bound;
/// use keyward_storage::prefix_range;
///
/// let (start, end) = prefix_range(b"config/issuer/");
/// assert_eq!(start, Bound::Included(b"config/issuer/".to_vec()));
/// assert_eq!(end, Bound::Excluded(b"config/issuer0".to_vec()));
/// ```
#[must_use]
pub fn prefix_range(prefix: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let start = Bound::Included(prefix.to_vec());
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return (start, Bound::Excluded(upper));
        }
    }
    (start, Bound::Unbounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_range_increments_last_byte() {
        let (_, end) = prefix_range(b"abc");
        assert_eq!(end, Bound::Excluded(b"abd".to_vec()));
    }

    #[test]
    fn prefix_range_carries_over_max_bytes() {
        let (_, end) = prefix_range(&[b'a', 0xFF, 0xFF]);
        assert_eq!(end, Bound::Excluded(vec![b'b']));
    }

    #[test]
    fn prefix_range_all_max_is_unbounded() {
        let (_, end) = prefix_range(&[0xFF, 0xFF]);
        assert_eq!(end, Bound::Unbounded);
        let (_, end) = prefix_range(b"");
        assert_eq!(end, Bound::Unbounded);
    }

    #[test]
    fn key_str_rejects_invalid_utf8() {
        let kv = KeyValue::new(Bytes::from_static(&[0xC3, 0x28]), Bytes::new());
        assert!(kv.key_str().is_none());
    }
}
