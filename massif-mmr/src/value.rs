//! The 32-byte value type shared by every node, leaf, key, and peak in the
//! system, plus the SHA-256 primitives used to combine them.

use std::fmt;

use sha2::{Digest, Sha256};

/// A fixed-width 32-byte value.
///
/// Every MMR node, leaf hash, peak, side-trie key, and auxiliary field is
/// exactly this width — there are no variable-length node values anywhere
/// in the massif layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Value(pub [u8; 32]);

impl Value {
    /// The all-zero value, used for uninitialized slots.
    pub const ZERO: Value = Value([0u8; 32]);

    /// Wrap a byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Value(bytes)
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Build a `Value` from a slice, failing if the length isn't 32.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Value(arr))
    }
}

impl From<[u8; 32]> for Value {
    fn from(bytes: [u8; 32]) -> Self {
        Value(bytes)
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", hex::encode(self.0))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// `SHA-256(data)`, as a [`Value`].
pub fn sha256(data: &[u8]) -> Value {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    Value(out.into())
}

/// `SHA-256(left || right)` — the MMR interior-node promotion rule: combine
/// the right child just appended with its left sibling. No domain-separation
/// tag is prepended; leaves and internal nodes share the same hash domain.
pub fn merge(left: &Value, right: &Value) -> Value {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let out = hasher.finalize();
    Value(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_order_sensitive() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert_ne!(merge(&a, &b), merge(&b, &a));
    }

    #[test]
    fn zero_value_is_all_zero_bytes() {
        assert!(Value::ZERO.is_zero());
        assert!(!sha256(b"x").is_zero());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(Value::from_slice(&[0u8; 31]).is_none());
        assert!(Value::from_slice(&[0u8; 32]).is_some());
    }
}
