#![forbid(unsafe_code)]

//! Caller-supplied attributes attached to a signature operation.

use std::collections::BTreeMap;

/// Extra attributes keyed by dotted OID, split into the signed set
/// (covered by the signature) and the unsigned set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraAttributes {
    pub signed: BTreeMap<String, Vec<u8>>,
    pub unsigned: BTreeMap<String, Vec<u8>>,
}

impl ExtraAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signed(mut self, oid: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.signed.insert(oid.into(), value.into());
        self
    }

    pub fn with_unsigned(mut self, oid: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.unsigned.insert(oid.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.signed.is_empty() && self.unsigned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let attrs = ExtraAttributes::new()
            .with_signed("1.3.6.1.4.1.99999.1", b"policy".to_vec())
            .with_unsigned("1.3.6.1.4.1.99999.2", "note");
        assert_eq!(attrs.signed.len(), 1);
        assert_eq!(attrs.unsigned["1.3.6.1.4.1.99999.2"], b"note");
        assert!(!attrs.is_empty());
        assert!(ExtraAttributes::new().is_empty());
    }
}
