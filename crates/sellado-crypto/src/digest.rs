#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use digest::Digest;
use sellado_core::DigestAlgorithm;

/// Incremental hashing over one of the supported digest algorithms.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
    fn algorithm(&self) -> DigestAlgorithm;
}

/// Create an incremental hasher.
pub fn hasher(algorithm: DigestAlgorithm) -> Box<dyn Hasher> {
    match algorithm {
        DigestAlgorithm::Sha1 => Box::new(Sha1Hasher::new()),
        DigestAlgorithm::Sha224 => Box::new(Sha224Hasher::new()),
        DigestAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
        DigestAlgorithm::Sha384 => Box::new(Sha384Hasher::new()),
        DigestAlgorithm::Sha512 => Box::new(Sha512Hasher::new()),
    }
}

/// Compute a digest in one shot.
pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut h = hasher(algorithm);
    h.update(data);
    h.finalize()
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_hasher {
    ($name:ident, $hasher:ty, $alg:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl Hasher for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn algorithm(&self) -> DigestAlgorithm {
                $alg
            }
        }
    };
}

impl_hasher!(Sha1Hasher, sha1::Sha1, DigestAlgorithm::Sha1);
impl_hasher!(Sha224Hasher, sha2::Sha224, DigestAlgorithm::Sha224);
impl_hasher!(Sha256Hasher, sha2::Sha256, DigestAlgorithm::Sha256);
impl_hasher!(Sha384Hasher, sha2::Sha384, DigestAlgorithm::Sha384);
impl_hasher!(Sha512Hasher, sha2::Sha512, DigestAlgorithm::Sha512);

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256() {
        let result = digest(DigestAlgorithm::Sha256, b"hello");
        assert_eq!(
            hex(&result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha1() {
        let result = digest(DigestAlgorithm::Sha1, b"hello");
        assert_eq!(hex(&result), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_output_lengths_match_algorithm() {
        for alg in DigestAlgorithm::ALL {
            assert_eq!(digest(alg, b"hello").len(), alg.output_len(), "{alg}");
        }
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut h = hasher(DigestAlgorithm::Sha512);
        h.update(b"hel");
        h.update(b"lo");
        assert_eq!(h.algorithm(), DigestAlgorithm::Sha512);
        assert_eq!(h.finalize(), digest(DigestAlgorithm::Sha512, b"hello"));
    }
}
