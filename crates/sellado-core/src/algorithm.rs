#![forbid(unsafe_code)]

//! Digest and signature algorithm identifiers.
//!
//! Each algorithm is known by three spellings: the ASN.1 object
//! identifier used inside CMS containers, the URI that appears in
//! XML-DSig `Algorithm` attributes, and the names callers write in
//! configuration (`SHA-256`, `SHA256withRSA`).

use crate::error::Error;
use std::fmt;

// ── Digest algorithm URIs ────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

// ── Signature method URIs ────────────────────────────────────────────

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const RSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha224";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

pub const ECDSA_SHA1: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha1";
pub const ECDSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha224";
pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";
pub const ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";

// ── Canonicalization and transforms ──────────────────────────────────

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub const BASE64: &str = "http://www.w3.org/2000/09/xmldsig#base64";

/// Dotted object identifiers for the algorithms above.
pub mod oid {
    pub const SHA1: &str = "1.3.14.3.2.26";
    pub const SHA224: &str = "2.16.840.1.101.3.4.2.4";
    pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
    pub const SHA384: &str = "2.16.840.1.101.3.4.2.2";
    pub const SHA512: &str = "2.16.840.1.101.3.4.2.3";

    pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
    pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
    pub const SHA224_WITH_RSA: &str = "1.2.840.113549.1.1.14";
    pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
    pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
    pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";

    pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
    pub const ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";
    pub const ECDSA_WITH_SHA224: &str = "1.2.840.10045.4.3.1";
    pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
    pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
    pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
}

/// A message digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    pub fn oid(&self) -> &'static str {
        match self {
            Self::Sha1 => oid::SHA1,
            Self::Sha224 => oid::SHA224,
            Self::Sha256 => oid::SHA256,
            Self::Sha384 => oid::SHA384,
            Self::Sha512 => oid::SHA512,
        }
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => SHA1,
            Self::Sha224 => SHA224,
            Self::Sha256 => SHA256,
            Self::Sha384 => SHA384,
            Self::Sha512 => SHA512,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Parse `SHA1`, `SHA-1`, `sha256`, `SHA-512`, ...
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(Error::UnknownAlgorithm(format!("digest algorithm {name}"))),
        }
    }

    pub fn from_oid(oid: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.oid() == oid)
            .ok_or_else(|| Error::UnknownAlgorithm(format!("digest algorithm OID {oid}")))
    }

    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.uri() == uri)
            .ok_or_else(|| Error::UnknownAlgorithm(format!("digest algorithm URI {uri}")))
    }

    /// Guess the algorithm that produced a precomputed digest.
    ///
    /// SHA-2 wins for lengths shared with other families.
    pub fn from_digest_len(len: usize) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.output_len() == len)
            .ok_or_else(|| {
                Error::UnknownAlgorithm(format!("no digest algorithm produces {len} bytes"))
            })
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The public-key algorithm of a signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    EcP256,
    EcP384,
}

impl KeyAlgorithm {
    /// Classify a CMS `signatureAlgorithm` OID.
    ///
    /// Returns `None` for the EC family since the curve is only known
    /// from the certificate.
    pub fn is_rsa_signature_oid(oid: &str) -> Option<bool> {
        match oid {
            oid::RSA_ENCRYPTION
            | oid::SHA1_WITH_RSA
            | oid::SHA224_WITH_RSA
            | oid::SHA256_WITH_RSA
            | oid::SHA384_WITH_RSA
            | oid::SHA512_WITH_RSA => Some(true),
            oid::EC_PUBLIC_KEY
            | oid::ECDSA_WITH_SHA1
            | oid::ECDSA_WITH_SHA224
            | oid::ECDSA_WITH_SHA256
            | oid::ECDSA_WITH_SHA384
            | oid::ECDSA_WITH_SHA512 => Some(false),
            _ => None,
        }
    }

    fn family(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcP256 | Self::EcP384 => "ECDSA",
        }
    }
}

/// A signature algorithm: a digest paired with the key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAlgorithm {
    pub digest: DigestAlgorithm,
    pub key: KeyAlgorithm,
}

impl SignatureAlgorithm {
    pub fn new(digest: DigestAlgorithm, key: KeyAlgorithm) -> Self {
        Self { digest, key }
    }

    /// OID written to a CMS `SignerInfo.signatureAlgorithm`.
    pub fn cms_oid(&self) -> &'static str {
        match (self.key, self.digest) {
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha1) => oid::SHA1_WITH_RSA,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha224) => oid::SHA224_WITH_RSA,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha256) => oid::SHA256_WITH_RSA,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha384) => oid::SHA384_WITH_RSA,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha512) => oid::SHA512_WITH_RSA,
            (_, DigestAlgorithm::Sha1) => oid::ECDSA_WITH_SHA1,
            (_, DigestAlgorithm::Sha224) => oid::ECDSA_WITH_SHA224,
            (_, DigestAlgorithm::Sha256) => oid::ECDSA_WITH_SHA256,
            (_, DigestAlgorithm::Sha384) => oid::ECDSA_WITH_SHA384,
            (_, DigestAlgorithm::Sha512) => oid::ECDSA_WITH_SHA512,
        }
    }

    /// URI written to an XML-DSig `SignatureMethod`.
    pub fn xml_uri(&self) -> &'static str {
        match (self.key, self.digest) {
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha1) => RSA_SHA1,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha224) => RSA_SHA224,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha256) => RSA_SHA256,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha384) => RSA_SHA384,
            (KeyAlgorithm::Rsa, DigestAlgorithm::Sha512) => RSA_SHA512,
            (_, DigestAlgorithm::Sha1) => ECDSA_SHA1,
            (_, DigestAlgorithm::Sha224) => ECDSA_SHA224,
            (_, DigestAlgorithm::Sha256) => ECDSA_SHA256,
            (_, DigestAlgorithm::Sha384) => ECDSA_SHA384,
            (_, DigestAlgorithm::Sha512) => ECDSA_SHA512,
        }
    }

    /// Parse names such as `SHA256withRSA` or `SHA-384withECDSA`.
    ///
    /// The curve of an ECDSA name is unknown until a key is bound, so
    /// `EcP256` is returned as a placeholder for the EC family.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let lower = name.to_ascii_lowercase();
        let (digest, key) = lower
            .split_once("with")
            .ok_or_else(|| Error::UnknownAlgorithm(format!("signature algorithm {name}")))?;
        let digest = DigestAlgorithm::from_name(digest)?;
        let key = match key {
            "rsa" => KeyAlgorithm::Rsa,
            "ecdsa" | "ec" => KeyAlgorithm::EcP256,
            _ => return Err(Error::UnknownAlgorithm(format!("signature algorithm {name}"))),
        };
        Ok(Self { digest, key })
    }

    pub fn name(&self) -> String {
        format!(
            "{}with{}",
            self.digest.name().replace('-', ""),
            self.key.family()
        )
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
