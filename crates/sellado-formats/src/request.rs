#![forbid(unsafe_code)]

//! Everything a signer needs besides the input bytes.

use sellado_core::{DigestAlgorithm, ExtraAttributes, SignMode};
use sellado_keys::SigningIdentity;
use sellado_xades::XmlSignatureParameters;
use std::collections::BTreeMap;

/// One signature operation's parameters. The identity is borrowed so
/// concurrent requests can share it.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    pub identity: &'a SigningIdentity,
    pub mode: SignMode,
    /// Digest the signature is computed with.
    pub digest_algorithm: DigestAlgorithm,
    /// Algorithm of a precomputed digest; inferred from its length when
    /// unset.
    pub hash_algorithm: Option<DigestAlgorithm>,
    pub extra: ExtraAttributes,
    pub xml: XmlSignatureParameters,
    /// Opaque parameters handed to document codecs.
    pub document_parameters: BTreeMap<String, String>,
}

impl<'a> SignRequest<'a> {
    pub fn new(identity: &'a SigningIdentity) -> Self {
        Self {
            identity,
            mode: SignMode::Implicit,
            digest_algorithm: DigestAlgorithm::Sha256,
            hash_algorithm: None,
            extra: ExtraAttributes::default(),
            xml: XmlSignatureParameters::default(),
            document_parameters: BTreeMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: SignMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_digest_algorithm(mut self, digest: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest;
        self
    }

    pub fn with_hash_algorithm(mut self, digest: DigestAlgorithm) -> Self {
        self.hash_algorithm = Some(digest);
        self
    }

    pub fn with_extra(mut self, extra: ExtraAttributes) -> Self {
        self.extra = extra;
        self
    }

    pub fn with_xml(mut self, xml: XmlSignatureParameters) -> Self {
        self.xml = xml;
        self
    }

    pub fn with_document_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.document_parameters.insert(key.into(), value.into());
        self
    }

    /// The algorithm of `hash`, explicit or inferred from its length.
    pub fn hash_algorithm_for(&self, hash: &[u8]) -> Result<DigestAlgorithm, sellado_core::Error> {
        match self.hash_algorithm {
            Some(alg) => Ok(alg),
            None => DigestAlgorithm::from_digest_len(hash.len()),
        }
    }
}
