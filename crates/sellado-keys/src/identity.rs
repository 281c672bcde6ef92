#![forbid(unsafe_code)]

//! Private-key handles and signing identities.

use sellado_core::{DigestAlgorithm, Error, KeyAlgorithm, SignatureAlgorithm};
use sellado_crypto::{EcdsaEncoding, SigningKey};
use std::sync::Arc;
use x509_cert::Certificate;

/// A private key the engine can sign with but never reads.
///
/// Implementations may block (smart cards, remote HSMs). They are shared
/// across threads running a batch, hence `Send + Sync`.
pub trait PrivateKeyHandle: Send + Sync {
    fn algorithm(&self) -> KeyAlgorithm;

    /// Hash `data` with `digest` and sign the result.
    fn sign(
        &self,
        digest: DigestAlgorithm,
        data: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<Vec<u8>, Error>;
}

/// A private key held in memory.
pub struct SoftwareKey {
    key: SigningKey,
}

impl SoftwareKey {
    pub fn new(key: SigningKey) -> Result<Self, Error> {
        if !key.is_private() {
            return Err(Error::Key(format!("{key:?} is not a private key")));
        }
        Ok(Self { key })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl std::fmt::Debug for SoftwareKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKey").field("key", &self.key).finish()
    }
}

impl PrivateKeyHandle for SoftwareKey {
    fn algorithm(&self) -> KeyAlgorithm {
        self.key.algorithm()
    }

    fn sign(
        &self,
        digest: DigestAlgorithm,
        data: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<Vec<u8>, Error> {
        sellado_crypto::sign::sign(&self.key, digest, data, encoding)
    }
}

/// A private key together with its certificate chain, leaf first.
#[derive(Clone)]
pub struct SigningIdentity {
    key: Arc<dyn PrivateKeyHandle>,
    chain: Vec<Vec<u8>>,
    certificate: Certificate,
}

impl SigningIdentity {
    /// Bind a key handle to a DER certificate chain.
    ///
    /// The chain must hold at least the signer's own certificate.
    pub fn new(key: Arc<dyn PrivateKeyHandle>, chain: Vec<Vec<u8>>) -> Result<Self, Error> {
        let leaf = chain
            .first()
            .ok_or_else(|| Error::Certificate("signing identity has no certificate".into()))?;
        let certificate = crate::x509::parse_certificate(leaf)?;
        Ok(Self {
            key,
            chain,
            certificate,
        })
    }

    pub fn key(&self) -> &dyn PrivateKeyHandle {
        self.key.as_ref()
    }

    /// DER encoding of the signer certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.chain[0]
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    pub fn signature_algorithm(&self, digest: DigestAlgorithm) -> SignatureAlgorithm {
        SignatureAlgorithm::new(digest, self.key.algorithm())
    }

    /// Sign through the key handle, reporting failures as signing errors.
    pub fn sign(
        &self,
        digest: DigestAlgorithm,
        data: &[u8],
        encoding: EcdsaEncoding,
    ) -> Result<Vec<u8>, Error> {
        self.key.sign(digest, data, encoding).map_err(|e| match e {
            Error::Signing(_) => e,
            other => Error::Signing(other.to_string()),
        })
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("subject", &self.certificate.tbs_certificate.subject.to_string())
            .field("algorithm", &self.key.algorithm())
            .field("chain_len", &self.chain.len())
            .finish()
    }
}
