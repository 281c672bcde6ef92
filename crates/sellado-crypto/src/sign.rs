#![forbid(unsafe_code)]

//! Signature algorithm implementations (RSA PKCS#1 v1.5, ECDSA).
//!
//! The digest is a runtime choice, so a single entry point dispatches on
//! the key variant and the [`DigestAlgorithm`].

use sellado_core::{DigestAlgorithm, Error, KeyAlgorithm};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use signature::SignatureEncoding;

/// Key material for signature operations.
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::SigningKey),
    EcP384Public(p384::ecdsa::VerifyingKey),
}

impl SigningKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Rsa(_) | Self::RsaPublic(_) => KeyAlgorithm::Rsa,
            Self::EcP256(_) | Self::EcP256Public(_) => KeyAlgorithm::EcP256,
            Self::EcP384(_) | Self::EcP384Public(_) => KeyAlgorithm::EcP384,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Rsa(_) | Self::EcP256(_) | Self::EcP384(_))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Rsa(_) => "Rsa(private)",
            Self::RsaPublic(_) => "Rsa(public)",
            Self::EcP256(_) => "EcP256(private)",
            Self::EcP256Public(_) => "EcP256(public)",
            Self::EcP384(_) => "EcP384(private)",
            Self::EcP384Public(_) => "EcP384(public)",
        };
        f.write_str(kind)
    }
}

/// How ECDSA signature values are serialized.
///
/// CMS carries the DER `Ecdsa-Sig-Value`; XML-DSig carries `r || s`.
/// RSA signatures are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaEncoding {
    Der,
    Concatenated,
}

/// Sign `data` with `key`, hashing it with `digest` first.
pub fn sign(
    key: &SigningKey,
    digest: DigestAlgorithm,
    data: &[u8],
    encoding: EcdsaEncoding,
) -> Result<Vec<u8>, Error> {
    match key {
        SigningKey::Rsa(pk) => rsa_sign(pk, digest, data),
        SigningKey::EcP256(sk) => {
            let prehash = crate::digest::digest(digest, data);
            let sig: p256::ecdsa::Signature = sk
                .sign_prehash(&prehash)
                .map_err(|e| Error::Signing(format!("P-256 signing failed: {e}")))?;
            Ok(match encoding {
                EcdsaEncoding::Der => sig.to_der().to_vec(),
                EcdsaEncoding::Concatenated => sig.to_bytes().to_vec(),
            })
        }
        SigningKey::EcP384(sk) => {
            let prehash = crate::digest::digest(digest, data);
            let sig: p384::ecdsa::Signature = sk
                .sign_prehash(&prehash)
                .map_err(|e| Error::Signing(format!("P-384 signing failed: {e}")))?;
            Ok(match encoding {
                EcdsaEncoding::Der => sig.to_der().to_vec(),
                EcdsaEncoding::Concatenated => sig.to_bytes().to_vec(),
            })
        }
        SigningKey::RsaPublic(_) | SigningKey::EcP256Public(_) | SigningKey::EcP384Public(_) => {
            Err(Error::Key("private key required for signing".into()))
        }
    }
}

/// Verify `signature` over `data`.
///
/// A signature value that cannot be decoded at all is an error; a
/// well-formed value that does not match yields `Ok(false)`.
pub fn verify(
    key: &SigningKey,
    digest: DigestAlgorithm,
    data: &[u8],
    signature: &[u8],
    encoding: EcdsaEncoding,
) -> Result<bool, Error> {
    match key {
        SigningKey::Rsa(pk) => rsa_verify(&pk.to_public_key(), digest, data, signature),
        SigningKey::RsaPublic(pk) => rsa_verify(pk, digest, data, signature),
        SigningKey::EcP256(sk) => p256_verify(sk.verifying_key(), digest, data, signature, encoding),
        SigningKey::EcP256Public(vk) => p256_verify(vk, digest, data, signature, encoding),
        SigningKey::EcP384(sk) => p384_verify(sk.verifying_key(), digest, data, signature, encoding),
        SigningKey::EcP384Public(vk) => p384_verify(vk, digest, data, signature, encoding),
    }
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

fn rsa_sign(
    private_key: &rsa::RsaPrivateKey,
    digest: DigestAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    use signature::Signer;
    macro_rules! do_sign {
        ($hasher:ty) => {{
            let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
            let sig = sk
                .try_sign(data)
                .map_err(|e| Error::Signing(format!("RSA signing failed: {e}")))?;
            Ok(sig.to_vec())
        }};
    }
    match digest {
        DigestAlgorithm::Sha1 => do_sign!(sha1::Sha1),
        DigestAlgorithm::Sha224 => do_sign!(sha2::Sha224),
        DigestAlgorithm::Sha256 => do_sign!(sha2::Sha256),
        DigestAlgorithm::Sha384 => do_sign!(sha2::Sha384),
        DigestAlgorithm::Sha512 => do_sign!(sha2::Sha512),
    }
}

fn rsa_verify(
    public_key: &rsa::RsaPublicKey,
    digest: DigestAlgorithm,
    data: &[u8],
    sig_bytes: &[u8],
) -> Result<bool, Error> {
    use signature::Verifier;
    let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
        .map_err(|e| Error::Signing(format!("invalid RSA signature: {e}")))?;
    macro_rules! do_verify {
        ($hasher:ty) => {{
            let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
            Ok(vk.verify(data, &sig).is_ok())
        }};
    }
    match digest {
        DigestAlgorithm::Sha1 => do_verify!(sha1::Sha1),
        DigestAlgorithm::Sha224 => do_verify!(sha2::Sha224),
        DigestAlgorithm::Sha256 => do_verify!(sha2::Sha256),
        DigestAlgorithm::Sha384 => do_verify!(sha2::Sha384),
        DigestAlgorithm::Sha512 => do_verify!(sha2::Sha512),
    }
}

// ── ECDSA ────────────────────────────────────────────────────────────

fn p256_verify(
    vk: &p256::ecdsa::VerifyingKey,
    digest: DigestAlgorithm,
    data: &[u8],
    sig_bytes: &[u8],
    encoding: EcdsaEncoding,
) -> Result<bool, Error> {
    let sig = match encoding {
        EcdsaEncoding::Der => p256::ecdsa::Signature::from_der(sig_bytes),
        EcdsaEncoding::Concatenated => p256::ecdsa::Signature::from_slice(sig_bytes),
    }
    .map_err(|e| Error::Signing(format!("invalid P-256 signature: {e}")))?;
    let prehash = crate::digest::digest(digest, data);
    Ok(vk.verify_prehash(&prehash, &sig).is_ok())
}

fn p384_verify(
    vk: &p384::ecdsa::VerifyingKey,
    digest: DigestAlgorithm,
    data: &[u8],
    sig_bytes: &[u8],
    encoding: EcdsaEncoding,
) -> Result<bool, Error> {
    let sig = match encoding {
        EcdsaEncoding::Der => p384::ecdsa::Signature::from_der(sig_bytes),
        EcdsaEncoding::Concatenated => p384::ecdsa::Signature::from_slice(sig_bytes),
    }
    .map_err(|e| Error::Signing(format!("invalid P-384 signature: {e}")))?;
    let prehash = crate::digest::digest(digest, data);
    Ok(vk.verify_prehash(&prehash, &sig).is_ok())
}

/// Re-encode a DER ECDSA signature as `r || s`.
pub fn ecdsa_der_to_concatenated(key: KeyAlgorithm, der: &[u8]) -> Result<Vec<u8>, Error> {
    match key {
        KeyAlgorithm::EcP256 => p256::ecdsa::Signature::from_der(der)
            .map(|s| s.to_bytes().to_vec())
            .map_err(|e| Error::Signing(format!("invalid P-256 signature: {e}"))),
        KeyAlgorithm::EcP384 => p384::ecdsa::Signature::from_der(der)
            .map(|s| s.to_bytes().to_vec())
            .map_err(|e| Error::Signing(format!("invalid P-384 signature: {e}"))),
        KeyAlgorithm::Rsa => Ok(der.to_vec()),
    }
}
