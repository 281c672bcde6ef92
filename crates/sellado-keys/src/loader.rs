#![forbid(unsafe_code)]

//! Software key and certificate loading (PEM, DER, PKCS#8, PKCS#1, SEC1).

use crate::identity::{SigningIdentity, SoftwareKey};
use sellado_core::Error;
use sellado_crypto::SigningKey;
use std::path::Path;
use std::sync::Arc;

/// Load a private key from PKCS#8 DER bytes.
///
/// Tries RSA, then EC P-256, P-384 in order.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<SigningKey, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(SigningKey::Rsa(pk));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(SigningKey::EcP256(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(SigningKey::EcP384(sk));
    }
    Err(Error::Key(
        "unsupported PKCS#8 private key (tried RSA, P-256, P-384)".into(),
    ))
}

/// Load a private key from a DER file of unknown flavour.
pub fn load_private_key_der(der: &[u8]) -> Result<SigningKey, Error> {
    if let Ok(key) = load_private_key_pkcs8_der(der) {
        return Ok(key);
    }
    use pkcs1::DecodeRsaPrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(SigningKey::Rsa(pk));
    }
    if let Ok(sk) = p256::SecretKey::from_sec1_der(der) {
        return Ok(SigningKey::EcP256(sk.into()));
    }
    if let Ok(sk) = p384::SecretKey::from_sec1_der(der) {
        return Ok(SigningKey::EcP384(sk.into()));
    }
    Err(Error::Key("unable to auto-detect private key format from DER data".into()))
}

/// Load a private key from PEM data.
///
/// `ENCRYPTED PRIVATE KEY` blocks need a password; `PRIVATE KEY`,
/// `RSA PRIVATE KEY` and `EC PRIVATE KEY` blocks are read directly.
pub fn load_private_key_pem(pem_data: &[u8], password: Option<&str>) -> Result<SigningKey, Error> {
    let (label, der_bytes) = pem_rfc7468::decode_vec(trim_ascii(pem_data))
        .map_err(|e| Error::Key(format!("failed to decode private key PEM: {e}")))?;
    match label {
        "ENCRYPTED PRIVATE KEY" => {
            let password = password
                .ok_or_else(|| Error::Key("encrypted private key requires a password".into()))?;
            load_encrypted_pkcs8_der(&der_bytes, password)
        }
        "PRIVATE KEY" => load_private_key_pkcs8_der(&der_bytes),
        "RSA PRIVATE KEY" | "EC PRIVATE KEY" => load_private_key_der(&der_bytes),
        _ => Err(Error::Key(format!("unsupported PEM label: {label}"))),
    }
}

fn load_encrypted_pkcs8_der(der_bytes: &[u8], password: &str) -> Result<SigningKey, Error> {
    use pkcs8::der::Decode;
    let enc_pki = pkcs8::EncryptedPrivateKeyInfo::from_der(der_bytes)
        .map_err(|e| Error::Key(format!("invalid encrypted PKCS#8 structure: {e}")))?;
    let doc = enc_pki
        .decrypt(password)
        .map_err(|e| Error::Key(format!("failed to decrypt private key: {e}")))?;
    load_private_key_pkcs8_der(doc.as_bytes())
}

/// Load a private key from a file, PEM or DER.
pub fn load_private_key_file(path: &Path, password: Option<&str>) -> Result<SigningKey, Error> {
    let data = read(path)?;
    if data.starts_with(b"-----BEGIN") {
        load_private_key_pem(&data, password)
    } else {
        load_private_key_der(&data)
    }
}

/// Load every certificate in `data`: one or more PEM `CERTIFICATE`
/// blocks, or a single DER certificate. Order is preserved.
pub fn load_certificates(data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    if !data.starts_with(b"-----BEGIN") {
        crate::x509::parse_certificate(data)?;
        return Ok(vec![data.to_vec()]);
    }

    let text = std::str::from_utf8(data)
        .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;
    let mut certs = Vec::new();
    for block in pem_blocks(text) {
        let (label, der_bytes) = pem_rfc7468::decode_vec(block.as_bytes())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        if label != "CERTIFICATE" {
            continue;
        }
        crate::x509::parse_certificate(&der_bytes)?;
        certs.push(der_bytes);
    }
    if certs.is_empty() {
        return Err(Error::Certificate("no CERTIFICATE block found".into()));
    }
    Ok(certs)
}

pub fn load_certificates_file(path: &Path) -> Result<Vec<Vec<u8>>, Error> {
    load_certificates(&read(path)?)
}

/// Build a software-backed identity from a key file and a certificate
/// chain file (leaf first).
pub fn load_identity(
    key_path: &Path,
    chain_path: &Path,
    password: Option<&str>,
) -> Result<SigningIdentity, Error> {
    let key = load_private_key_file(key_path, password)?;
    let chain = load_certificates_file(chain_path)?;
    let leaf = crate::x509::parse_certificate(&chain[0])?;
    if !crate::x509::key_matches_certificate(&key, &leaf)? {
        return Err(Error::Key(format!(
            "private key {} does not match certificate {}",
            key_path.display(),
            chain_path.display()
        )));
    }
    SigningIdentity::new(Arc::new(SoftwareKey::new(key)?), chain)
}

fn read(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::Key(format!("{}: {e}", path.display())))
}

fn trim_ascii(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    let end = data.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &data[start..end]
}

/// Split a PEM bundle into its `-----BEGIN ...-----END ...-----` blocks.
fn pem_blocks(text: &str) -> Vec<&str> {
    const BEGIN: &str = "-----BEGIN ";
    const END: &str = "-----END ";
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(BEGIN) {
        let tail = &rest[start..];
        let Some(end) = tail.find(END) else {
            break;
        };
        let after_end = end + END.len();
        let close = tail[after_end..]
            .find("-----")
            .map_or(tail.len(), |i| after_end + i + 5);
        blocks.push(&tail[..close]);
        rest = &tail[close..];
    }
    blocks
}
