#![forbid(unsafe_code)]

//! X.509 certificate helpers: parsing, public-key extraction, serial
//! numbers and subject names.

use der::{Decode, Encode, Tag, Tagged};
use sellado_core::Error;
use sellado_crypto::SigningKey;
use x509_cert::Certificate;

/// id-at-commonName
const COMMON_NAME: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("2.5.4.3");

/// Parse a DER-encoded certificate.
pub fn parse_certificate(der: &[u8]) -> Result<Certificate, Error> {
    Certificate::from_der(der)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))
}

/// Extract the subject public key as a verification key.
pub fn public_key(cert: &Certificate) -> Result<SigningKey, Error> {
    use spki::DecodePublicKey;

    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::RsaPublic(pk));
    }
    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::EcP256Public(vk));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(&spki_der) {
        return Ok(SigningKey::EcP384Public(vk));
    }
    Err(Error::Certificate(format!(
        "unsupported public key algorithm {}",
        cert.tbs_certificate.subject_public_key_info.algorithm.oid
    )))
}

/// The certificate serial number in decimal.
pub fn serial_decimal(cert: &Certificate) -> String {
    rsa::BigUint::from_bytes_be(cert.tbs_certificate.serial_number.as_bytes()).to_string()
}

/// The first common name of the certificate subject.
pub fn common_name(cert: &Certificate) -> Option<String> {
    cert.tbs_certificate
        .subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == COMMON_NAME)
        .and_then(|atv| match atv.value.tag() {
            Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
                std::str::from_utf8(atv.value.value()).ok().map(str::to_owned)
            }
            _ => None,
        })
}

/// True when `private` is the key certified by `cert`.
pub fn key_matches_certificate(private: &SigningKey, cert: &Certificate) -> Result<bool, Error> {
    let public = public_key(cert)?;
    Ok(match (private, &public) {
        (SigningKey::Rsa(sk), SigningKey::RsaPublic(pk)) => &sk.to_public_key() == pk,
        (SigningKey::EcP256(sk), SigningKey::EcP256Public(vk)) => sk.verifying_key() == vk,
        (SigningKey::EcP384(sk), SigningKey::EcP384Public(vk)) => sk.verifying_key() == vk,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn cert(name: &str) -> Certificate {
        let path = format!("../../test-data/keys/{name}");
        let der = crate::loader::load_certificates_file(Path::new(&path)).expect("certificate");
        parse_certificate(&der[0]).expect("parse")
    }

    #[test]
    fn test_serial_decimal() {
        assert_eq!(serial_decimal(&cert("signer-rsa.crt")), "112394521950");
        assert_eq!(serial_decimal(&cert("counter-rsa.crt")), "4660");
    }

    #[test]
    fn test_common_name() {
        assert_eq!(common_name(&cert("signer-rsa.crt")).as_deref(), Some("Primary Signer"));
        assert_eq!(common_name(&cert("signer-p256.crt")).as_deref(), Some("Elliptic Signer"));
    }

    #[test]
    fn test_public_key_algorithms() {
        assert!(matches!(public_key(&cert("signer-rsa.crt")), Ok(SigningKey::RsaPublic(_))));
        assert!(matches!(public_key(&cert("signer-p256.crt")), Ok(SigningKey::EcP256Public(_))));
    }

    #[test]
    fn test_garbage_is_certificate_error() {
        assert!(matches!(parse_certificate(b"not a cert"), Err(Error::Certificate(_))));
    }
}
