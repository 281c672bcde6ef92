#![forbid(unsafe_code)]

//! SignerInfo assembly shared by the content signer and the
//! counter-signer.

use crate::attr::{self, encoding_error, malformed, to_any};
use cms::cert::IssuerAndSerialNumber;
use cms::content_info::CmsVersion;
use cms::signed_data::{SignerIdentifier, SignerInfo};
use der::asn1::{Null, ObjectIdentifier, OctetString};
use der::Encode;
use sellado_core::{DigestAlgorithm, Error, ExtraAttributes, KeyAlgorithm, SignatureAlgorithm};
use sellado_crypto::EcdsaEncoding;
use sellado_keys::SigningIdentity;
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

/// issuerAndSerialNumber of `cert`.
pub fn signer_identifier(cert: &Certificate) -> SignerIdentifier {
    SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: cert.tbs_certificate.issuer.clone(),
        serial_number: cert.tbs_certificate.serial_number.clone(),
    })
}

pub fn digest_algorithm_identifier(digest: DigestAlgorithm) -> Result<AlgorithmIdentifierOwned, Error> {
    attr::algorithm_identifier(digest.oid())
}

/// The signatureAlgorithm field. RSA identifiers carry NULL parameters,
/// ECDSA identifiers none.
pub fn signature_algorithm_identifier(
    algorithm: SignatureAlgorithm,
) -> Result<AlgorithmIdentifierOwned, Error> {
    let mut id = attr::algorithm_identifier(algorithm.cms_oid())?;
    if algorithm.key == KeyAlgorithm::Rsa {
        id.parameters = Some(to_any(&Null)?);
    }
    Ok(id)
}

/// Sign `signed` (mandatory attributes followed by the caller's extras)
/// with `identity` and wrap the result in a version 1 SignerInfo.
///
/// `reserved` lists the attribute types the caller's extras may not
/// override.
pub fn build_signer_info(
    identity: &SigningIdentity,
    digest: DigestAlgorithm,
    mut signed: Vec<Attribute>,
    reserved: &[ObjectIdentifier],
    extra: &ExtraAttributes,
) -> Result<SignerInfo, Error> {
    signed.extend(attr::extra_attributes(&extra.signed, reserved)?);
    let signed_attrs = attr::attribute_set(signed)?;
    let to_be_signed = signed_attrs
        .to_der()
        .map_err(encoding_error("signed attributes"))?;

    let algorithm = identity.signature_algorithm(digest);
    let signature = identity.sign(digest, &to_be_signed, EcdsaEncoding::Der)?;
    log::debug!(
        "signed {} bytes of attributes with {algorithm}",
        to_be_signed.len()
    );

    let unsigned = attr::extra_attributes(&extra.unsigned, &[])?;
    let unsigned_attrs = if unsigned.is_empty() {
        None
    } else {
        Some(attr::attribute_set(unsigned)?)
    };

    Ok(SignerInfo {
        version: CmsVersion::V1,
        sid: signer_identifier(identity.certificate()),
        digest_alg: digest_algorithm_identifier(digest)?,
        signed_attrs: Some(signed_attrs),
        signature_algorithm: signature_algorithm_identifier(algorithm)?,
        signature: OctetString::new(signature).map_err(encoding_error("signature value"))?,
        unsigned_attrs,
    })
}

/// DER of the signed-attribute SET, the bytes a signature covers.
pub fn signed_attributes_der(info: &SignerInfo) -> Result<Vec<u8>, Error> {
    let attrs = info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| Error::MalformedContainer("signer carries no signed attributes".into()))?;
    attrs.to_der().map_err(malformed("signed attributes"))
}

pub fn digest_algorithm(info: &SignerInfo) -> Result<DigestAlgorithm, Error> {
    DigestAlgorithm::from_oid(&info.digest_alg.oid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_algorithm_parameters() {
        let rsa = signature_algorithm_identifier(SignatureAlgorithm::new(
            DigestAlgorithm::Sha256,
            KeyAlgorithm::Rsa,
        ))
        .unwrap();
        assert_eq!(rsa.oid.to_string(), "1.2.840.113549.1.1.11");
        assert!(rsa.parameters.is_some());

        let ec = signature_algorithm_identifier(SignatureAlgorithm::new(
            DigestAlgorithm::Sha384,
            KeyAlgorithm::EcP256,
        ))
        .unwrap();
        assert_eq!(ec.oid.to_string(), "1.2.840.10045.4.3.3");
        assert!(ec.parameters.is_none());
    }

    #[test]
    fn test_build_signer_info() {
        let identity = crate::testutil::identity("signer-rsa");
        let info = build_signer_info(
            &identity,
            DigestAlgorithm::Sha256,
            vec![attr::message_digest(&[1u8; 32]).unwrap()],
            &[crate::oid::MESSAGE_DIGEST],
            &ExtraAttributes::new().with_unsigned("1.3.6.1.4.1.99999.9", b"note".to_vec()),
        )
        .unwrap();
        assert_eq!(info.version, CmsVersion::V1);
        assert_eq!(info.signature.as_bytes().len(), 256);
        assert_eq!(info.unsigned_attrs.as_ref().map(|a| a.len()), Some(1));
        assert_eq!(digest_algorithm(&info).unwrap(), DigestAlgorithm::Sha256);

        let der = signed_attributes_der(&info).unwrap();
        assert_eq!(der[0], 0x31);
    }
}
