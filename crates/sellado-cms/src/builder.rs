#![forbid(unsafe_code)]

//! SignedData production for CMS and CAdES.

use crate::attr::{self, encoding_error, to_any};
use crate::container::SignedContainer;
use crate::oid;
use crate::signer_info::{build_signer_info, digest_algorithm_identifier};
use cms::cert::CertificateChoices;
use cms::content_info::CmsVersion;
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerInfos,
};
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec};
use sellado_core::{DigestAlgorithm, Error, ExtraAttributes, SignMode};
use sellado_keys::SigningIdentity;
use std::time::SystemTime;

/// Which attribute profile a container is produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmsProfile {
    /// Plain CMS: contentType, signingTime, messageDigest.
    #[default]
    Cms,
    /// CAdES-BES: CMS plus ESS signing-certificate-v2.
    Cades,
}

#[derive(Debug, Clone)]
pub struct CmsSignParameters {
    pub profile: CmsProfile,
    pub mode: SignMode,
    pub digest_algorithm: DigestAlgorithm,
    pub extra: ExtraAttributes,
}

impl Default for CmsSignParameters {
    fn default() -> Self {
        Self {
            profile: CmsProfile::Cms,
            mode: SignMode::Implicit,
            digest_algorithm: DigestAlgorithm::Sha256,
            extra: ExtraAttributes::default(),
        }
    }
}

impl CmsSignParameters {
    pub fn new(profile: CmsProfile, mode: SignMode) -> Self {
        Self {
            profile,
            mode,
            ..Self::default()
        }
    }

    pub fn with_digest_algorithm(mut self, digest: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest;
        self
    }

    pub fn with_extra(mut self, extra: ExtraAttributes) -> Self {
        self.extra = extra;
        self
    }
}

/// Attribute types the signer always writes itself.
const RESERVED: [ObjectIdentifier; 4] = [
    oid::CONTENT_TYPE,
    oid::SIGNING_TIME,
    oid::MESSAGE_DIGEST,
    oid::SIGNING_CERTIFICATE_V2,
];

/// Sign `data`, embedding it when the mode is implicit.
pub fn sign_data(
    data: &[u8],
    identity: &SigningIdentity,
    params: &CmsSignParameters,
) -> Result<Vec<u8>, Error> {
    let digest = params.digest_algorithm;
    let message_digest = sellado_crypto::digest(digest, data);
    let econtent = match params.mode {
        SignMode::Implicit => {
            let octets = OctetString::new(data).map_err(encoding_error("content"))?;
            Some(to_any(&octets)?)
        }
        SignMode::Explicit => None,
    };
    log::debug!(
        "producing {:?} {} SignedData over {} bytes with {digest}",
        params.profile,
        params.mode,
        data.len()
    );
    build(econtent, &message_digest, digest, identity, params)?.encode()
}

/// Sign a precomputed digest of the content. The container never
/// embeds content, whatever the configured mode.
pub fn sign_hash(
    hash: &[u8],
    hash_algorithm: DigestAlgorithm,
    identity: &SigningIdentity,
    params: &CmsSignParameters,
) -> Result<Vec<u8>, Error> {
    if hash.len() != hash_algorithm.output_len() {
        return Err(Error::Configuration(format!(
            "a {hash_algorithm} digest is {} bytes, got {}",
            hash_algorithm.output_len(),
            hash.len()
        )));
    }
    log::debug!("producing {:?} SignedData over a precomputed {hash_algorithm} digest", params.profile);
    build(None, hash, hash_algorithm, identity, params)?.encode()
}

fn build(
    econtent: Option<der::Any>,
    message_digest: &[u8],
    digest: DigestAlgorithm,
    identity: &SigningIdentity,
    params: &CmsSignParameters,
) -> Result<SignedContainer, Error> {
    let mut signed = vec![
        attr::content_type(oid::ID_DATA)?,
        attr::signing_time(SystemTime::now())?,
        attr::message_digest(message_digest)?,
    ];
    if params.profile == CmsProfile::Cades {
        signed.push(attr::signing_certificate_v2(
            identity.certificate_der(),
            DigestAlgorithm::Sha256,
        )?);
    }
    let signer_info = build_signer_info(identity, digest, signed, &RESERVED, &params.extra)?;

    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier(digest)?])
            .map_err(encoding_error("digest algorithms"))?,
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: oid::ID_DATA,
            econtent,
        },
        certificates: Some(certificate_set(identity)?),
        crls: None,
        signer_infos: SignerInfos(
            SetOfVec::try_from(vec![signer_info]).map_err(encoding_error("signer infos"))?,
        ),
    };
    Ok(SignedContainer::new(signed_data))
}

/// The identity's chain with duplicates dropped.
fn certificate_set(identity: &SigningIdentity) -> Result<CertificateSet, Error> {
    let mut choices = Vec::with_capacity(identity.chain().len());
    for der in identity.chain() {
        let cert = sellado_keys::x509::parse_certificate(der)?;
        let choice = CertificateChoices::Certificate(cert);
        if !choices.contains(&choice) {
            choices.push(choice);
        }
    }
    let set = SetOfVec::try_from(choices).map_err(encoding_error("certificate set"))?;
    Ok(CertificateSet(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn single_signer(container: &SignedContainer) -> cms::signed_data::SignerInfo {
        container.signed_data().signer_infos.0.iter().next().unwrap().clone()
    }

    #[test]
    fn test_implicit_embeds_content() {
        let identity = testutil::identity("signer-rsa");
        let data = testutil::fixture_content();
        let der = sign_data(&data, &identity, &CmsSignParameters::default()).unwrap();
        let container = SignedContainer::decode(&der).unwrap();
        assert_eq!(container.content().unwrap(), Some(data.clone()));

        let info = single_signer(&container);
        let attrs = info.signed_attrs.as_ref().unwrap();
        assert_eq!(attrs.len(), 3);
        assert_eq!(
            attr::read_message_digest(attrs).unwrap(),
            Some(sellado_crypto::digest(DigestAlgorithm::Sha256, &data))
        );
        assert!(attr::find(attrs, oid::CONTENT_TYPE).is_some());
        assert!(attr::find(attrs, oid::SIGNING_TIME).is_some());
    }

    #[test]
    fn test_explicit_omits_content() {
        let identity = testutil::identity("signer-p256");
        let params = CmsSignParameters::new(CmsProfile::Cms, SignMode::Explicit)
            .with_digest_algorithm(DigestAlgorithm::Sha384);
        let der = sign_data(b"detached", &identity, &params).unwrap();
        let container = SignedContainer::decode(&der).unwrap();
        assert_eq!(container.content().unwrap(), None);
        let info = single_signer(&container);
        assert_eq!(info.digest_alg.oid.to_string(), DigestAlgorithm::Sha384.oid());
        assert_eq!(info.signature_algorithm.oid.to_string(), "1.2.840.10045.4.3.3");
        assert!(info.signature_algorithm.parameters.is_none());
    }

    #[test]
    fn test_cades_adds_signing_certificate() {
        let identity = testutil::identity("signer-rsa");
        let params = CmsSignParameters::new(CmsProfile::Cades, SignMode::Implicit);
        let der = sign_data(b"cades", &identity, &params).unwrap();
        let info = single_signer(&SignedContainer::decode(&der).unwrap());
        let attrs = info.signed_attrs.as_ref().unwrap();
        assert_eq!(attrs.len(), 4);
        assert!(attr::find(attrs, oid::SIGNING_CERTIFICATE_V2).is_some());
    }

    #[test]
    fn test_sign_hash_matches_data_digest() {
        let identity = testutil::identity("signer-rsa");
        let data = b"hash me";
        let hash = sellado_crypto::digest(DigestAlgorithm::Sha1, data);
        let der = sign_hash(&hash, DigestAlgorithm::Sha1, &identity, &CmsSignParameters::default())
            .unwrap();
        let container = SignedContainer::decode(&der).unwrap();
        assert_eq!(container.content().unwrap(), None);
        let info = single_signer(&container);
        assert_eq!(
            attr::read_message_digest(info.signed_attrs.as_ref().unwrap()).unwrap(),
            Some(hash)
        );
        assert_eq!(info.digest_alg.oid.to_string(), DigestAlgorithm::Sha1.oid());
        assert!(crate::verify::verify(&container, Some(data)).unwrap().is_valid());
    }

    #[test]
    fn test_sign_hash_length_mismatch() {
        let identity = testutil::identity("signer-rsa");
        let result = sign_hash(&[0u8; 20], DigestAlgorithm::Sha256, &identity, &CmsSignParameters::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_extra_attributes() {
        let identity = testutil::identity("signer-rsa");
        let extra = ExtraAttributes::new()
            .with_signed("1.3.6.1.4.1.99999.1", b"policy".to_vec())
            .with_unsigned("1.3.6.1.4.1.99999.2", b"note".to_vec());
        let params = CmsSignParameters::default().with_extra(extra);
        let der = sign_data(b"x", &identity, &params).unwrap();
        let info = single_signer(&SignedContainer::decode(&der).unwrap());
        assert_eq!(info.signed_attrs.as_ref().unwrap().len(), 4);
        assert_eq!(info.unsigned_attrs.as_ref().unwrap().len(), 1);

        let clash = CmsSignParameters::default().with_extra(
            ExtraAttributes::new().with_signed("1.2.840.113549.1.9.3", b"x".to_vec()),
        );
        assert!(matches!(
            sign_data(b"x", &identity, &clash),
            Err(Error::Configuration(_))
        ));
    }
}
