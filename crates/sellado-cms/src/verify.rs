#![forbid(unsafe_code)]

//! Signature verification for every signer of a container.

use crate::attr;
use crate::container::SignedContainer;
use crate::signer_info::{digest_algorithm, signed_attributes_der};
use crate::tree::{node_at, PreOrder, SignerInfoNode};
use sellado_core::{Error, KeyAlgorithm};
use sellado_crypto::EcdsaEncoding;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSigner {
    pub index: usize,
    pub path: Vec<usize>,
    pub subject: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyResult {
    Valid(Vec<VerifiedSigner>),
    /// The first signer, in pre-order, that failed.
    Invalid { index: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn verified(&self) -> &[VerifiedSigner] {
        match self {
            Self::Valid(signers) => signers,
            Self::Invalid { .. } => &[],
        }
    }
}

/// Verify every signer and counter-signer of `container`.
///
/// Content signers are checked against `detached` or, failing that,
/// the encapsulated content. With neither available only their
/// signatures are checked. Counter-signers are checked against the
/// signature value of the signer they counter-sign.
pub fn verify(container: &SignedContainer, detached: Option<&[u8]>) -> Result<VerifyResult, Error> {
    let embedded = container.content()?;
    let content = detached.or(embedded.as_deref());
    let roots = container.roots()?;
    let order = PreOrder::of(&roots);

    let mut verified = Vec::with_capacity(order.len());
    for (index, path) in order.iter() {
        let node = node_at(&roots, path)
            .ok_or_else(|| Error::MalformedContainer(format!("signer {index} vanished")))?;
        let covered = match path.len() {
            1 => content,
            n => node_at(&roots, &path[..n - 1]).map(SignerInfoNode::signature),
        };
        if let Some(reason) = check(container, node, covered)? {
            log::debug!("signer {index} failed verification: {reason}");
            return Ok(VerifyResult::Invalid { index, reason });
        }
        verified.push(VerifiedSigner {
            index,
            path: path.to_vec(),
            subject: container
                .find_certificate(node.sid())
                .and_then(sellado_keys::x509::common_name),
        });
    }
    Ok(VerifyResult::Valid(verified))
}

/// `None` when `node` verifies, otherwise the reason it does not.
fn check(
    container: &SignedContainer,
    node: &SignerInfoNode,
    covered: Option<&[u8]>,
) -> Result<Option<String>, Error> {
    let info = node.signer_info();
    let digest = digest_algorithm(info)?;
    let attrs = info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| Error::MalformedContainer("signer carries no signed attributes".into()))?;
    let Some(message_digest) = attr::read_message_digest(attrs)? else {
        return Ok(Some("messageDigest attribute missing".into()));
    };
    if let Some(covered) = covered {
        if sellado_crypto::digest(digest, covered) != message_digest {
            return Ok(Some("messageDigest does not match the signed content".into()));
        }
    }

    let Some(cert) = container.find_certificate(node.sid()) else {
        return Ok(Some("signer certificate not found in the container".into()));
    };
    let key = sellado_keys::x509::public_key(cert)?;
    let sig_oid = info.signature_algorithm.oid.to_string();
    let is_rsa = KeyAlgorithm::is_rsa_signature_oid(&sig_oid)
        .ok_or_else(|| Error::UnknownAlgorithm(format!("signature algorithm {sig_oid}")))?;
    if is_rsa != (key.algorithm() == KeyAlgorithm::Rsa) {
        return Ok(Some(format!(
            "signature algorithm {sig_oid} does not match the {:?} certificate key",
            key.algorithm()
        )));
    }

    let signed = signed_attributes_der(info)?;
    let ok = sellado_crypto::sign::verify(
        &key,
        digest,
        &signed,
        node.signature(),
        EcdsaEncoding::Der,
    )
    .unwrap_or(false);
    Ok((!ok).then(|| "signature does not verify".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{sign_data, CmsSignParameters};
    use crate::testutil;
    use sellado_core::SignMode;

    #[test]
    fn test_openssl_fixture_verifies() {
        let container = testutil::fixture_container();
        let report = verify(&container, None).unwrap();
        assert_eq!(report.verified().len(), 1);
        assert_eq!(report.verified()[0].subject.as_deref(), Some("Primary Signer"));
    }

    #[test]
    fn test_detached_content_mismatch() {
        let identity = testutil::identity("signer-p256");
        let params = CmsSignParameters::new(crate::CmsProfile::Cms, SignMode::Explicit);
        let der = sign_data(b"original", &identity, &params).unwrap();
        let container = SignedContainer::decode(&der).unwrap();

        assert!(verify(&container, Some(b"original")).unwrap().is_valid());
        assert!(matches!(
            verify(&container, Some(b"tampered")).unwrap(),
            VerifyResult::Invalid { index: 0, .. }
        ));
    }

    #[test]
    fn test_missing_certificate() {
        let identity = testutil::identity("signer-rsa");
        let der = sign_data(b"x", &identity, &CmsSignParameters::default()).unwrap();
        let mut container = SignedContainer::decode(&der).unwrap();
        let mut signed_data = container.signed_data().clone();
        signed_data.certificates = None;
        container = SignedContainer::new(signed_data);
        let report = verify(&container, None).unwrap();
        assert!(!report.is_valid());
        assert!(report.verified().is_empty());
    }
}
