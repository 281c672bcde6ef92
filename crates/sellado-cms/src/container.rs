#![forbid(unsafe_code)]

//! Decoded CMS SignedData containers.

use crate::attr::{encoding_error, malformed, to_any};
use crate::oid;
use crate::tree::{PreOrder, SignerInfoNode};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::ContentInfo;
use cms::signed_data::{CertificateSet, SignedData, SignerIdentifier, SignerInfos};
use der::asn1::{OctetString, SetOfVec};
use der::{Decode, Encode};
use sellado_core::{DigestAlgorithm, Error};
use x509_cert::Certificate;

/// A parsed SignedData, the unit every CMS operation works on.
#[derive(Clone, Debug)]
pub struct SignedContainer {
    signed_data: SignedData,
}

/// One signer of a container, as listed by [`SignedContainer::signers`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerSummary {
    /// Pre-order index, the number counter-signature targets use.
    pub index: usize,
    /// 0 for content signers, 1 for their counter-signers and so on.
    pub depth: usize,
    pub path: Vec<usize>,
    pub subject: Option<String>,
    pub serial: Option<String>,
    pub digest: Option<DigestAlgorithm>,
}

impl SignedContainer {
    pub fn new(signed_data: SignedData) -> Self {
        Self { signed_data }
    }

    /// Decode a DER ContentInfo holding SignedData.
    pub fn decode(der: &[u8]) -> Result<Self, Error> {
        let content_info = ContentInfo::from_der(der).map_err(malformed("ContentInfo"))?;
        if content_info.content_type != oid::ID_SIGNED_DATA {
            return Err(Error::MalformedContainer(format!(
                "content type {} is not signedData",
                content_info.content_type
            )));
        }
        let inner = content_info
            .content
            .to_der()
            .map_err(malformed("SignedData"))?;
        let signed_data = SignedData::from_der(&inner).map_err(malformed("SignedData"))?;
        if signed_data.signer_infos.0.is_empty() {
            return Err(Error::MalformedContainer("container has no signers".into()));
        }
        Ok(Self { signed_data })
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let content_info = ContentInfo {
            content_type: oid::ID_SIGNED_DATA,
            content: to_any(&self.signed_data)?,
        };
        content_info.to_der().map_err(encoding_error("ContentInfo"))
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// The encapsulated content, `None` for detached signatures.
    pub fn content(&self) -> Result<Option<Vec<u8>>, Error> {
        let Some(econtent) = &self.signed_data.encap_content_info.econtent else {
            return Ok(None);
        };
        let der = econtent.to_der().map_err(malformed("encapsulated content"))?;
        let octets = OctetString::from_der(&der).map_err(malformed("encapsulated content"))?;
        Ok(Some(octets.into_bytes()))
    }

    pub fn roots(&self) -> Result<Vec<SignerInfoNode>, Error> {
        self.signed_data
            .signer_infos
            .0
            .iter()
            .cloned()
            .map(SignerInfoNode::from_signer_info)
            .collect()
    }

    pub fn replace_roots(&mut self, roots: Vec<SignerInfoNode>) -> Result<(), Error> {
        let infos = roots
            .into_iter()
            .map(SignerInfoNode::into_signer_info)
            .collect::<Result<Vec<_>, _>>()?;
        let infos = SetOfVec::try_from(infos).map_err(encoding_error("signer infos"))?;
        self.signed_data.signer_infos = SignerInfos(infos);
        Ok(())
    }

    /// Every X.509 certificate carried by the container.
    pub fn certificates(&self) -> Vec<&Certificate> {
        self.signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter_map(|choice| match choice {
                CertificateChoices::Certificate(cert) => Some(cert),
                _ => None,
            })
            .collect()
    }

    /// Add `cert` unless an equal certificate is already present.
    pub fn add_certificate(&mut self, cert: Certificate) -> Result<(), Error> {
        let mut choices: Vec<CertificateChoices> = self
            .signed_data
            .certificates
            .take()
            .map(|set| set.0.into_vec())
            .unwrap_or_default();
        let candidate = CertificateChoices::Certificate(cert);
        if !choices.contains(&candidate) {
            choices.push(candidate);
        }
        let set = SetOfVec::try_from(choices).map_err(encoding_error("certificate set"))?;
        self.signed_data.certificates = Some(CertificateSet(set));
        Ok(())
    }

    /// The certificate named by a signer identifier.
    pub fn find_certificate(&self, sid: &SignerIdentifier) -> Option<&Certificate> {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer,
                serial_number,
            }) => self.certificates().into_iter().find(|cert| {
                &cert.tbs_certificate.issuer == issuer
                    && &cert.tbs_certificate.serial_number == serial_number
            }),
            SignerIdentifier::SubjectKeyIdentifier(_) => None,
        }
    }

    /// Every signer in pre-order, the numbering used by
    /// node-targeted counter-signatures.
    pub fn signers(&self) -> Result<Vec<SignerSummary>, Error> {
        let roots = self.roots()?;
        let order = PreOrder::of(&roots);
        let mut summaries = Vec::with_capacity(order.len());
        for (index, path) in order.iter() {
            let Some(node) = crate::tree::node_at(&roots, path) else {
                continue;
            };
            let cert = self.find_certificate(node.sid());
            summaries.push(SignerSummary {
                index,
                depth: path.len() - 1,
                path: path.to_vec(),
                subject: cert.and_then(sellado_keys::x509::common_name),
                serial: cert.map(sellado_keys::x509::serial_decimal),
                digest: crate::signer_info::digest_algorithm(node.signer_info()).ok(),
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_decode_openssl_fixture() {
        let container = testutil::fixture_container();
        assert_eq!(
            container.content().unwrap().as_deref(),
            Some(&testutil::fixture_content()[..])
        );
        assert_eq!(container.certificates().len(), 1);

        let signers = container.signers().unwrap();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].subject.as_deref(), Some("Primary Signer"));
        assert_eq!(signers[0].serial.as_deref(), Some("112394521950"));
        assert_eq!(signers[0].digest, Some(DigestAlgorithm::Sha256));
        assert_eq!(signers[0].depth, 0);
    }

    #[test]
    fn test_reencode_is_stable() {
        let der = std::fs::read(testutil::FIXTURE).unwrap();
        let container = SignedContainer::decode(&der).unwrap();
        assert_eq!(container.encode().unwrap(), der);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            SignedContainer::decode(b"definitely not DER"),
            Err(Error::MalformedContainer(_))
        ));
        // A ContentInfo of type id-data
        let data = ContentInfo {
            content_type: oid::ID_DATA,
            content: to_any(&OctetString::new(b"x".to_vec()).unwrap()).unwrap(),
        };
        assert!(matches!(
            SignedContainer::decode(&data.to_der().unwrap()),
            Err(Error::MalformedContainer(_))
        ));
        assert!(matches!(
            SignedContainer::decode(&[]),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_add_certificate_is_a_union() {
        let mut container = testutil::fixture_container();
        let existing = container.certificates()[0].clone();
        container.add_certificate(existing).unwrap();
        assert_eq!(container.certificates().len(), 1);

        let counter = testutil::identity("counter-rsa");
        container
            .add_certificate(counter.certificate().clone())
            .unwrap();
        assert_eq!(container.certificates().len(), 2);
    }
}
