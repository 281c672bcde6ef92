#![forbid(unsafe_code)]

//! Signers for the six XAdES and XML-DSig formats.

use crate::{SignRequest, Signer};
use sellado_core::{CounterSignTarget, Error, SignatureFormat};
use sellado_xades::{XmlLayout, XmlSigner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlFormatSigner {
    format: SignatureFormat,
    inner: XmlSigner,
}

impl XmlFormatSigner {
    /// The signer of an XML `format`, `None` for the other formats.
    pub fn for_format(format: SignatureFormat) -> Option<Self> {
        let layout = match format {
            SignatureFormat::XadesDetached | SignatureFormat::XmlDsigDetached => XmlLayout::Detached,
            SignatureFormat::XadesEnveloping | SignatureFormat::XmlDsigEnveloping => {
                XmlLayout::Enveloping
            }
            SignatureFormat::XadesEnveloped | SignatureFormat::XmlDsigEnveloped => {
                XmlLayout::Enveloped
            }
            _ => return None,
        };
        Some(Self {
            format,
            inner: XmlSigner::new(layout, format.is_xades()),
        })
    }
}

impl Signer for XmlFormatSigner {
    fn format(&self) -> SignatureFormat {
        self.format
    }

    fn sign_data(&self, data: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        if !request.extra.is_empty() {
            log::warn!("{}: extra attributes only apply to CMS signatures, ignoring them", self.format);
        }
        self.inner
            .sign_data(data, request.mode, request.identity, request.digest_algorithm, &request.xml)
    }

    fn sign_hash(&self, hash: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        let hash_algorithm = request.hash_algorithm_for(hash)?;
        self.inner.sign_hash(
            hash,
            hash_algorithm,
            request.identity,
            request.digest_algorithm,
            &request.xml,
        )
    }

    fn counter_sign(
        &self,
        sign: &[u8],
        target: &CounterSignTarget,
        request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        self.inner
            .counter_sign(sign, target, request.identity, request.digest_algorithm, &request.xml)
    }
}
