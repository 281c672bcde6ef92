#![forbid(unsafe_code)]

//! Format registry: capability checks, then dispatch to the format's
//! signer.

use crate::cms::CmsSigner;
use crate::document::{DocumentCodec, DocumentSigner};
use crate::xml::XmlFormatSigner;
use crate::{SignRequest, Signer};
use sellado_cms::CmsProfile;
use sellado_core::{CounterSignTarget, Error, SignatureFormat};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each [`SignatureFormat`] to its [`Signer`].
///
/// Every operation is validated against the format's capability table
/// before the signer runs, so signers never see an unsupported mode,
/// a digest for a document format, or a counter-signature request for
/// a format without them.
#[derive(Clone)]
pub struct FormatRegistry {
    signers: HashMap<SignatureFormat, Arc<dyn Signer>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry").field("formats", &self.formats()).finish()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// A registry with the CMS, CAdES and XML signers. Document formats
    /// need a codec, see [`register_document_codec`](Self::register_document_codec).
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CmsSigner::new(CmsProfile::Cms)));
        registry.register(Arc::new(CmsSigner::new(CmsProfile::Cades)));
        for format in SignatureFormat::ALL {
            if let Some(signer) = XmlFormatSigner::for_format(format) {
                registry.register(Arc::new(signer));
            }
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            signers: HashMap::new(),
        }
    }

    /// Register (or replace) the signer of `signer.format()`.
    pub fn register(&mut self, signer: Arc<dyn Signer>) {
        log::debug!("registering signer for {}", signer.format());
        self.signers.insert(signer.format(), signer);
    }

    pub fn register_document_codec(
        &mut self,
        format: SignatureFormat,
        codec: Arc<dyn DocumentCodec>,
    ) -> Result<(), Error> {
        self.register(Arc::new(DocumentSigner::new(format, codec)?));
        Ok(())
    }

    /// Registered formats, in [`SignatureFormat::ALL`] order.
    pub fn formats(&self) -> Vec<SignatureFormat> {
        SignatureFormat::ALL
            .into_iter()
            .filter(|f| self.signers.contains_key(f))
            .collect()
    }

    pub fn signer(&self, format: SignatureFormat) -> Result<&dyn Signer, Error> {
        self.signers
            .get(&format)
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::Configuration(format!("no signer registered for {format}")))
    }

    pub fn sign_data(
        &self,
        format: SignatureFormat,
        data: &[u8],
        request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        format.check_mode(request.mode)?;
        let signer = self.signer(format)?;
        log::debug!("{format} {} signature over {} bytes", request.mode, data.len());
        signer.sign_data(data, request)
    }

    pub fn sign_hash(
        &self,
        format: SignatureFormat,
        hash: &[u8],
        request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        format.check_hash_input()?;
        format.check_mode(request.mode)?;
        let signer = self.signer(format)?;
        log::debug!("{format} signature over a {}-byte digest", hash.len());
        signer.sign_hash(hash, request)
    }

    pub fn counter_sign(
        &self,
        format: SignatureFormat,
        sign: &[u8],
        target: &CounterSignTarget,
        request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        format.check_counter_signature()?;
        let signer = self.signer(format)?;
        log::debug!("{format} counter-signature ({target:?})");
        signer.counter_sign(sign, target, request)
    }
}
