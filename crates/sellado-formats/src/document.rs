#![forbid(unsafe_code)]

//! PDF, ODF and OOXML signing through external document codecs.

use crate::{SignRequest, Signer};
use sellado_core::{Error, SignatureFormat};
use sellado_keys::SigningIdentity;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Signs a whole document container (PDF, ODT, DOCX).
///
/// Codecs transform the source document, so they only ever see the
/// complete input, never a digest.
pub trait DocumentCodec: Send + Sync {
    fn sign(
        &self,
        data: &[u8],
        identity: &SigningIdentity,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, Error>;
}

#[derive(Clone)]
pub struct DocumentSigner {
    format: SignatureFormat,
    codec: Arc<dyn DocumentCodec>,
}

impl DocumentSigner {
    pub fn new(format: SignatureFormat, codec: Arc<dyn DocumentCodec>) -> Result<Self, Error> {
        if !format.is_document() {
            return Err(Error::Configuration(format!("{format} is not a document format")));
        }
        Ok(Self { format, codec })
    }
}

impl std::fmt::Debug for DocumentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSigner").field("format", &self.format).finish()
    }
}

impl Signer for DocumentSigner {
    fn format(&self) -> SignatureFormat {
        self.format
    }

    fn sign_data(&self, data: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        self.codec.sign(data, request.identity, &request.document_parameters)
    }
}
