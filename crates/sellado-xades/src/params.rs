#![forbid(unsafe_code)]

//! XML signature profile parameters.

use crate::ns::{self, XadesVersion};
use sellado_core::{DigestAlgorithm, Error};

/// How an XML signature relates to the signed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlLayout {
    Detached,
    Enveloping,
    Enveloped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSignatureParameters {
    pub xades_version: XadesVersion,
    pub ds_prefix: String,
    pub xades_prefix: String,
    /// Digest of the data and SignedProperties references.
    pub reference_digest: DigestAlgorithm,
    /// URI of the content in explicit signatures. Omitted when unset.
    pub external_reference_uri: Option<String>,
    pub mime_type: String,
    /// Reference the data through a ds:Manifest.
    pub use_manifest: bool,
}

impl Default for XmlSignatureParameters {
    fn default() -> Self {
        Self {
            xades_version: XadesVersion::default(),
            ds_prefix: ns::DEFAULT_DS_PREFIX.to_owned(),
            xades_prefix: ns::DEFAULT_XADES_PREFIX.to_owned(),
            reference_digest: DigestAlgorithm::Sha512,
            external_reference_uri: None,
            mime_type: "application/octet-stream".to_owned(),
            use_manifest: false,
        }
    }
}

impl XmlSignatureParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xades_version(mut self, version: XadesVersion) -> Self {
        self.xades_version = version;
        self
    }

    pub fn with_prefixes(mut self, ds: impl Into<String>, xades: impl Into<String>) -> Self {
        self.ds_prefix = ds.into();
        self.xades_prefix = xades.into();
        self
    }

    pub fn with_reference_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.reference_digest = digest;
        self
    }

    pub fn with_external_reference_uri(mut self, uri: impl Into<String>) -> Self {
        self.external_reference_uri = Some(uri.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_manifest(mut self, use_manifest: bool) -> Self {
        self.use_manifest = use_manifest;
        self
    }

    /// Prefixes must be distinct XML names without a colon.
    pub fn validate(&self) -> Result<(), Error> {
        for prefix in [&self.ds_prefix, &self.xades_prefix] {
            let valid = prefix
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
            if !valid || prefix.to_ascii_lowercase().starts_with("xml") {
                return Err(Error::Configuration(format!("invalid namespace prefix: {prefix:?}")));
            }
        }
        if self.ds_prefix == self.xades_prefix {
            return Err(Error::Configuration(format!(
                "XML-DSig and XAdES prefixes must differ, both are {:?}",
                self.ds_prefix
            )));
        }
        Ok(())
    }
}
