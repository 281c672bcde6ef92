#![forbid(unsafe_code)]

//! Batch signing configuration.

use sellado_core::{DigestAlgorithm, Error, ExtraAttributes, SignMode, SignatureFormat};
use sellado_formats::SignRequest;
use sellado_keys::SigningIdentity;
use sellado_xades::XmlSignatureParameters;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What a batch does with each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MassiveOperation {
    /// Sign the input.
    #[default]
    Sign,
    /// Counter-sign every signer of an existing signature.
    CounterSignTree,
    /// Counter-sign the signers without counter-signatures of their own.
    CounterSignLeafs,
}

impl MassiveOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::CounterSignTree => "countersign-tree",
            Self::CounterSignLeafs => "countersign-leafs",
        }
    }
}

impl fmt::Display for MassiveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MassiveOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "sign" => Ok(Self::Sign),
            "countersign-tree" | "tree" => Ok(Self::CounterSignTree),
            "countersign-leafs" | "leafs" => Ok(Self::CounterSignLeafs),
            _ => Err(Error::Configuration(format!("unknown massive operation: {s}"))),
        }
    }
}

/// Settings shared by every signature of a batch run.
///
/// Format, mode and the other settings may be changed between calls;
/// a call always uses the values current when it starts. Calls only
/// read the configuration, so one configuration can serve many threads.
#[derive(Debug, Clone)]
pub struct MassiveSignConfiguration {
    identity: SigningIdentity,
    format: SignatureFormat,
    mode: SignMode,
    digest_algorithm: DigestAlgorithm,
    hash_algorithm: Option<DigestAlgorithm>,
    operation: MassiveOperation,
    extra: ExtraAttributes,
    xml: XmlSignatureParameters,
    document_parameters: BTreeMap<String, String>,
}

impl MassiveSignConfiguration {
    /// CMS, implicit, SHA-256 signatures by `identity`.
    pub fn new(identity: SigningIdentity) -> Self {
        Self {
            identity,
            format: SignatureFormat::Cms,
            mode: SignMode::Implicit,
            digest_algorithm: DigestAlgorithm::Sha256,
            hash_algorithm: None,
            operation: MassiveOperation::Sign,
            extra: ExtraAttributes::default(),
            xml: XmlSignatureParameters::default(),
            document_parameters: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    pub fn format(&self) -> SignatureFormat {
        self.format
    }

    pub fn mode(&self) -> SignMode {
        self.mode
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn operation(&self) -> MassiveOperation {
        self.operation
    }

    pub fn set_identity(&mut self, identity: SigningIdentity) {
        self.identity = identity;
    }

    pub fn set_format(&mut self, format: SignatureFormat) {
        self.format = format;
    }

    pub fn set_mode(&mut self, mode: SignMode) {
        self.mode = mode;
    }

    pub fn set_digest_algorithm(&mut self, digest: DigestAlgorithm) {
        self.digest_algorithm = digest;
    }

    /// Algorithm of the digests given to `sign_hash`. `None` infers it
    /// from the digest length.
    pub fn set_hash_algorithm(&mut self, digest: Option<DigestAlgorithm>) {
        self.hash_algorithm = digest;
    }

    pub fn set_operation(&mut self, operation: MassiveOperation) {
        self.operation = operation;
    }

    pub fn set_extra_attributes(&mut self, extra: ExtraAttributes) {
        self.extra = extra;
    }

    pub fn set_xml_parameters(&mut self, xml: XmlSignatureParameters) {
        self.xml = xml;
    }

    pub fn set_document_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.document_parameters.insert(key.into(), value.into());
    }

    /// A snapshot of the current settings as a signer request.
    pub fn request(&self) -> SignRequest<'_> {
        let mut request = SignRequest::new(&self.identity)
            .with_mode(self.mode)
            .with_digest_algorithm(self.digest_algorithm)
            .with_extra(self.extra.clone())
            .with_xml(self.xml.clone());
        request.hash_algorithm = self.hash_algorithm;
        request.document_parameters = self.document_parameters.clone();
        request
    }
}
