#![forbid(unsafe_code)]

//! Namespaces, element names and reference types of the XML profile.

use sellado_core::Error;
use std::fmt;
use std::str::FromStr;

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Reference type of the XAdES SignedProperties
pub const REFERENCE_TYPE_SIGNED_PROPERTIES: &str = "http://uri.etsi.org/01903#SignedProperties";

/// Reference type of the parent SignatureValue in a counter-signature
pub const REFERENCE_TYPE_COUNTERSIGNED_SIGNATURE: &str =
    "http://uri.etsi.org/01903#CountersignedSignature";

/// Reference type of a ds:Manifest
pub const REFERENCE_TYPE_MANIFEST: &str = "http://www.w3.org/2000/09/xmldsig#Manifest";

/// Wrapper element of detached signatures that embed their content.
pub const DETACHED_WRAPPER: &str = "AFIRMA";
pub const DETACHED_CONTENT: &str = "CONTENT";

pub const DEFAULT_DS_PREFIX: &str = "ds";
pub const DEFAULT_XADES_PREFIX: &str = "xades";

/// XAdES schema version, selecting the qualifying-properties namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XadesVersion {
    V1_1_1,
    V1_2_2,
    #[default]
    V1_3_2,
    V1_4_1,
}

impl XadesVersion {
    pub const ALL: [XadesVersion; 4] = [Self::V1_1_1, Self::V1_2_2, Self::V1_3_2, Self::V1_4_1];

    pub fn namespace(&self) -> &'static str {
        match self {
            Self::V1_1_1 => "http://uri.etsi.org/01903/v1.1.1#",
            Self::V1_2_2 => "http://uri.etsi.org/01903/v1.2.2#",
            Self::V1_3_2 => "http://uri.etsi.org/01903/v1.3.2#",
            Self::V1_4_1 => "http://uri.etsi.org/01903/v1.4.1#",
        }
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.namespace() == uri)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::V1_1_1 => "1.1.1",
            Self::V1_2_2 => "1.2.2",
            Self::V1_3_2 => "1.3.2",
            Self::V1_4_1 => "1.4.1",
        }
    }
}

impl fmt::Display for XadesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for XadesVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim_start_matches(['v', 'V']);
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown XAdES version: {s}")))
    }
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const X509_ISSUER_NAME: &str = "X509IssuerName";
    pub const X509_SERIAL_NUMBER: &str = "X509SerialNumber";
    pub const OBJECT: &str = "Object";
    pub const MANIFEST: &str = "Manifest";

    // XAdES elements
    pub const QUALIFYING_PROPERTIES: &str = "QualifyingProperties";
    pub const SIGNED_PROPERTIES: &str = "SignedProperties";
    pub const SIGNED_SIGNATURE_PROPERTIES: &str = "SignedSignatureProperties";
    pub const SIGNING_TIME: &str = "SigningTime";
    pub const SIGNING_CERTIFICATE: &str = "SigningCertificate";
    pub const CERT: &str = "Cert";
    pub const CERT_DIGEST: &str = "CertDigest";
    pub const ISSUER_SERIAL: &str = "IssuerSerial";
    pub const SIGNED_DATA_OBJECT_PROPERTIES: &str = "SignedDataObjectProperties";
    pub const DATA_OBJECT_FORMAT: &str = "DataObjectFormat";
    pub const MIME_TYPE: &str = "MimeType";
    pub const UNSIGNED_PROPERTIES: &str = "UnsignedProperties";
    pub const UNSIGNED_SIGNATURE_PROPERTIES: &str = "UnsignedSignatureProperties";
    pub const COUNTER_SIGNATURE: &str = "CounterSignature";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ALGORITHM: &str = "Algorithm";
    pub const URI: &str = "URI";
    pub const ID: &str = "Id";
    pub const TYPE: &str = "Type";
    pub const TARGET: &str = "Target";
    pub const ENCODING: &str = "Encoding";
    pub const MIME_TYPE: &str = "MimeType";
    pub const OBJECT_REFERENCE: &str = "ObjectReference";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions() {
        assert_eq!(XadesVersion::default(), XadesVersion::V1_3_2);
        assert_eq!("1.1.1".parse::<XadesVersion>().unwrap(), XadesVersion::V1_1_1);
        assert_eq!("v1.4.1".parse::<XadesVersion>().unwrap().namespace(), "http://uri.etsi.org/01903/v1.4.1#");
        assert!(matches!("2.0".parse::<XadesVersion>(), Err(Error::Configuration(_))));
        assert_eq!(
            XadesVersion::from_namespace("http://uri.etsi.org/01903/v1.2.2#"),
            Some(XadesVersion::V1_2_2)
        );
        assert_eq!(XadesVersion::from_namespace(DSIG), None);
    }
}
