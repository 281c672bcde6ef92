#![forbid(unsafe_code)]

//! Signature formats, signing modes and the capability table.
//!
//! Every decision about which operation a format accepts goes through
//! [`SignatureFormat::capabilities`]; nothing else in the workspace
//! hard-codes per-format conditions.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Whether the signed content travels inside the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignMode {
    /// Detached: only the digest of the content is signed.
    Explicit,
    /// The content is embedded in the signature container.
    Implicit,
}

impl SignMode {
    pub const ALL: [SignMode; 2] = [Self::Explicit, Self::Implicit];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "implicit" => Ok(Self::Implicit),
            _ => Err(Error::Configuration(format!("unknown signature mode: {s}"))),
        }
    }
}

/// The kind of input file a format is exercised with in batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Binary,
    Xml,
    Pdf,
    Odt,
    Docx,
}

impl InputKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Xml => "xml",
            Self::Pdf => "pdf",
            Self::Odt => "odt",
            Self::Docx => "docx",
        }
    }
}

/// A signature container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureFormat {
    Cms,
    Cades,
    XadesDetached,
    XadesEnveloping,
    XadesEnveloped,
    XmlDsigDetached,
    XmlDsigEnveloping,
    XmlDsigEnveloped,
    Pdf,
    Odf,
    Ooxml,
}

/// Fixed capabilities of a [`SignatureFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_counter_signature: bool,
    pub supports_hash_input: bool,
    pub supported_modes: &'static [SignMode],
    pub input_kinds: &'static [InputKind],
}

impl Capabilities {
    pub fn supports_mode(&self, mode: SignMode) -> bool {
        self.supported_modes.contains(&mode)
    }
}

const BOTH_MODES: &[SignMode] = &[SignMode::Explicit, SignMode::Implicit];
const IMPLICIT_ONLY: &[SignMode] = &[SignMode::Implicit];

const CMS_FAMILY: Capabilities = Capabilities {
    supports_counter_signature: true,
    supports_hash_input: true,
    supported_modes: BOTH_MODES,
    input_kinds: &[InputKind::Binary],
};

const XML_EXTERNAL: Capabilities = Capabilities {
    supports_counter_signature: true,
    supports_hash_input: true,
    supported_modes: BOTH_MODES,
    input_kinds: &[InputKind::Binary, InputKind::Xml],
};

const XML_ENVELOPED: Capabilities = Capabilities {
    supports_counter_signature: true,
    supports_hash_input: false,
    supported_modes: IMPLICIT_ONLY,
    input_kinds: &[InputKind::Xml],
};

const fn document(kind: &'static [InputKind]) -> Capabilities {
    Capabilities {
        supports_counter_signature: false,
        supports_hash_input: false,
        supported_modes: IMPLICIT_ONLY,
        input_kinds: kind,
    }
}

impl SignatureFormat {
    pub const ALL: [SignatureFormat; 11] = [
        Self::Cms,
        Self::Cades,
        Self::XadesDetached,
        Self::XadesEnveloping,
        Self::XadesEnveloped,
        Self::XmlDsigDetached,
        Self::XmlDsigEnveloping,
        Self::XmlDsigEnveloped,
        Self::Pdf,
        Self::Odf,
        Self::Ooxml,
    ];

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Cms | Self::Cades => CMS_FAMILY,
            Self::XadesDetached
            | Self::XadesEnveloping
            | Self::XmlDsigDetached
            | Self::XmlDsigEnveloping => XML_EXTERNAL,
            Self::XadesEnveloped | Self::XmlDsigEnveloped => XML_ENVELOPED,
            Self::Pdf => document(&[InputKind::Pdf]),
            Self::Odf => document(&[InputKind::Odt]),
            Self::Ooxml => document(&[InputKind::Docx]),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cms => "CMS",
            Self::Cades => "CAdES",
            Self::XadesDetached => "XAdES Detached",
            Self::XadesEnveloping => "XAdES Enveloping",
            Self::XadesEnveloped => "XAdES Enveloped",
            Self::XmlDsigDetached => "XMLDSig Detached",
            Self::XmlDsigEnveloping => "XMLDSig Enveloping",
            Self::XmlDsigEnveloped => "XMLDSig Enveloped",
            Self::Pdf => "PDF",
            Self::Odf => "ODF",
            Self::Ooxml => "OOXML",
        }
    }

    /// Extension given to signatures persisted in this format.
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Cms | Self::Cades => "csig",
            Self::XadesDetached
            | Self::XadesEnveloping
            | Self::XadesEnveloped
            | Self::XmlDsigDetached
            | Self::XmlDsigEnveloping
            | Self::XmlDsigEnveloped => "xsig",
            Self::Pdf => "pdf",
            Self::Odf => "odt",
            Self::Ooxml => "docx",
        }
    }

    pub fn is_cms(&self) -> bool {
        matches!(self, Self::Cms | Self::Cades)
    }

    pub fn is_xml(&self) -> bool {
        matches!(
            self,
            Self::XadesDetached
                | Self::XadesEnveloping
                | Self::XadesEnveloped
                | Self::XmlDsigDetached
                | Self::XmlDsigEnveloping
                | Self::XmlDsigEnveloped
        )
    }

    pub fn is_xades(&self) -> bool {
        matches!(
            self,
            Self::XadesDetached | Self::XadesEnveloping | Self::XadesEnveloped
        )
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Pdf | Self::Odf | Self::Ooxml)
    }

    /// Fail with [`Error::UnsupportedMode`] unless `mode` is in the table.
    pub fn check_mode(&self, mode: SignMode) -> Result<(), Error> {
        if self.capabilities().supports_mode(mode) {
            Ok(())
        } else {
            Err(Error::UnsupportedMode {
                format: self.name().to_owned(),
                mode: mode.name().to_owned(),
            })
        }
    }

    /// Fail with [`Error::UnsupportedOperation`] unless the format can
    /// sign a bare digest.
    pub fn check_hash_input(&self) -> Result<(), Error> {
        if self.capabilities().supports_hash_input {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!(
                "{} cannot sign a precomputed digest",
                self.name()
            )))
        }
    }

    pub fn check_counter_signature(&self) -> Result<(), Error> {
        if self.capabilities().supports_counter_signature {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!(
                "{} does not support counter-signatures",
                self.name()
            )))
        }
    }
}

impl fmt::Display for SignatureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureFormat {
    type Err = Error;

    /// Accepts display names case-insensitively, with spaces, dashes or
    /// underscores between words (`xades-enveloped`, `XAdES Enveloped`).
    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| {
                let name: String = f
                    .name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                name.to_ascii_lowercase() == wanted
            })
            .ok_or_else(|| Error::Configuration(format!("unknown signature format: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        for format in SignatureFormat::ALL {
            let caps = format.capabilities();
            assert!(!caps.supported_modes.is_empty(), "{format}");
            assert!(caps.supports_mode(SignMode::Implicit), "{format}");
            assert!(!caps.input_kinds.is_empty(), "{format}");
            if format.is_document() {
                assert!(!caps.supports_counter_signature);
                assert!(!caps.supports_hash_input);
                assert!(!caps.supports_mode(SignMode::Explicit));
            }
        }
        assert!(SignatureFormat::Cades.capabilities().supports_hash_input);
        assert!(!SignatureFormat::XadesEnveloped.capabilities().supports_hash_input);
        assert!(!SignatureFormat::XmlDsigEnveloped
            .capabilities()
            .supports_mode(SignMode::Explicit));
    }

    #[test]
    fn test_check_mode() {
        assert!(SignatureFormat::Cms.check_mode(SignMode::Explicit).is_ok());
        let err = SignatureFormat::Pdf.check_mode(SignMode::Explicit).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMode { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_check_hash_input() {
        assert!(SignatureFormat::XadesDetached.check_hash_input().is_ok());
        for format in [
            SignatureFormat::Pdf,
            SignatureFormat::Odf,
            SignatureFormat::Ooxml,
            SignatureFormat::XadesEnveloped,
        ] {
            assert!(matches!(
                format.check_hash_input(),
                Err(Error::UnsupportedOperation(_))
            ));
        }
    }

    #[test]
    fn test_parse_format_names() {
        for format in SignatureFormat::ALL {
            assert_eq!(format.name().parse::<SignatureFormat>().unwrap(), format);
        }
        assert_eq!(
            "xades-enveloped".parse::<SignatureFormat>().unwrap(),
            SignatureFormat::XadesEnveloped
        );
        assert_eq!("cades".parse::<SignatureFormat>().unwrap(), SignatureFormat::Cades);
        assert!("pkcs1".parse::<SignatureFormat>().is_err());
        assert_eq!("IMPLICIT".parse::<SignMode>().unwrap(), SignMode::Implicit);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(SignatureFormat::Cades.file_extension(), "csig");
        assert_eq!(SignatureFormat::XmlDsigEnveloping.file_extension(), "xsig");
        assert_eq!(SignatureFormat::Ooxml.file_extension(), "docx");
    }
}
