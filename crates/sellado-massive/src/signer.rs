#![forbid(unsafe_code)]

//! The batch signing driver.

use crate::config::{MassiveOperation, MassiveSignConfiguration};
use sellado_core::{CounterSignTarget, Error, SignatureFormat};
use sellado_formats::FormatRegistry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Applies one configuration to many inputs.
///
/// Each call dispatches to the registry with the configuration's
/// settings at call time and keeps nothing between calls, so a
/// `MassiveSigner` can be shared by worker threads.
#[derive(Debug, Clone, Copy)]
pub struct MassiveSigner<'a> {
    config: &'a MassiveSignConfiguration,
    registry: &'a FormatRegistry,
}

impl<'a> MassiveSigner<'a> {
    pub fn new(config: &'a MassiveSignConfiguration, registry: &'a FormatRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &MassiveSignConfiguration {
        self.config
    }

    /// Read `path` and process its contents like [`sign_data`](Self::sign_data).
    pub fn sign_file(&self, path: &Path) -> Result<Vec<u8>, Error> {
        let data = std::fs::read(path)
            .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
        log::debug!("read {} bytes from {}", data.len(), path.display());
        self.sign_data(&data)
    }

    /// Sign `data`, or counter-sign it when the operation is a
    /// counter-signature and `data` is an existing signature.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let format = self.config.format();
        let request = self.config.request();
        match self.config.operation() {
            MassiveOperation::Sign => self.registry.sign_data(format, data, &request),
            MassiveOperation::CounterSignTree => {
                self.registry.counter_sign(format, data, &CounterSignTarget::Tree, &request)
            }
            MassiveOperation::CounterSignLeafs => {
                self.registry.counter_sign(format, data, &CounterSignTarget::Leafs, &request)
            }
        }
    }

    /// Sign a precomputed digest of the content.
    pub fn sign_hash(&self, hash: &[u8]) -> Result<Vec<u8>, Error> {
        let operation = self.config.operation();
        if operation != MassiveOperation::Sign {
            return Err(Error::UnsupportedOperation(format!(
                "{operation} needs an existing signature, not a digest"
            )));
        }
        self.registry
            .sign_hash(self.config.format(), hash, &self.config.request())
    }
}

/// Where a batch run stores the signature of `input`: the input path
/// with the format's extension appended.
pub fn output_file_name(input: &Path, format: SignatureFormat) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".");
    name.push(format.file_extension());
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sellado_cms::{SignedContainer, VerifyResult};
    use sellado_core::{DigestAlgorithm, InputKind, SignMode};
    use sellado_formats::DocumentCodec;
    use sellado_keys::SigningIdentity;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn identity(name: &str) -> SigningIdentity {
        let keys = Path::new("../../test-data/keys");
        sellado_keys::loader::load_identity(
            &keys.join(format!("{name}.key")),
            &keys.join(format!("{name}.crt")),
            None,
        )
        .expect("identity")
    }

    /// Stands in for the PDF, ODF and OOXML container codecs.
    struct MarkerCodec(SignatureFormat);

    impl DocumentCodec for MarkerCodec {
        fn sign(
            &self,
            data: &[u8],
            _identity: &SigningIdentity,
            _parameters: &BTreeMap<String, String>,
        ) -> Result<Vec<u8>, Error> {
            let mut out = format!("{}-signed:", self.0).into_bytes();
            out.extend_from_slice(data);
            Ok(out)
        }
    }

    fn registry() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        for format in [SignatureFormat::Pdf, SignatureFormat::Odf, SignatureFormat::Ooxml] {
            registry
                .register_document_codec(format, Arc::new(MarkerCodec(format)))
                .unwrap();
        }
        registry
    }

    fn input(kind: InputKind) -> Vec<u8> {
        match kind {
            InputKind::Binary => (0u8..=255).cycle().take(1500).collect(),
            InputKind::Xml => b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<factura xmlns=\"urn:test:factura\"><linea importe=\"10.50\">Servicio</linea></factura>\n".to_vec(),
            InputKind::Pdf => b"%PDF-1.7\n%%EOF\n".to_vec(),
            InputKind::Odt => b"PK\x03\x04odt".to_vec(),
            InputKind::Docx => b"PK\x03\x04docx".to_vec(),
        }
    }

    /// `signature` was produced over `data` and verifies against
    /// `certificate`.
    fn check(format: SignatureFormat, mode: SignMode, signature: &[u8], data: &[u8], certificate: &[u8]) {
        assert!(!signature.is_empty());
        if format.is_cms() {
            let container = SignedContainer::decode(signature).unwrap();
            let detached = (mode == SignMode::Explicit).then_some(data);
            let result = sellado_cms::verify(&container, detached).unwrap();
            assert!(result.is_valid(), "{format} {mode}: {result:?}");
        } else if format.is_xml() {
            assert_eq!(sellado_xades::signature_count(signature).unwrap(), 1, "{format} {mode}");
            let result = sellado_xades::verify(signature, Some(data)).unwrap();
            assert!(result.is_valid(), "{format} {mode}: {result:?}");
            assert_eq!(result.verified()[0].certificate, certificate);
        } else {
            assert!(signature.starts_with(format!("{format}-signed:").as_bytes()));
        }
    }

    #[test]
    fn test_every_format_mode_and_input() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let mut config = MassiveSignConfiguration::new(identity("signer-rsa"));
        let certificate = config.identity().certificate_der().to_vec();
        let mut produced = 0;

        for format in SignatureFormat::ALL {
            config.set_format(format);
            let caps = format.capabilities();
            for &mode in caps.supported_modes {
                config.set_mode(mode);
                for &kind in caps.input_kinds {
                    let data = input(kind);
                    let path = dir.path().join(format!("input.{}", kind.extension()));
                    std::fs::write(&path, &data).unwrap();
                    let massive = MassiveSigner::new(&config, &registry);
                    let stem = format!("{}_{}_{mode}", kind.extension(), format.name().replace(' ', "_"));

                    let from_file = massive.sign_file(&path).unwrap();
                    check(format, mode, &from_file, &data, &certificate);
                    std::fs::write(dir.path().join(format!("file_{stem}.{}", format.file_extension())), &from_file).unwrap();

                    let from_data = massive.sign_data(&data).unwrap();
                    check(format, mode, &from_data, &data, &certificate);
                    std::fs::write(dir.path().join(format!("data_{stem}.{}", format.file_extension())), &from_data).unwrap();
                    produced += 2;

                    if caps.supports_hash_input && mode == SignMode::Implicit {
                        let hash = sellado_crypto::digest(DigestAlgorithm::Sha1, &data);
                        let from_hash = massive.sign_hash(&hash).unwrap();
                        if format.is_cms() {
                            let container = SignedContainer::decode(&from_hash).unwrap();
                            assert!(sellado_cms::verify(&container, Some(&data)).unwrap().is_valid());
                        } else {
                            check(format, mode, &from_hash, &data, &certificate);
                        }
                        produced += 1;
                    } else if !caps.supports_hash_input {
                        assert!(matches!(massive.sign_hash(&[0u8; 20]), Err(Error::UnsupportedOperation(_))));
                    }
                }
            }
        }
        // 25 format/mode/input combinations, 10 of them with digest input
        assert_eq!(produced, 2 * 25 + 10);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 5 + 2 * 25);
    }

    #[test]
    fn test_cms_implicit_sign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let data = b"binary payload \x00\x01\x02".to_vec();
        std::fs::write(&path, &data).unwrap();

        let registry = FormatRegistry::new();
        let config = MassiveSignConfiguration::new(identity("signer-rsa"));
        let out = MassiveSigner::new(&config, &registry).sign_file(&path).unwrap();

        let container = SignedContainer::decode(&out).unwrap();
        let roots = container.roots().unwrap();
        assert_eq!(roots.len(), 1);
        let signed = roots[0].signed_attributes().unwrap();
        assert_eq!(
            sellado_cms::attr::read_message_digest(signed).unwrap(),
            Some(sellado_crypto::digest(DigestAlgorithm::Sha256, &data))
        );
        assert_eq!(container.content().unwrap(), Some(data));
    }

    #[test]
    fn test_unreadable_path() {
        let registry = FormatRegistry::new();
        let config = MassiveSignConfiguration::new(identity("signer-rsa"));
        let result = MassiveSigner::new(&config, &registry).sign_file(Path::new("/nonexistent/input.bin"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unsupported_mode_propagates() {
        let registry = FormatRegistry::new();
        let mut config = MassiveSignConfiguration::new(identity("signer-rsa"));
        config.set_format(SignatureFormat::XadesEnveloped);
        config.set_mode(SignMode::Explicit);
        let result = MassiveSigner::new(&config, &registry).sign_data(b"<a/>");
        assert!(matches!(result, Err(Error::UnsupportedMode { .. })));
    }

    #[test]
    fn test_counter_sign_operations() {
        let registry = FormatRegistry::new();
        let signer_config = MassiveSignConfiguration::new(identity("signer-rsa"));
        let sign = MassiveSigner::new(&signer_config, &registry).sign_data(b"to be countersigned").unwrap();

        let mut config = MassiveSignConfiguration::new(identity("counter-rsa"));
        config.set_operation(MassiveOperation::CounterSignTree);
        let massive = MassiveSigner::new(&config, &registry);
        let once = massive.sign_data(&sign).unwrap();
        let twice = massive.sign_data(&once).unwrap();
        let container = SignedContainer::decode(&twice).unwrap();
        let signers = container.signers().unwrap();
        assert_eq!(signers.len(), 4);
        assert_eq!(signers.iter().map(|s| s.depth).max(), Some(2));
        assert!(matches!(sellado_cms::verify(&container, None).unwrap(), VerifyResult::Valid(_)));
        assert!(matches!(massive.sign_hash(&[0u8; 32]), Err(Error::UnsupportedOperation(_))));

        config.set_operation(MassiveOperation::CounterSignLeafs);
        let leafs = MassiveSigner::new(&config, &registry).sign_data(&once).unwrap();
        assert_eq!(SignedContainer::decode(&leafs).unwrap().signers().unwrap().len(), 3);
    }

    #[test]
    fn test_settings_apply_per_call() {
        let registry = FormatRegistry::new();
        let mut config = MassiveSignConfiguration::new(identity("signer-p256"));
        let cms = MassiveSigner::new(&config, &registry).sign_data(b"data").unwrap();
        config.set_format(SignatureFormat::XmlDsigEnveloping);
        let xml = MassiveSigner::new(&config, &registry).sign_data(b"data").unwrap();
        assert!(SignedContainer::decode(&cms).is_ok());
        assert!(xml.starts_with(b"<?xml"));
    }

    #[test]
    fn test_concurrent_calls_share_configuration() {
        let registry = FormatRegistry::new();
        let mut config = MassiveSignConfiguration::new(identity("signer-rsa"));
        config.set_format(SignatureFormat::Cades);
        let massive = MassiveSigner::new(&config, &registry);
        let outputs: Vec<Vec<u8>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4u8)
                .map(|i| scope.spawn(move || massive.sign_data(&[i; 64])))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
        });
        for (i, out) in outputs.iter().enumerate() {
            let container = SignedContainer::decode(out).unwrap();
            assert_eq!(container.content().unwrap(), Some(vec![i as u8; 64]));
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name(Path::new("/batch/contrato.pdf"), SignatureFormat::Cades),
            PathBuf::from("/batch/contrato.pdf.csig")
        );
        assert_eq!(
            output_file_name(Path::new("factura.xml"), SignatureFormat::XadesEnveloped),
            PathBuf::from("factura.xml.xsig")
        );
    }
}
