#![forbid(unsafe_code)]

//! XAdES / XML-DSig signature creation.
//!
//! SignedInfo, SignedProperties and Manifest are rendered by
//! [`XmlWriter`] directly in Exclusive C14N form, so the octets that are
//! digested and signed are exactly the serialized fragments. The rest of
//! the Signature element is ordinary markup around them.

use crate::ns::{self, attr, node};
use crate::params::{XmlLayout, XmlSignatureParameters};
use crate::splice;
use crate::writer::XmlWriter;
use base64::Engine;
use sellado_core::{algorithm, DigestAlgorithm, Error, SignMode};
use sellado_crypto::EcdsaEncoding;
use sellado_keys::SigningIdentity;
use std::time::SystemTime;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Produces XML signatures of one layout, with or without XAdES
/// qualifying properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlSigner {
    layout: XmlLayout,
    xades: bool,
}

impl XmlSigner {
    pub fn new(layout: XmlLayout, xades: bool) -> Self {
        Self { layout, xades }
    }

    pub fn layout(&self) -> XmlLayout {
        self.layout
    }

    pub fn is_xades(&self) -> bool {
        self.xades
    }

    /// Sign `data`. Implicit signatures carry the content (base64 in a
    /// wrapper or ds:Object, or the input document itself when
    /// enveloped); explicit ones reference it externally.
    pub fn sign_data(
        &self,
        data: &[u8],
        mode: SignMode,
        identity: &SigningIdentity,
        digest: DigestAlgorithm,
        params: &XmlSignatureParameters,
    ) -> Result<Vec<u8>, Error> {
        params.validate()?;
        let ids = Ids::generate();
        let ref_digest = params.reference_digest;
        let b64 = base64::engine::general_purpose::STANDARD;
        log::debug!(
            "producing {:?} XML signature (xades: {}, {mode}) over {} bytes",
            self.layout,
            self.xades,
            data.len()
        );

        match (self.layout, mode) {
            (XmlLayout::Enveloped, SignMode::Explicit) => Err(Error::UnsupportedMode {
                format: self.format_name().to_owned(),
                mode: mode.to_string(),
            }),
            (XmlLayout::Enveloped, SignMode::Implicit) => {
                let xml = std::str::from_utf8(data)
                    .map_err(|e| Error::XmlParse(format!("input is not UTF-8: {e}")))?;
                let doc = roxmltree::Document::parse(xml)
                    .map_err(|e| Error::XmlParse(e.to_string()))?;
                let canonical = crate::c14n::canonicalize(&doc);
                let reference = DataReference {
                    uri: Some(String::new()),
                    transforms: vec![algorithm::ENVELOPED_SIGNATURE, algorithm::C14N],
                    reference_type: None,
                    digest: ref_digest,
                    value: sellado_crypto::digest(ref_digest, &canonical),
                };
                let signature = self.signature(&ids, reference, None, identity, digest, params)?;
                let edit = splice::append_child(&doc, doc.root_element(), &signature)?;
                Ok(splice::apply(xml, vec![edit]).into_bytes())
            }
            (XmlLayout::Detached, SignMode::Implicit) => {
                let reference = DataReference {
                    uri: Some(format!("#{}", ids.content)),
                    transforms: vec![algorithm::BASE64],
                    reference_type: None,
                    digest: ref_digest,
                    value: sellado_crypto::digest(ref_digest, data),
                };
                let signature = self.signature(&ids, reference, None, identity, digest, params)?;

                let mut w = XmlWriter::new(&[]);
                w.raw(XML_DECLARATION);
                w.start_element(ns::DETACHED_WRAPPER, &[])?;
                w.text_element(
                    ns::DETACHED_CONTENT,
                    &[
                        (attr::ENCODING, "base64"),
                        (attr::ID, ids.content.as_str()),
                        (attr::MIME_TYPE, params.mime_type.as_str()),
                    ],
                    &b64.encode(data),
                )?;
                w.raw(&signature);
                w.end_element()?;
                w.into_string().map(String::into_bytes)
            }
            (XmlLayout::Enveloping, SignMode::Implicit) => {
                let reference = DataReference {
                    uri: Some(format!("#{}", ids.content)),
                    transforms: vec![algorithm::BASE64],
                    reference_type: None,
                    digest: ref_digest,
                    value: sellado_crypto::digest(ref_digest, data),
                };
                let object = b64.encode(data);
                let signature =
                    self.signature(&ids, reference, Some(object.as_str()), identity, digest, params)?;
                Ok(format!("{XML_DECLARATION}{signature}").into_bytes())
            }
            (XmlLayout::Detached | XmlLayout::Enveloping, SignMode::Explicit) => {
                let reference = DataReference {
                    uri: params.external_reference_uri.clone(),
                    transforms: Vec::new(),
                    reference_type: None,
                    digest: ref_digest,
                    value: sellado_crypto::digest(ref_digest, data),
                };
                let signature = self.signature(&ids, reference, None, identity, digest, params)?;
                Ok(format!("{XML_DECLARATION}{signature}").into_bytes())
            }
        }
    }

    /// Sign a precomputed digest of external content. The reference
    /// carries `hash` as its digest value.
    pub fn sign_hash(
        &self,
        hash: &[u8],
        hash_algorithm: DigestAlgorithm,
        identity: &SigningIdentity,
        digest: DigestAlgorithm,
        params: &XmlSignatureParameters,
    ) -> Result<Vec<u8>, Error> {
        if self.layout == XmlLayout::Enveloped {
            return Err(Error::UnsupportedOperation(format!(
                "{} signatures cannot be produced from a digest",
                self.format_name()
            )));
        }
        if hash.len() != hash_algorithm.output_len() {
            return Err(Error::Configuration(format!(
                "a {hash_algorithm} digest is {} bytes, got {}",
                hash_algorithm.output_len(),
                hash.len()
            )));
        }
        params.validate()?;
        let ids = Ids::generate();
        let reference = DataReference {
            uri: params.external_reference_uri.clone(),
            transforms: Vec::new(),
            reference_type: None,
            digest: hash_algorithm,
            value: hash.to_vec(),
        };
        let signature = self.signature(&ids, reference, None, identity, digest, params)?;
        Ok(format!("{XML_DECLARATION}{signature}").into_bytes())
    }

    fn format_name(&self) -> &'static str {
        match (self.xades, self.layout) {
            (true, XmlLayout::Detached) => "XAdES Detached",
            (true, XmlLayout::Enveloping) => "XAdES Enveloping",
            (true, XmlLayout::Enveloped) => "XAdES Enveloped",
            (false, XmlLayout::Detached) => "XMLDSig Detached",
            (false, XmlLayout::Enveloping) => "XMLDSig Enveloping",
            (false, XmlLayout::Enveloped) => "XMLDSig Enveloped",
        }
    }

    /// Render the complete ds:Signature element.
    pub(crate) fn signature(
        &self,
        ids: &Ids,
        data: DataReference,
        object: Option<&str>,
        identity: &SigningIdentity,
        digest: DigestAlgorithm,
        params: &XmlSignatureParameters,
    ) -> Result<String, Error> {
        let names = Names::new(params);
        let bindings = names.bindings();
        let b64 = base64::engine::general_purpose::STANDARD;

        // Data reference, possibly behind a manifest
        let mut manifest = None;
        let (first_reference, first_reference_id) = if params.use_manifest {
            let mut w = XmlWriter::new(&bindings);
            w.start_element(&names.ds(node::MANIFEST), &[(attr::ID, ids.manifest.as_str())])?;
            data.write(&mut w, &names, &ids.reference)?;
            w.end_element()?;
            let fragment = w.into_string()?;
            let reference = DataReference {
                uri: Some(format!("#{}", ids.manifest)),
                transforms: vec![algorithm::EXC_C14N],
                reference_type: Some(ns::REFERENCE_TYPE_MANIFEST),
                digest: params.reference_digest,
                value: sellado_crypto::digest(params.reference_digest, fragment.as_bytes()),
            };
            manifest = Some(fragment);
            (reference, ids.manifest_reference.clone())
        } else {
            (data, ids.reference.clone())
        };

        let signed_properties = if self.xades {
            Some(signed_properties(ids, &names, identity, params, &first_reference_id)?)
        } else {
            None
        };

        // SignedInfo
        let algorithm = identity.signature_algorithm(digest);
        let mut w = XmlWriter::new(&bindings);
        w.start_element(&names.ds(node::SIGNED_INFO), &[(attr::ID, ids.signed_info.as_str())])?;
        w.empty_element(
            &names.ds(node::CANONICALIZATION_METHOD),
            &[(attr::ALGORITHM, algorithm::EXC_C14N)],
        )?;
        w.empty_element(
            &names.ds(node::SIGNATURE_METHOD),
            &[(attr::ALGORITHM, algorithm.xml_uri())],
        )?;
        first_reference.write(&mut w, &names, &first_reference_id)?;
        if let Some(props) = &signed_properties {
            DataReference {
                uri: Some(format!("#{}", ids.signed_properties)),
                transforms: vec![algorithm::EXC_C14N],
                reference_type: Some(ns::REFERENCE_TYPE_SIGNED_PROPERTIES),
                digest: params.reference_digest,
                value: sellado_crypto::digest(params.reference_digest, props.as_bytes()),
            }
            .write(&mut w, &names, &ids.signed_properties_reference)?;
        }
        w.end_element()?;
        let signed_info = w.into_string()?;

        let signature_value =
            identity.sign(digest, signed_info.as_bytes(), EcdsaEncoding::Concatenated)?;
        log::debug!("signed {} bytes of SignedInfo with {algorithm}", signed_info.len());

        // Signature element
        let mut w = XmlWriter::new(&bindings);
        w.start_element(&names.ds(node::SIGNATURE), &[(attr::ID, ids.signature.as_str())])?;
        w.raw(&signed_info);
        w.text_element(
            &names.ds(node::SIGNATURE_VALUE),
            &[(attr::ID, ids.signature_value.as_str())],
            &b64.encode(signature_value),
        )?;
        w.start_element(&names.ds(node::KEY_INFO), &[(attr::ID, ids.key_info.as_str())])?;
        w.start_element(&names.ds(node::X509_DATA), &[])?;
        for cert in identity.chain() {
            w.text_element(&names.ds(node::X509_CERTIFICATE), &[], &b64.encode(cert))?;
        }
        w.end_element()?;
        w.end_element()?;
        if let Some(object) = object {
            w.text_element(
                &names.ds(node::OBJECT),
                &[
                    (attr::ENCODING, algorithm::BASE64),
                    (attr::ID, ids.content.as_str()),
                    (attr::MIME_TYPE, params.mime_type.as_str()),
                ],
                object,
            )?;
        }
        if let Some(manifest) = &manifest {
            w.start_element(&names.ds(node::OBJECT), &[])?;
            w.raw(manifest);
            w.end_element()?;
        }
        if let Some(props) = &signed_properties {
            let target = format!("#{}", ids.signature);
            w.start_element(&names.ds(node::OBJECT), &[])?;
            w.start_element(
                &names.xades(node::QUALIFYING_PROPERTIES),
                &[(attr::TARGET, target.as_str())],
            )?;
            w.raw(props);
            w.end_element()?;
            w.end_element()?;
        }
        w.end_element()?;
        w.into_string()
    }
}

/// A ds:Reference before rendering.
pub(crate) struct DataReference {
    pub(crate) uri: Option<String>,
    pub(crate) transforms: Vec<&'static str>,
    pub(crate) reference_type: Option<&'static str>,
    pub(crate) digest: DigestAlgorithm,
    pub(crate) value: Vec<u8>,
}

impl DataReference {
    fn write(&self, w: &mut XmlWriter, names: &Names, id: &str) -> Result<(), Error> {
        let mut attrs = vec![(attr::ID, id)];
        if let Some(reference_type) = self.reference_type {
            attrs.push((attr::TYPE, reference_type));
        }
        if let Some(uri) = &self.uri {
            attrs.push((attr::URI, uri.as_str()));
        }
        w.start_element(&names.ds(node::REFERENCE), &attrs)?;
        if !self.transforms.is_empty() {
            w.start_element(&names.ds(node::TRANSFORMS), &[])?;
            for transform in &self.transforms {
                w.empty_element(&names.ds(node::TRANSFORM), &[(attr::ALGORITHM, *transform)])?;
            }
            w.end_element()?;
        }
        w.empty_element(
            &names.ds(node::DIGEST_METHOD),
            &[(attr::ALGORITHM, self.digest.uri())],
        )?;
        w.text_element(
            &names.ds(node::DIGEST_VALUE),
            &[],
            &base64::engine::general_purpose::STANDARD.encode(&self.value),
        )?;
        w.end_element()
    }
}

/// The xades:SignedProperties fragment in canonical form.
fn signed_properties(
    ids: &Ids,
    names: &Names,
    identity: &SigningIdentity,
    params: &XmlSignatureParameters,
    data_reference_id: &str,
) -> Result<String, Error> {
    let cert = identity.certificate();
    let cert_digest = sellado_crypto::digest(params.reference_digest, identity.certificate_der());
    let object_reference = format!("#{data_reference_id}");

    let mut w = XmlWriter::new(&names.bindings());
    w.start_element(
        &names.xades(node::SIGNED_PROPERTIES),
        &[(attr::ID, ids.signed_properties.as_str())],
    )?;
    w.start_element(&names.xades(node::SIGNED_SIGNATURE_PROPERTIES), &[])?;
    w.text_element(&names.xades(node::SIGNING_TIME), &[], &xml_date_time(SystemTime::now())?)?;
    w.start_element(&names.xades(node::SIGNING_CERTIFICATE), &[])?;
    w.start_element(&names.xades(node::CERT), &[])?;
    w.start_element(&names.xades(node::CERT_DIGEST), &[])?;
    w.empty_element(
        &names.ds(node::DIGEST_METHOD),
        &[(attr::ALGORITHM, params.reference_digest.uri())],
    )?;
    w.text_element(
        &names.ds(node::DIGEST_VALUE),
        &[],
        &base64::engine::general_purpose::STANDARD.encode(cert_digest),
    )?;
    w.end_element()?;
    w.start_element(&names.xades(node::ISSUER_SERIAL), &[])?;
    w.text_element(
        &names.ds(node::X509_ISSUER_NAME),
        &[],
        &cert.tbs_certificate.issuer.to_string(),
    )?;
    w.text_element(
        &names.ds(node::X509_SERIAL_NUMBER),
        &[],
        &sellado_keys::x509::serial_decimal(cert),
    )?;
    w.end_element()?;
    w.end_element()?;
    w.end_element()?;
    w.end_element()?;
    w.start_element(&names.xades(node::SIGNED_DATA_OBJECT_PROPERTIES), &[])?;
    w.start_element(
        &names.xades(node::DATA_OBJECT_FORMAT),
        &[(attr::OBJECT_REFERENCE, object_reference.as_str())],
    )?;
    w.text_element(&names.xades(node::MIME_TYPE), &[], &params.mime_type)?;
    w.end_element()?;
    w.end_element()?;
    w.end_element()?;
    w.into_string()
}

/// xsd:dateTime in UTC.
fn xml_date_time(now: SystemTime) -> Result<String, Error> {
    let dt = der::DateTime::from_system_time(now)
        .map_err(|e| Error::Encoding(format!("signing time: {e}")))?;
    Ok(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minutes(),
        dt.seconds()
    ))
}

pub(crate) struct Names {
    ds: String,
    xades: String,
    xades_ns: &'static str,
}

impl Names {
    pub(crate) fn new(params: &XmlSignatureParameters) -> Self {
        Self {
            ds: params.ds_prefix.clone(),
            xades: params.xades_prefix.clone(),
            xades_ns: params.xades_version.namespace(),
        }
    }

    pub(crate) fn bindings(&self) -> [(&str, &str); 2] {
        [(self.ds.as_str(), ns::DSIG), (self.xades.as_str(), self.xades_ns)]
    }

    pub(crate) fn ds(&self, local: &str) -> String {
        format!("{}:{local}", self.ds)
    }

    pub(crate) fn xades(&self, local: &str) -> String {
        format!("{}:{local}", self.xades)
    }
}

pub(crate) struct Ids {
    pub(crate) signature: String,
    signed_info: String,
    signature_value: String,
    key_info: String,
    reference: String,
    content: String,
    manifest: String,
    manifest_reference: String,
    signed_properties: String,
    signed_properties_reference: String,
}

impl Ids {
    pub(crate) fn generate() -> Self {
        let base = format!("Signature-{:08x}", rand::random::<u32>());
        Self {
            signed_info: format!("{base}-SignedInfo"),
            signature_value: format!("{base}-SignatureValue"),
            key_info: format!("{base}-KeyInfo"),
            reference: format!("{base}-Reference"),
            content: format!("{base}-Content"),
            manifest: format!("{base}-Manifest"),
            manifest_reference: format!("{base}-ManifestReference"),
            signed_properties: format!("{base}-SignedProperties"),
            signed_properties_reference: format!("{base}-SignedPropertiesReference"),
            signature: base,
        }
    }
}
