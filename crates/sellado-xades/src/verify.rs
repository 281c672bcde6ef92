#![forbid(unsafe_code)]

//! Verification of the XML signatures this crate produces.
//!
//! Every signature in pre-order (top-level signatures, then their
//! counter-signatures) is checked: each Reference digest, then the
//! SignatureValue over SignedInfo with the key of the first
//! X509Certificate in KeyInfo. SignedInfo and other exclusive-C14N
//! fragments must be self-contained canonical markup, as written by
//! [`crate::writer::XmlWriter`].

use crate::c14n;
use crate::countersign::{is_signature, pre_order};
use crate::ns::{self, attr, node};
use base64::Engine;
use roxmltree::{Document, Node};
use sellado_core::{algorithm, DigestAlgorithm, Error, KeyAlgorithm, SignatureAlgorithm};
use sellado_crypto::EcdsaEncoding;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlVerifiedSignature {
    pub index: usize,
    pub id: Option<String>,
    /// DER of the certificate that verified the SignatureValue.
    pub certificate: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlVerifyResult {
    Valid(Vec<XmlVerifiedSignature>),
    /// The first signature, in pre-order, that failed.
    Invalid { index: usize, reason: String },
}

impl XmlVerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn verified(&self) -> &[XmlVerifiedSignature] {
        match self {
            Self::Valid(signatures) => signatures,
            Self::Invalid { .. } => &[],
        }
    }
}

/// Verify every signature of `xml`. References without a same-document
/// URI are checked against `external`, the signed content; with none
/// given they fail.
pub fn verify(xml: &[u8], external: Option<&[u8]>) -> Result<XmlVerifyResult, Error> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| Error::MalformedContainer(format!("signature is not UTF-8: {e}")))?;
    let doc = Document::parse(text)
        .map_err(|e| Error::MalformedContainer(format!("signature is not well-formed XML: {e}")))?;

    let entries = pre_order(&doc);
    if entries.is_empty() {
        return Err(Error::MalformedContainer("no ds:Signature element".into()));
    }

    let mut verified = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match check(&doc, entry.node, external)? {
            Err(reason) => {
                log::debug!("XML signature {index} failed verification: {reason}");
                return Ok(XmlVerifyResult::Invalid { index, reason });
            }
            Ok(certificate) => verified.push(XmlVerifiedSignature {
                index,
                id: entry.node.attribute(attr::ID).map(str::to_owned),
                certificate,
            }),
        }
    }
    Ok(XmlVerifyResult::Valid(verified))
}

/// `Ok(Err(reason))` for a signature that does not verify.
fn check(
    doc: &Document<'_>,
    signature: Node<'_, '_>,
    external: Option<&[u8]>,
) -> Result<Result<Vec<u8>, String>, Error> {
    let Some(signed_info) = ds_child(signature, node::SIGNED_INFO) else {
        return Ok(Err("missing SignedInfo".into()));
    };

    // References of this signature: in SignedInfo and its manifests
    let references = doc.descendants().filter(|n| {
        n.has_tag_name((ns::DSIG, node::REFERENCE))
            && n.ancestors().find(is_signature) == Some(signature)
    });
    for reference in references {
        if let Err(reason) = check_reference(doc, signature, reference, external)? {
            return Ok(Err(reason));
        }
    }

    let octets = &doc.input_text()[signed_info.range()];
    if c14n::canonicalize_str(octets)? != octets.as_bytes() {
        return Ok(Err("SignedInfo is not in canonical form".into()));
    }

    let Some(method) = ds_child(signed_info, node::SIGNATURE_METHOD)
        .and_then(|n| n.attribute(attr::ALGORITHM))
    else {
        return Ok(Err("missing SignatureMethod".into()));
    };
    let digest = signature_digest(method)?;

    let Some(certificate) = signature
        .descendants()
        .find(|n| n.has_tag_name((ns::DSIG, node::X509_CERTIFICATE)))
        .and_then(|n| n.text())
    else {
        return Ok(Err("no X509Certificate in KeyInfo".into()));
    };
    let certificate = decode_base64(certificate, "X509Certificate")?;
    let key = sellado_keys::x509::public_key(&sellado_keys::x509::parse_certificate(&certificate)?)?;

    let Some(value) = ds_child(signature, node::SIGNATURE_VALUE).and_then(|n| n.text()) else {
        return Ok(Err("missing SignatureValue".into()));
    };
    let value = decode_base64(value, "SignatureValue")?;
    let valid = sellado_crypto::sign::verify(
        &key,
        digest,
        octets.as_bytes(),
        &value,
        EcdsaEncoding::Concatenated,
    )?;
    if !valid {
        return Ok(Err("signature value verification failed".into()));
    }
    Ok(Ok(certificate))
}

fn check_reference(
    doc: &Document<'_>,
    signature: Node<'_, '_>,
    reference: Node<'_, '_>,
    external: Option<&[u8]>,
) -> Result<Result<(), String>, Error> {
    let uri = reference.attribute(attr::URI);
    let label = uri.unwrap_or("(no URI)");
    let Some(method) = ds_child(reference, node::DIGEST_METHOD)
        .and_then(|n| n.attribute(attr::ALGORITHM))
    else {
        return Ok(Err(format!("reference {label} has no DigestMethod")));
    };
    let digest = DigestAlgorithm::from_uri(method)?;
    let Some(expected) = ds_child(reference, node::DIGEST_VALUE).and_then(|n| n.text()) else {
        return Ok(Err(format!("reference {label} has no DigestValue")));
    };
    let expected = decode_base64(expected, "DigestValue")?;
    let transforms: Vec<&str> = reference
        .descendants()
        .filter(|n| n.has_tag_name((ns::DSIG, node::TRANSFORM)))
        .filter_map(|n| n.attribute(attr::ALGORITHM))
        .collect();

    let octets = match uri {
        Some("") => {
            if !transforms.contains(&algorithm::ENVELOPED_SIGNATURE) {
                return Ok(Err("whole-document reference without the enveloped transform".into()));
            }
            let source = doc.input_text();
            let range = signature.range();
            let unsigned = format!("{}{}", &source[..range.start], &source[range.end..]);
            c14n::canonicalize_str(&unsigned)?
        }
        Some(uri) if uri.starts_with('#') => {
            let id = &uri[1..];
            let Some(target) = doc.descendants().find(|n| n.attribute(attr::ID) == Some(id)) else {
                return Ok(Err(format!("reference {uri} points to no element")));
            };
            if transforms.contains(&algorithm::BASE64) {
                let text: String = target.children().filter_map(|c| c.text()).collect();
                decode_base64(&text, "referenced content")?
            } else if target.children().any(|c| c.is_element()) {
                c14n::canonicalize_str(&doc.input_text()[target.range()])?
            } else {
                c14n::canonicalize_text_element(doc, target)
            }
        }
        _ => match external {
            Some(content) => content.to_vec(),
            None => return Ok(Err(format!("reference {label} needs the external content"))),
        },
    };

    if sellado_crypto::digest(digest, &octets) != expected {
        return Ok(Err(format!("digest mismatch for reference {label}")));
    }
    Ok(Ok(()))
}

/// Digest of an XML-DSig SignatureMethod URI.
fn signature_digest(uri: &str) -> Result<DigestAlgorithm, Error> {
    DigestAlgorithm::ALL
        .into_iter()
        .find(|d| {
            [KeyAlgorithm::Rsa, KeyAlgorithm::EcP256]
                .into_iter()
                .any(|k| SignatureAlgorithm::new(*d, k).xml_uri() == uri)
        })
        .ok_or_else(|| Error::UnknownAlgorithm(format!("signature method {uri}")))
}

fn ds_child<'a, 'input>(n: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    n.children().find(|c| c.has_tag_name((ns::DSIG, local)))
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Encoding(format!("{what}: {e}")))
}
