#![forbid(unsafe_code)]

//! Counter-signatures over existing XML signatures.
//!
//! A counter-signature is a new ds:Signature placed in the target's
//! `xades:UnsignedSignatureProperties/xades:CounterSignature`, whose
//! reference (Type CountersignedSignature) digests the exclusive
//! canonical form of the target's ds:SignatureValue. The new markup is
//! spliced into the input text, so every existing signature stays
//! byte-identical.
//!
//! Targets are numbered like CMS signers: depth-first pre-order over
//! the top-level signatures and their nested counter-signatures.

use crate::c14n;
use crate::ns::{self, attr, node, XadesVersion};
use crate::params::XmlSignatureParameters;
use crate::sign::{DataReference, Ids, Names, XmlSigner};
use crate::splice::{self, Edit};
use crate::writer::XmlWriter;
use roxmltree::{Document, Node};
use sellado_core::{algorithm, CounterSignTarget, DigestAlgorithm, Error};
use sellado_keys::SigningIdentity;
use std::collections::BTreeSet;

pub(crate) fn is_signature(n: &Node<'_, '_>) -> bool {
    n.has_tag_name((ns::DSIG, node::SIGNATURE))
}

fn is_xades(n: &Node<'_, '_>, local: &str) -> bool {
    n.is_element()
        && n.tag_name().name() == local
        && n.tag_name().namespace().and_then(XadesVersion::from_namespace).is_some()
}

fn element_child<'a, 'input>(n: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    n.children().find(|c| is_xades(c, local))
}

/// Counter-signatures nested directly under `signature`.
fn counter_signatures<'a, 'input>(signature: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    signature
        .descendants()
        .skip(1)
        .filter(is_signature)
        .filter(|n| n.ancestors().skip(1).find(is_signature) == Some(signature))
        .filter(|n| n.parent_element().is_some_and(|p| is_xades(&p, node::COUNTER_SIGNATURE)))
        .collect()
}

pub(crate) struct Entry<'a, 'input> {
    pub(crate) node: Node<'a, 'input>,
    pub(crate) leaf: bool,
}

pub(crate) fn pre_order<'a, 'input>(doc: &'a Document<'input>) -> Vec<Entry<'a, 'input>> {
    fn visit<'a, 'input>(signature: Node<'a, 'input>, out: &mut Vec<Entry<'a, 'input>>) {
        let children = counter_signatures(signature);
        out.push(Entry {
            node: signature,
            leaf: children.is_empty(),
        });
        for child in children {
            visit(child, out);
        }
    }

    let mut out = Vec::new();
    for root in doc
        .descendants()
        .filter(is_signature)
        .filter(|n| !n.ancestors().skip(1).any(|a| is_signature(&a)))
    {
        visit(root, &mut out);
    }
    out
}

/// Number of signatures in the pre-order numbering of `xml`.
pub fn signature_count(xml: &[u8]) -> Result<usize, Error> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| Error::MalformedContainer(format!("signature is not UTF-8: {e}")))?;
    let doc = Document::parse(text)
        .map_err(|e| Error::MalformedContainer(format!("signature is not well-formed XML: {e}")))?;
    Ok(pre_order(&doc).len())
}

impl XmlSigner {
    /// Add counter-signatures by `identity` to the signatures of `sign`
    /// selected by `target`.
    pub fn counter_sign(
        &self,
        sign: &[u8],
        target: &CounterSignTarget,
        identity: &SigningIdentity,
        digest: DigestAlgorithm,
        params: &XmlSignatureParameters,
    ) -> Result<Vec<u8>, Error> {
        params.validate()?;
        let xml = std::str::from_utf8(sign)
            .map_err(|e| Error::MalformedContainer(format!("signature is not UTF-8: {e}")))?;
        let doc = Document::parse(xml).map_err(|e| {
            Error::MalformedContainer(format!("signature is not well-formed XML: {e}"))
        })?;
        let entries = pre_order(&doc);
        if entries.is_empty() {
            return Err(Error::MalformedContainer("document holds no ds:Signature".into()));
        }

        let selected: Vec<Node<'_, '_>> = match target {
            CounterSignTarget::Tree => entries.iter().map(|e| e.node).collect(),
            CounterSignTarget::Leafs => entries.iter().filter(|e| e.leaf).map(|e| e.node).collect(),
            CounterSignTarget::Nodes(indices) | CounterSignTarget::Signers(indices) => {
                let unique: BTreeSet<usize> = indices.iter().copied().collect();
                if let Some(&max) = unique.last().filter(|&&max| max >= entries.len()) {
                    return Err(Error::Configuration(format!(
                        "signer index {max} out of range, the document has {} signatures",
                        entries.len()
                    )));
                }
                unique.into_iter().map(|i| entries[i].node).collect()
            }
        };
        log::debug!(
            "counter-signing {} of {} XML signatures ({target:?})",
            selected.len(),
            entries.len()
        );

        let edits = selected
            .into_iter()
            .map(|signature| self.counter_signature_edit(&doc, signature, identity, digest, params))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(splice::apply(xml, edits).into_bytes())
    }

    fn counter_signature_edit(
        &self,
        doc: &Document<'_>,
        target: Node<'_, '_>,
        identity: &SigningIdentity,
        digest: DigestAlgorithm,
        params: &XmlSignatureParameters,
    ) -> Result<Edit, Error> {
        let value = target
            .children()
            .find(|n| n.has_tag_name((ns::DSIG, node::SIGNATURE_VALUE)))
            .ok_or_else(|| Error::MalformedContainer("ds:Signature without ds:SignatureValue".into()))?;
        let value_id = value.attribute(attr::ID).ok_or_else(|| {
            Error::MalformedContainer("ds:SignatureValue has no Id to reference".into())
        })?;
        let qualifying = target
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, node::OBJECT)))
            .find_map(|object| element_child(object, node::QUALIFYING_PROPERTIES));

        // Follow the prefixes and XAdES version already in the document
        let mut params = params.clone();
        if let Some((prefix, _)) = c14n::element_qname(doc, target).split_once(':') {
            params.ds_prefix = prefix.to_owned();
        }
        if let Some(qp) = qualifying {
            if let Some(version) = qp.tag_name().namespace().and_then(XadesVersion::from_namespace) {
                params.xades_version = version;
            }
            if let Some((prefix, _)) = c14n::element_qname(doc, qp).split_once(':') {
                params.xades_prefix = prefix.to_owned();
            }
        }
        params.validate()?;

        let canonical = c14n::canonicalize_text_element(doc, value);
        let reference = DataReference {
            uri: Some(format!("#{value_id}")),
            transforms: vec![algorithm::EXC_C14N],
            reference_type: Some(ns::REFERENCE_TYPE_COUNTERSIGNED_SIGNATURE),
            digest: params.reference_digest,
            value: sellado_crypto::digest(params.reference_digest, &canonical),
        };
        let ids = Ids::generate();
        let signature = self.signature(&ids, reference, None, identity, digest, &params)?;

        // Wrappers missing between the target and the new CounterSignature
        let names = Names::new(&params);
        let unsigned = qualifying.and_then(|qp| element_child(qp, node::UNSIGNED_PROPERTIES));
        let unsigned_signature =
            unsigned.and_then(|up| element_child(up, node::UNSIGNED_SIGNATURE_PROPERTIES));
        let mut wrappers: Vec<(String, Option<String>)> = Vec::new();
        if qualifying.is_none() {
            let target_id = target.attribute(attr::ID).ok_or_else(|| {
                Error::MalformedContainer("ds:Signature has no Id to qualify".into())
            })?;
            wrappers.push((names.ds(node::OBJECT), None));
            wrappers.push((
                names.xades(node::QUALIFYING_PROPERTIES),
                Some(format!("#{target_id}")),
            ));
        }
        if unsigned.is_none() {
            wrappers.push((names.xades(node::UNSIGNED_PROPERTIES), None));
        }
        if unsigned_signature.is_none() {
            wrappers.push((names.xades(node::UNSIGNED_SIGNATURE_PROPERTIES), None));
        }

        let mut w = XmlWriter::new(&names.bindings());
        for (name, target_attr) in &wrappers {
            match target_attr {
                Some(t) => w.start_element(name, &[(attr::TARGET, t.as_str())])?,
                None => w.start_element(name, &[])?,
            }
        }
        w.start_element(&names.xades(node::COUNTER_SIGNATURE), &[])?;
        w.raw(&signature);
        w.end_element()?;
        for _ in &wrappers {
            w.end_element()?;
        }
        let markup = w.into_string()?;

        match (qualifying, unsigned, unsigned_signature) {
            (_, _, Some(usp)) => splice::append_child(doc, usp, &markup),
            // UnsignedSignatureProperties precede UnsignedDataObjectProperties
            (_, Some(up), None) => match up.first_element_child() {
                Some(first) => Ok(splice::insert_before(first, &markup)),
                None => splice::append_child(doc, up, &markup),
            },
            (Some(qp), None, None) => splice::append_child(doc, qp, &markup),
            (None, None, None) => splice::append_child(doc, target, &markup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::XmlLayout;
    use base64::Engine;
    use sellado_core::SignMode;
    use sellado_crypto::EcdsaEncoding;
    use std::path::Path;

    fn identity(name: &str) -> SigningIdentity {
        let keys = Path::new("../../test-data/keys");
        sellado_keys::loader::load_identity(
            &keys.join(format!("{name}.key")),
            &keys.join(format!("{name}.crt")),
            None,
        )
        .expect("identity")
    }

    fn signed(layout: XmlLayout, xades: bool) -> Vec<u8> {
        XmlSigner::new(layout, xades)
            .sign_data(
                b"counter-signed content",
                SignMode::Implicit,
                &identity("signer-rsa"),
                DigestAlgorithm::Sha256,
                &XmlSignatureParameters::default(),
            )
            .unwrap()
    }

    fn counter(sign: &[u8], target: CounterSignTarget) -> Result<Vec<u8>, Error> {
        XmlSigner::new(XmlLayout::Detached, true).counter_sign(
            sign,
            &target,
            &identity("counter-rsa"),
            DigestAlgorithm::Sha256,
            &XmlSignatureParameters::default(),
        )
    }

    fn child_text<'a>(n: Node<'a, '_>, local: &str) -> &'a str {
        n.descendants()
            .find(|c| c.has_tag_name((ns::DSIG, local)))
            .and_then(|c| c.text())
            .unwrap()
    }

    /// Verify the SignatureValue of `signature` over its SignedInfo text.
    fn verifies(doc: &Document<'_>, signature: Node<'_, '_>, identity: &SigningIdentity) -> bool {
        let signed_info = signature
            .children()
            .find(|n| n.has_tag_name((ns::DSIG, node::SIGNED_INFO)))
            .unwrap();
        let octets = &doc.input_text()[signed_info.range()];
        let value = signature
            .children()
            .find(|n| n.has_tag_name((ns::DSIG, node::SIGNATURE_VALUE)))
            .and_then(|n| n.text())
            .unwrap();
        let value = base64::engine::general_purpose::STANDARD.decode(value).unwrap();
        let key = sellado_keys::x509::public_key(identity.certificate()).unwrap();
        sellado_crypto::sign::verify(
            &key,
            DigestAlgorithm::Sha256,
            octets.as_bytes(),
            &value,
            EcdsaEncoding::Concatenated,
        )
        .unwrap()
    }

    #[test]
    fn test_tree_counter_signs_signature_value() {
        let sign = signed(XmlLayout::Detached, true);
        let out = counter(&sign, CounterSignTarget::Tree).unwrap();
        let xml = std::str::from_utf8(&out).unwrap();
        let doc = Document::parse(xml).unwrap();
        let entries = pre_order(&doc);
        assert_eq!(entries.len(), 2);

        let (root, child) = (entries[0].node, entries[1].node);
        assert!(!entries[0].leaf);
        assert!(verifies(&doc, root, &identity("signer-rsa")));
        assert!(verifies(&doc, child, &identity("counter-rsa")));

        // The original signature is untouched
        let original = std::str::from_utf8(&sign).unwrap();
        let original_root = &original[original.find("<ds:Signature ").unwrap()..];
        let prefix_len = original_root.find("<ds:Object>").unwrap();
        assert!(xml.contains(&original_root[..prefix_len]));

        let reference = child
            .descendants()
            .find(|n| n.attribute(attr::TYPE) == Some(ns::REFERENCE_TYPE_COUNTERSIGNED_SIGNATURE))
            .unwrap();
        let value = root
            .children()
            .find(|n| n.has_tag_name((ns::DSIG, node::SIGNATURE_VALUE)))
            .unwrap();
        assert_eq!(
            reference.attribute(attr::URI).map(str::to_owned),
            value.attribute(attr::ID).map(|id| format!("#{id}"))
        );
        let expected = sellado_crypto::digest(
            DigestAlgorithm::Sha512,
            &c14n::canonicalize_text_element(&doc, value),
        );
        assert_eq!(
            base64::engine::general_purpose::STANDARD.decode(child_text(reference, node::DIGEST_VALUE)).unwrap(),
            expected
        );
        assert!(child.ancestors().any(|a| is_xades(&a, node::UNSIGNED_SIGNATURE_PROPERTIES)));
    }

    #[test]
    fn test_tree_twice_nests_and_leafs_only_signs_leaves() {
        let sign = signed(XmlLayout::Enveloping, true);
        let once = counter(&sign, CounterSignTarget::Tree).unwrap();
        let twice = counter(&once, CounterSignTarget::Tree).unwrap();
        let doc = Document::parse(std::str::from_utf8(&twice).unwrap()).unwrap();
        let entries = pre_order(&doc);
        // root, its two counter-signatures, and one under the first
        assert_eq!(entries.len(), 4);
        assert_eq!(counter_signatures(entries[0].node).len(), 2);
        assert_eq!(counter_signatures(entries[1].node).len(), 1);
        for entry in &entries[1..] {
            assert!(verifies(&doc, entry.node, &identity("counter-rsa")));
        }

        let leafs = counter(&once, CounterSignTarget::Leafs).unwrap();
        let doc = Document::parse(std::str::from_utf8(&leafs).unwrap()).unwrap();
        let entries = pre_order(&doc);
        assert_eq!(entries.len(), 3);
        assert_eq!(counter_signatures(entries[0].node).len(), 1);
        assert_eq!(counter_signatures(entries[1].node).len(), 1);
    }

    #[test]
    fn test_nodes_by_index() {
        let once = counter(&signed(XmlLayout::Detached, true), CounterSignTarget::Tree).unwrap();
        let out = counter(&once, CounterSignTarget::Signers(vec![1, 1])).unwrap();
        let doc = Document::parse(std::str::from_utf8(&out).unwrap()).unwrap();
        let entries = pre_order(&doc);
        assert_eq!(entries.len(), 3);
        assert_eq!(counter_signatures(entries[0].node).len(), 1);
        assert_eq!(counter_signatures(entries[1].node).len(), 1);

        assert!(matches!(
            counter(&once, CounterSignTarget::node(2)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_plain_xmldsig_gains_qualifying_properties() {
        let sign = signed(XmlLayout::Enveloping, false);
        let out = counter(&sign, CounterSignTarget::Tree).unwrap();
        let doc = Document::parse(std::str::from_utf8(&out).unwrap()).unwrap();
        let entries = pre_order(&doc);
        assert_eq!(entries.len(), 2);
        let root = entries[0].node;
        let qp = root
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, node::OBJECT)))
            .find_map(|o| element_child(o, node::QUALIFYING_PROPERTIES))
            .unwrap();
        assert_eq!(
            qp.attribute(attr::TARGET).map(str::to_owned),
            root.attribute(attr::ID).map(|id| format!("#{id}"))
        );
        assert!(verifies(&doc, root, &identity("signer-rsa")));
    }

    #[test]
    fn test_enveloped_document_counter_signed() {
        let input = b"<doc><item>x</item></doc>";
        let sign = XmlSigner::new(XmlLayout::Enveloped, true)
            .sign_data(
                input,
                SignMode::Implicit,
                &identity("signer-rsa"),
                DigestAlgorithm::Sha256,
                &XmlSignatureParameters::default(),
            )
            .unwrap();
        let out = counter(&sign, CounterSignTarget::Leafs).unwrap();
        assert_eq!(signature_count(&out).unwrap(), 2);
        assert!(std::str::from_utf8(&out).unwrap().starts_with("<doc><item>x</item><ds:Signature"));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            counter(b"<unclosed>", CounterSignTarget::Tree),
            Err(Error::MalformedContainer(_))
        ));
        assert!(matches!(
            counter(b"<doc/>", CounterSignTarget::Tree),
            Err(Error::MalformedContainer(_))
        ));
        assert!(matches!(
            signature_count(&[0xff, 0xfe]),
            Err(Error::MalformedContainer(_))
        ));
    }
}
