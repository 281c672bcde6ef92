#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 of a whole document, without comments.
//!
//! This is the form an enveloped reference (`URI=""` followed by the
//! enveloped-signature and C14N transforms) digests, computed before
//! the signature is inserted.

use crate::writer::{escape, Escape};
use roxmltree::{Document, Node, NodeType};
use sellado_core::Error;
use std::collections::BTreeMap;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse `xml` and return its canonical form.
pub fn canonicalize_str(xml: &str) -> Result<Vec<u8>, Error> {
    let doc = Document::parse(xml).map_err(|e| Error::XmlParse(e.to_string()))?;
    Ok(canonicalize(&doc))
}

pub fn canonicalize(doc: &Document<'_>) -> Vec<u8> {
    let mut out = String::new();
    for child in doc.root().children() {
        match child.node_type() {
            NodeType::Element => element(doc, child, &mut out, &BTreeMap::new()),
            NodeType::PI => {
                let before_root = child.next_siblings().any(|s| s.is_element());
                if !before_root {
                    out.push('\n');
                }
                processing_instruction(child, &mut out);
                if before_root {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
    out.into_bytes()
}

/// Exclusive C14N of a text-only element taken out of `doc`, such as a
/// ds:SignatureValue referenced by a counter-signature.
pub fn canonicalize_text_element(doc: &Document<'_>, node: Node<'_, '_>) -> Vec<u8> {
    let name = element_qname(doc, node);

    // Visibly utilized namespaces: the element's own and its attributes'
    let mut declarations = BTreeMap::new();
    let element_ns = node.tag_name().namespace().unwrap_or("");
    match name.split_once(':') {
        Some((prefix, _)) => {
            declarations.insert(prefix.to_owned(), element_ns.to_owned());
        }
        None if !element_ns.is_empty() => {
            declarations.insert(String::new(), element_ns.to_owned());
        }
        None => {}
    }
    let mut attrs: Vec<(&str, &str, String, &str)> = Vec::new();
    for a in node.attributes() {
        let ns = a.namespace().unwrap_or("");
        let prefix = attribute_prefix(node, ns);
        if let Some(prefix) = prefix.as_deref().filter(|p| *p != "xml") {
            declarations.insert(prefix.to_owned(), ns.to_owned());
        }
        let qname = match prefix {
            Some(prefix) => format!("{prefix}:{}", a.name()),
            None => a.name().to_owned(),
        };
        attrs.push((ns, a.name(), qname, a.value()));
    }
    attrs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut out = format!("<{name}");
    for (prefix, uri) in &declarations {
        let uri = escape(uri, Escape::Attribute);
        if prefix.is_empty() {
            out.push_str(&format!(" xmlns=\"{uri}\""));
        } else {
            out.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
        }
    }
    for (_, _, qname, value) in &attrs {
        out.push_str(&format!(" {qname}=\"{}\"", escape(value, Escape::Attribute)));
    }
    out.push('>');
    for text in node.children().filter(|c| c.is_text()).filter_map(|c| c.text()) {
        out.push_str(&escape(text, Escape::Text));
    }
    out.push_str(&format!("</{name}>"));
    out.into_bytes()
}

fn element(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    out: &mut String,
    inherited: &BTreeMap<String, String>,
) {
    let in_scope = in_scope_namespaces(node);

    let mut declarations: Vec<(&String, &String)> = in_scope
        .iter()
        .filter(|(prefix, uri)| {
            prefix.as_str() != "xml" && inherited.get(prefix.as_str()) != Some(*uri)
        })
        .collect();
    // A default namespace undeclared relative to the parent
    let undeclare_default = inherited.get("").is_some_and(|uri| !uri.is_empty())
        && !in_scope.contains_key("");
    declarations.sort_by(|a, b| a.0.cmp(b.0));

    // (namespace, local name, qualified name, value)
    let mut attrs: Vec<(&str, &str, String, &str)> = node
        .attributes()
        .map(|a| {
            let ns = a.namespace().unwrap_or("");
            let qname = match attribute_prefix(node, ns) {
                Some(prefix) => format!("{prefix}:{}", a.name()),
                None => a.name().to_owned(),
            };
            (ns, a.name(), qname, a.value())
        })
        .collect();
    attrs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let name = element_qname(doc, node);
    out.push('<');
    out.push_str(&name);
    if undeclare_default {
        out.push_str(" xmlns=\"\"");
    }
    for (prefix, uri) in &declarations {
        let uri = escape(uri, Escape::Attribute);
        if prefix.is_empty() {
            out.push_str(&format!(" xmlns=\"{uri}\""));
        } else {
            out.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
        }
    }
    for (_, _, qname, value) in &attrs {
        out.push_str(&format!(" {qname}=\"{}\"", escape(value, Escape::Attribute)));
    }
    out.push('>');

    for child in node.children() {
        match child.node_type() {
            NodeType::Element => element(doc, child, out, &in_scope),
            NodeType::Text => out.push_str(&escape(child.text().unwrap_or(""), Escape::Text)),
            NodeType::PI => processing_instruction(child, out),
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn processing_instruction(node: Node<'_, '_>, out: &mut String) {
    let Some(pi) = node.pi() else {
        return;
    };
    out.push_str("<?");
    out.push_str(pi.target);
    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
        out.push(' ');
        out.push_str(&value.replace('\r', "&#xD;"));
    }
    out.push_str("?>");
}

/// Namespaces in scope at `node`, an empty default URI meaning none.
fn in_scope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}

/// The element name as written in the source, prefix included.
pub(crate) fn element_qname(doc: &Document<'_>, node: Node<'_, '_>) -> String {
    let start = node.range().start + 1;
    let source = &doc.input_text()[start..];
    let end = source
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(source.len());
    source[..end].to_owned()
}

fn attribute_prefix(node: Node<'_, '_>, ns: &str) -> Option<String> {
    if ns.is_empty() {
        return None;
    }
    if ns == XML_NS {
        return Some("xml".to_owned());
    }
    node.namespaces()
        .filter(|decl| decl.uri() == ns)
        .find_map(|decl| decl.name().map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str) -> String {
        String::from_utf8(canonicalize_str(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_attribute_order_and_empty_elements() {
        assert_eq!(c14n(r#"<root><a b="1" a="2"/></root>"#), r#"<root><a a="2" b="1"></a></root>"#);
    }

    #[test]
    fn test_declaration_and_comments_dropped() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- c --><doc><!-- inner -->x</doc>";
        assert_eq!(c14n(xml), "<doc>x</doc>");
    }

    #[test]
    fn test_namespaces_rendered_once() {
        let xml = r#"<p:root xmlns:p="urn:p" xmlns="urn:d"><p:child><leaf/></p:child></p:root>"#;
        assert_eq!(
            c14n(xml),
            r#"<p:root xmlns="urn:d" xmlns:p="urn:p"><p:child><leaf></leaf></p:child></p:root>"#
        );
    }

    #[test]
    fn test_namespaced_attributes_sort_after_plain() {
        let xml = r#"<r xmlns:b="urn:b" xmlns:a="urn:a" b:x="1" a:y="2" z="3"/>"#;
        assert_eq!(
            c14n(xml),
            r#"<r xmlns:a="urn:a" xmlns:b="urn:b" z="3" a:y="2" b:x="1"></r>"#
        );
    }

    #[test]
    fn test_text_escaping_and_entities() {
        assert_eq!(c14n("<r a='x&quot;y'>a &amp; b &lt; c &gt; d</r>"), "<r a=\"x&quot;y\">a &amp; b &lt; c &gt; d</r>");
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let xml = r#"<r xmlns="urn:d"><c xmlns=""/></r>"#;
        assert_eq!(c14n(xml), r#"<r xmlns="urn:d"><c xmlns=""></c></r>"#);
    }

    #[test]
    fn test_text_element_declares_only_used_prefix() {
        let xml = r#"<ds:Signature xmlns:ds="urn:ds" xmlns:x="urn:x"><ds:SignatureValue Id="v">QUJD</ds:SignatureValue></ds:Signature>"#;
        let doc = Document::parse(xml).unwrap();
        let value = doc.root_element().first_element_child().unwrap();
        assert_eq!(
            String::from_utf8(canonicalize_text_element(&doc, value)).unwrap(),
            r#"<ds:SignatureValue xmlns:ds="urn:ds" Id="v">QUJD</ds:SignatureValue>"#
        );
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(canonicalize_str("<open>"), Err(Error::XmlParse(_))));
    }
}
