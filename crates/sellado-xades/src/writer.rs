#![forbid(unsafe_code)]

//! XML writer producing Exclusive C14N output directly.
//!
//! Markup written through [`XmlWriter`] is already in canonical form
//! when the element tree is rendered standalone:
//! - a prefix is declared on the first element that uses it and
//!   whose ancestors in the fragment have not declared it
//! - attributes are sorted by name
//! - empty elements are written as start/end tag pairs
//! - text and attribute values are escaped per C14N
//!
//! Fragments rendered this way can be embedded verbatim in a larger
//! document with [`XmlWriter::raw`]; their exclusive canonical form is
//! unchanged by the surrounding markup.

use sellado_core::Error;

pub(crate) enum Escape {
    Text,
    Attribute,
}

pub(crate) fn escape(s: &str, mode: Escape) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match (ch, &mode) {
            ('&', _) => out.push_str("&amp;"),
            ('<', _) => out.push_str("&lt;"),
            ('\r', _) => out.push_str("&#xD;"),
            ('>', Escape::Text) => out.push_str("&gt;"),
            ('"', Escape::Attribute) => out.push_str("&quot;"),
            ('\t', Escape::Attribute) => out.push_str("&#x9;"),
            ('\n', Escape::Attribute) => out.push_str("&#xA;"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct XmlWriter {
    out: String,
    bindings: Vec<(String, String)>,
    /// Open elements with the prefixes each declared.
    open: Vec<(String, Vec<String>)>,
}

impl XmlWriter {
    /// A writer that knows the given `(prefix, namespace)` bindings.
    pub fn new(bindings: &[(&str, &str)]) -> Self {
        Self {
            out: String::new(),
            bindings: bindings
                .iter()
                .map(|(p, uri)| ((*p).to_owned(), (*uri).to_owned()))
                .collect(),
            open: Vec::new(),
        }
    }

    fn declared(&self, prefix: &str) -> bool {
        self.open
            .iter()
            .any(|(_, prefixes)| prefixes.iter().any(|p| p == prefix))
    }

    fn uri(&self, prefix: &str) -> Result<&str, Error> {
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .ok_or_else(|| Error::XmlParse(format!("no namespace bound to prefix {prefix}")))
    }

    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let mut declare = Vec::new();
        if let Some((prefix, _)) = name.split_once(':') {
            if !self.declared(prefix) {
                declare.push(prefix.to_owned());
            }
        }

        self.out.push('<');
        self.out.push_str(name);
        for prefix in &declare {
            let uri = escape(self.uri(prefix)?, Escape::Attribute);
            self.out.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
        }
        let mut sorted = attrs.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in sorted {
            self.out.push_str(&format!(" {key}=\"{}\"", escape(value, Escape::Attribute)));
        }
        self.out.push('>');
        self.open.push((name.to_owned(), declare));
        Ok(())
    }

    pub fn end_element(&mut self) -> Result<(), Error> {
        let (name, _) = self
            .open
            .pop()
            .ok_or_else(|| Error::XmlParse("end_element without an open element".into()))?;
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
        Ok(())
    }

    pub fn write_text(&mut self, text: &str) {
        self.out.push_str(&escape(text, Escape::Text));
    }

    /// An element holding only text (possibly empty).
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        self.write_text(text);
        self.end_element()
    }

    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        self.end_element()
    }

    /// Embed markup rendered by another writer.
    pub fn raw(&mut self, markup: &str) {
        self.out.push_str(markup);
    }

    pub fn into_string(self) -> Result<String, Error> {
        if let Some((name, _)) = self.open.last() {
            return Err(Error::XmlParse(format!("element {name} left open")));
        }
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINDINGS: [(&str, &str); 2] = [("ds", "urn:ds"), ("x", "urn:x")];

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b<c>d\r", Escape::Text), "a&amp;b&lt;c&gt;d&#xD;");
        assert_eq!(escape("a\"b\tc\nd>", Escape::Attribute), "a&quot;b&#x9;c&#xA;d>");
    }

    #[test]
    fn test_declares_on_first_use_per_branch() {
        let mut w = XmlWriter::new(&BINDINGS);
        w.start_element("x:Props", &[("Id", "p")]).unwrap();
        w.empty_element("ds:DigestMethod", &[("Algorithm", "urn:sha")]).unwrap();
        w.text_element("ds:DigestValue", &[], "AAA=").unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            "<x:Props xmlns:x=\"urn:x\" Id=\"p\">\
             <ds:DigestMethod xmlns:ds=\"urn:ds\" Algorithm=\"urn:sha\"></ds:DigestMethod>\
             <ds:DigestValue xmlns:ds=\"urn:ds\">AAA=</ds:DigestValue></x:Props>"
        );
    }

    #[test]
    fn test_nested_prefix_declared_once() {
        let mut w = XmlWriter::new(&BINDINGS);
        w.start_element("ds:SignedInfo", &[]).unwrap();
        w.empty_element("ds:Reference", &[("URI", ""), ("Id", "r")]).unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            "<ds:SignedInfo xmlns:ds=\"urn:ds\"><ds:Reference Id=\"r\" URI=\"\"></ds:Reference></ds:SignedInfo>"
        );
    }

    #[test]
    fn test_errors() {
        let mut w = XmlWriter::new(&BINDINGS);
        assert!(w.start_element("zz:Unknown", &[]).is_err());
        let mut w = XmlWriter::new(&BINDINGS);
        w.start_element("Open", &[]).unwrap();
        assert!(w.into_string().is_err());
        assert!(XmlWriter::new(&BINDINGS).end_element().is_err());
    }
}
