#![forbid(unsafe_code)]

//! Text-level insertion into parsed documents.
//!
//! Signing never re-serializes input markup: new elements are spliced
//! into the original text at offsets taken from the parsed tree, so
//! everything outside the insertion stays byte-identical.

use crate::c14n::element_qname;
use roxmltree::{Document, Node};
use sellado_core::Error;

/// Replace `start..end` of the source text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) text: String,
}

/// Insert `markup` as the last child of `element`.
pub(crate) fn append_child(
    doc: &Document<'_>,
    element: Node<'_, '_>,
    markup: &str,
) -> Result<Edit, Error> {
    let range = element.range();
    let source = &doc.input_text()[range.clone()];
    if source.ends_with("/>") {
        // <e .../> becomes <e ...>markup</e>
        let open = source[..source.len() - 2].trim_end().len();
        let name = element_qname(doc, element);
        return Ok(Edit {
            start: range.start + open,
            end: range.end,
            text: format!(">{markup}</{name}>"),
        });
    }
    let close = source
        .rfind("</")
        .ok_or_else(|| Error::XmlParse(format!("element at byte {} has no end tag", range.start)))?;
    Ok(Edit {
        start: range.start + close,
        end: range.start + close,
        text: markup.to_owned(),
    })
}

/// Insert `markup` right before `node`.
pub(crate) fn insert_before(node: Node<'_, '_>, markup: &str) -> Edit {
    let at = node.range().start;
    Edit {
        start: at,
        end: at,
        text: markup.to_owned(),
    }
}

/// Apply non-overlapping edits to `source`.
pub(crate) fn apply(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    let mut out = source.to_owned();
    for edit in edits {
        out.replace_range(edit.start..edit.end, &edit.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(xml: &str, markup: &str) -> String {
        let doc = Document::parse(xml).unwrap();
        let edit = append_child(&doc, doc.root_element(), markup).unwrap();
        apply(xml, vec![edit])
    }

    #[test]
    fn test_append_child() {
        assert_eq!(append("<a><b/></a>", "<c/>"), "<a><b/><c/></a>");
        assert_eq!(append("<?xml version=\"1.0\"?>\n<a>t</a>\n", "<c/>"), "<?xml version=\"1.0\"?>\n<a>t<c/></a>\n");
    }

    #[test]
    fn test_append_to_self_closing() {
        assert_eq!(append("<p:a xmlns:p=\"urn:p\" />", "<c/>"), "<p:a xmlns:p=\"urn:p\"><c/></p:a>");
        assert_eq!(append("<a/>", "x"), "<a>x</a>");
    }

    #[test]
    fn test_edits_apply_back_to_front() {
        let xml = "<a><b></b><c></c></a>";
        let doc = Document::parse(xml).unwrap();
        let b = doc.root_element().first_element_child().unwrap();
        let c = doc.root_element().last_element_child().unwrap();
        let edits = vec![
            append_child(&doc, b, "1").unwrap(),
            insert_before(c, "2"),
            append_child(&doc, c, "3").unwrap(),
        ];
        assert_eq!(apply(xml, edits), "<a><b>1</b>2<c>3</c></a>");
    }
}
