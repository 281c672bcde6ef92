#![forbid(unsafe_code)]

//! Counter-signature trees.
//!
//! A SignerInfo's counter-signatures live in its unsigned attributes as
//! `counterSignature` values, each a SignerInfo that may be
//! counter-signed in turn. [`SignerInfoNode`] lifts that recursion into
//! an owned tree so it can be rebuilt bottom-up after new
//! counter-signatures are attached. Unsigned attributes other than
//! counter-signatures (timestamp tokens included) are carried through
//! verbatim in their original position.

use crate::attr::{self, malformed, to_any};
use crate::oid;
use cms::signed_data::{SignerIdentifier, SignerInfo};
use der::asn1::SetOfVec;
use der::{Decode, Encode};
use sellado_core::Error;
use x509_cert::attr::Attribute;

#[derive(Clone, Debug)]
pub struct SignerInfoNode {
    /// The SignerInfo with its unsigned attributes detached.
    info: SignerInfo,
    unsigned: Vec<UnsignedEntry>,
}

#[derive(Clone, Debug)]
enum UnsignedEntry {
    CounterSignatures(Vec<SignerInfoNode>),
    Opaque(Attribute),
}

impl SignerInfoNode {
    pub fn from_signer_info(mut info: SignerInfo) -> Result<Self, Error> {
        let mut unsigned = Vec::new();
        let attributes = info.unsigned_attrs.take().map(SetOfVec::into_vec).unwrap_or_default();
        for attribute in attributes {
            if attribute.oid != oid::COUNTER_SIGNATURE {
                unsigned.push(UnsignedEntry::Opaque(attribute));
                continue;
            }
            let mut children = Vec::with_capacity(attribute.values.len());
            for value in attribute.values.iter() {
                let der = value.to_der().map_err(malformed("counter-signature"))?;
                let child = SignerInfo::from_der(&der).map_err(malformed("counter-signature"))?;
                children.push(Self::from_signer_info(child)?);
            }
            unsigned.push(UnsignedEntry::CounterSignatures(children));
        }
        Ok(Self { info, unsigned })
    }

    /// Re-encode the subtree into a SignerInfo.
    pub fn into_signer_info(self) -> Result<SignerInfo, Error> {
        let Self { mut info, unsigned } = self;
        let mut attrs = Vec::with_capacity(unsigned.len());
        for entry in unsigned {
            match entry {
                UnsignedEntry::Opaque(attribute) => attrs.push(attribute),
                UnsignedEntry::CounterSignatures(children) => {
                    let mut values = Vec::with_capacity(children.len());
                    for child in children {
                        values.push(to_any(&child.into_signer_info()?)?);
                    }
                    let values = SetOfVec::try_from(values)
                        .map_err(attr::encoding_error("counter-signature values"))?;
                    attrs.push(Attribute {
                        oid: oid::COUNTER_SIGNATURE,
                        values,
                    });
                }
            }
        }
        info.unsigned_attrs = if attrs.is_empty() {
            None
        } else {
            Some(attr::attribute_set(attrs)?)
        };
        Ok(info)
    }

    /// Direct counter-signatures, in attribute order.
    pub fn children(&self) -> impl Iterator<Item = &SignerInfoNode> {
        self.unsigned.iter().flat_map(|entry| match entry {
            UnsignedEntry::CounterSignatures(children) => children.as_slice(),
            UnsignedEntry::Opaque(_) => &[],
        })
    }

    pub fn child_count(&self) -> usize {
        self.children().count()
    }

    pub fn is_leaf(&self) -> bool {
        self.children().next().is_none()
    }

    /// Rebuild the direct children through `f`, which receives each
    /// child with its position among [`Self::children`].
    pub fn map_children<F>(self, mut f: F) -> Result<Self, Error>
    where
        F: FnMut(usize, SignerInfoNode) -> Result<SignerInfoNode, Error>,
    {
        let Self { info, unsigned } = self;
        let mut position = 0;
        let mut mapped = Vec::with_capacity(unsigned.len());
        for entry in unsigned {
            mapped.push(match entry {
                UnsignedEntry::CounterSignatures(children) => {
                    let mut rebuilt = Vec::with_capacity(children.len());
                    for child in children {
                        rebuilt.push(f(position, child)?);
                        position += 1;
                    }
                    UnsignedEntry::CounterSignatures(rebuilt)
                }
                opaque => opaque,
            });
        }
        Ok(Self {
            info,
            unsigned: mapped,
        })
    }

    /// Attach `counter_signature` as a new counterSignature attribute.
    pub fn with_counter_signature(mut self, counter_signature: SignerInfoNode) -> Self {
        self.unsigned
            .push(UnsignedEntry::CounterSignatures(vec![counter_signature]));
        self
    }

    pub fn signer_info(&self) -> &SignerInfo {
        &self.info
    }

    pub fn signature(&self) -> &[u8] {
        self.info.signature.as_bytes()
    }

    pub fn sid(&self) -> &SignerIdentifier {
        &self.info.sid
    }

    pub fn signed_attributes(&self) -> Option<&SetOfVec<Attribute>> {
        self.info.signed_attrs.as_ref()
    }

    /// Unsigned attributes other than counter-signatures.
    pub fn other_unsigned_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.unsigned.iter().filter_map(|entry| match entry {
            UnsignedEntry::Opaque(attribute) => Some(attribute),
            UnsignedEntry::CounterSignatures(_) => None,
        })
    }
}

/// Path of a node: the root index, then a child position per level.
pub type NodePath = Vec<usize>;

/// Pre-order numbering of the signers of a forest.
///
/// Index 0 is the first root, followed by its counter-signatures
/// depth-first, then the second root and so on.
#[derive(Clone, Debug, Default)]
pub struct PreOrder {
    paths: Vec<NodePath>,
}

impl PreOrder {
    pub fn of(roots: &[SignerInfoNode]) -> Self {
        fn walk(node: &SignerInfoNode, path: &mut NodePath, out: &mut Vec<NodePath>) {
            out.push(path.clone());
            for (i, child) in node.children().enumerate() {
                path.push(i);
                walk(child, path, out);
                path.pop();
            }
        }

        let mut paths = Vec::new();
        for (i, root) in roots.iter().enumerate() {
            walk(root, &mut vec![i], &mut paths);
        }
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, index: usize) -> Option<&[usize]> {
        self.paths.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.paths.iter().map(Vec::as_slice).enumerate()
    }
}

/// Resolve a path produced by [`PreOrder`].
pub fn node_at<'a>(roots: &'a [SignerInfoNode], path: &[usize]) -> Option<&'a SignerInfoNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for &position in rest {
        node = node.children().nth(position)?;
    }
    Some(node)
}
