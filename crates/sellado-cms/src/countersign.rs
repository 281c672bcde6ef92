#![forbid(unsafe_code)]

//! Counter-signatures over existing SignedData containers.
//!
//! Targets are resolved against the container's signer forest:
//!
//! - [`CounterSignTarget::Tree`] counter-signs every node, children
//!   before their parent, so repeated calls add one nesting layer each.
//! - [`CounterSignTarget::Leafs`] counter-signs only nodes without
//!   counter-signatures of their own.
//! - [`CounterSignTarget::Nodes`] and [`CounterSignTarget::Signers`]
//!   counter-signs the nodes with the given pre-order indices.
//!
//! Rebuilding is functional: each touched ancestor is re-encoded from
//! its rebuilt children and nothing else changes. Signed attributes are
//! never re-encoded from scratch, so existing signatures stay valid.

use crate::attr;
use crate::container::SignedContainer;
use crate::oid;
use crate::signer_info::build_signer_info;
use crate::tree::{PreOrder, SignerInfoNode};
use der::asn1::ObjectIdentifier;
pub use sellado_core::CounterSignTarget;
use sellado_core::{DigestAlgorithm, Error, ExtraAttributes};
use sellado_keys::SigningIdentity;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct CounterSignParameters {
    pub digest_algorithm: DigestAlgorithm,
    pub extra: ExtraAttributes,
}

impl Default for CounterSignParameters {
    fn default() -> Self {
        Self {
            digest_algorithm: DigestAlgorithm::Sha256,
            extra: ExtraAttributes::default(),
        }
    }
}

impl CounterSignParameters {
    pub fn new(digest_algorithm: DigestAlgorithm) -> Self {
        Self {
            digest_algorithm,
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, extra: ExtraAttributes) -> Self {
        self.extra = extra;
        self
    }
}

const RESERVED: [ObjectIdentifier; 3] = [oid::SIGNING_TIME, oid::MESSAGE_DIGEST, oid::SERIAL_NUMBER];

/// Counter-sign the DER SignedData `sign` and return the new container.
pub fn counter_sign(
    sign: &[u8],
    target: &CounterSignTarget,
    identity: &SigningIdentity,
    params: &CounterSignParameters,
) -> Result<Vec<u8>, Error> {
    let mut container = SignedContainer::decode(sign)?;
    counter_sign_container(&mut container, target, identity, params)?;
    container.encode()
}

/// In-memory form of [`counter_sign`].
pub fn counter_sign_container(
    container: &mut SignedContainer,
    target: &CounterSignTarget,
    identity: &SigningIdentity,
    params: &CounterSignParameters,
) -> Result<(), Error> {
    let signer = CounterSigner { identity, params };
    let roots = container.roots()?;
    log::debug!("counter-signing {target:?} over {} root signers", roots.len());

    let roots = match target {
        CounterSignTarget::Tree => roots
            .into_iter()
            .map(|root| signer.tree(root))
            .collect::<Result<Vec<_>, _>>()?,
        CounterSignTarget::Leafs => roots
            .into_iter()
            .map(|root| signer.leafs(root))
            .collect::<Result<Vec<_>, _>>()?,
        CounterSignTarget::Nodes(indices) | CounterSignTarget::Signers(indices) => {
            signer.nodes(roots, indices)?
        }
    };

    container.replace_roots(roots)?;
    container.add_certificate(identity.certificate().clone())?;
    log::debug!(
        "certificate set now holds {} certificates",
        container.certificates().len()
    );
    Ok(())
}

/// Pre-order indices of every signer whose certificate common name is
/// one of `names`.
pub fn resolve_signers(container: &SignedContainer, names: &[&str]) -> Result<Vec<usize>, Error> {
    let indices: Vec<usize> = container
        .signers()?
        .into_iter()
        .filter(|s| s.subject.as_deref().is_some_and(|cn| names.contains(&cn)))
        .map(|s| s.index)
        .collect();
    if indices.is_empty() {
        return Err(Error::NotFound(format!(
            "no signer named {}",
            names.join(", ")
        )));
    }
    Ok(indices)
}

struct CounterSigner<'a> {
    identity: &'a SigningIdentity,
    params: &'a CounterSignParameters,
}

impl CounterSigner<'_> {
    /// A counter-signature over `target`'s signature value.
    fn counter_signature(&self, target: &SignerInfoNode) -> Result<SignerInfoNode, Error> {
        let digest = self.params.digest_algorithm;
        let serial = sellado_keys::x509::serial_decimal(self.identity.certificate());
        let signed = vec![
            attr::signing_time(SystemTime::now())?,
            attr::message_digest(&sellado_crypto::digest(digest, target.signature()))?,
            attr::serial_number(&serial)?,
        ];
        let info = build_signer_info(self.identity, digest, signed, &RESERVED, &self.params.extra)?;
        SignerInfoNode::from_signer_info(info)
    }

    fn sign(&self, node: SignerInfoNode) -> Result<SignerInfoNode, Error> {
        let counter = self.counter_signature(&node)?;
        Ok(node.with_counter_signature(counter))
    }

    fn tree(&self, node: SignerInfoNode) -> Result<SignerInfoNode, Error> {
        let node = node.map_children(|_, child| self.tree(child))?;
        self.sign(node)
    }

    fn leafs(&self, node: SignerInfoNode) -> Result<SignerInfoNode, Error> {
        if node.is_leaf() {
            self.sign(node)
        } else {
            node.map_children(|_, child| self.leafs(child))
        }
    }

    fn nodes(
        &self,
        mut roots: Vec<SignerInfoNode>,
        indices: &[usize],
    ) -> Result<Vec<SignerInfoNode>, Error> {
        let order = PreOrder::of(&roots);
        let mut targets = indices.to_vec();
        targets.sort_unstable_by(|a, b| b.cmp(a));
        targets.dedup();

        let mut paths = Vec::with_capacity(targets.len());
        for index in targets {
            let path = order.path(index).ok_or_else(|| {
                Error::Configuration(format!(
                    "signer index {index} is out of range, the container has {} signers",
                    order.len()
                ))
            })?;
            paths.push(path.to_vec());
        }

        for path in paths {
            let (root_index, rest) = path
                .split_first()
                .ok_or_else(|| Error::Configuration("empty signer path".into()))?;
            let root = roots.remove(*root_index);
            roots.insert(*root_index, self.sign_at(root, rest)?);
        }
        Ok(roots)
    }

    /// Descend along `path` and counter-sign the node it ends on.
    fn sign_at(&self, node: SignerInfoNode, path: &[usize]) -> Result<SignerInfoNode, Error> {
        match path.split_first() {
            None => self.sign(node),
            Some((next, rest)) => node.map_children(|position, child| {
                if position == *next {
                    self.sign_at(child, rest)
                } else {
                    Ok(child)
                }
            }),
        }
    }
}
