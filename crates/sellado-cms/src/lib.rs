#![forbid(unsafe_code)]

//! CMS (RFC 5652) and CAdES signatures.
//!
//! - [`builder`] produces SignedData containers from data or a digest.
//! - [`tree`] lifts a container's SignerInfos into [`SignerInfoNode`]
//!   trees whose children are the nested counter-signatures.
//! - [`countersign`] rebuilds those trees with new counter-signatures.
//! - [`verify`] checks every signer of a container.

pub mod attr;
pub mod builder;
pub mod container;
pub mod countersign;
pub mod oid;
pub mod signer_info;
pub mod tree;
pub mod verify;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{CmsProfile, CmsSignParameters};
pub use container::{SignedContainer, SignerSummary};
pub use countersign::{
    counter_sign, counter_sign_container, resolve_signers, CounterSignParameters, CounterSignTarget,
};
pub use tree::{PreOrder, SignerInfoNode};
pub use verify::{verify, VerifiedSigner, VerifyResult};
