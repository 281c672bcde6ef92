#![forbid(unsafe_code)]

//! Core types shared by every sellado crate: the error taxonomy,
//! algorithm identifiers, signature formats with their capability table,
//! and caller-supplied extra attributes.

pub mod algorithm;
pub mod attributes;
pub mod error;
pub mod format;
pub mod target;

pub use algorithm::{DigestAlgorithm, KeyAlgorithm, SignatureAlgorithm};
pub use attributes::ExtraAttributes;
pub use error::{Error, Result};
pub use format::{Capabilities, InputKind, SignMode, SignatureFormat};
pub use target::CounterSignTarget;
