#![forbid(unsafe_code)]

//! XAdES and XML-DSig signatures for sellado.
//!
//! Supports the detached, enveloping and enveloped layouts, with or
//! without XAdES qualifying properties, XAdES counter-signatures and
//! verification of the signatures produced here.
//! Generated fragments are written in canonical form by [`writer`];
//! [`c14n`] covers the whole-document canonicalization enveloped
//! references need.

pub mod c14n;
pub mod countersign;
pub mod ns;
pub mod params;
pub mod sign;
mod splice;
pub mod verify;
pub mod writer;

pub use countersign::signature_count;
pub use ns::XadesVersion;
pub use params::{XmlLayout, XmlSignatureParameters};
pub use sign::XmlSigner;
pub use verify::{verify, XmlVerifiedSignature, XmlVerifyResult};
