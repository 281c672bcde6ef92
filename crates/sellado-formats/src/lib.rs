#![forbid(unsafe_code)]

//! Signature format abstraction for sellado.
//!
//! A [`Signer`] produces containers of one [`SignatureFormat`]; the
//! [`FormatRegistry`] checks every request against the format's
//! capabilities and dispatches to the registered signer.
//!
//! [`SignatureFormat`]: sellado_core::SignatureFormat

pub mod cms;
pub mod document;
pub mod registry;
pub mod request;
pub mod signer;
pub mod xml;

pub use cms::CmsSigner;
pub use document::{DocumentCodec, DocumentSigner};
pub use registry::FormatRegistry;
pub use request::SignRequest;
pub use signer::Signer;
pub use xml::XmlFormatSigner;
