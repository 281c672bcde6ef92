#![forbid(unsafe_code)]

//! Signing identities for the sellado engine.
//!
//! The engine only ever sees a [`SigningIdentity`]: a handle to a private
//! key (software or hardware backed) plus its certificate chain. Loading
//! software keys and certificates from PEM/DER lives in [`loader`].

pub mod identity;
pub mod loader;
pub mod x509;

pub use identity::{PrivateKeyHandle, SigningIdentity, SoftwareKey};
