#![forbid(unsafe_code)]

//! Cryptographic primitives used by the sellado signers: message
//! digests and RSA / ECDSA signatures over them.

pub mod digest;
pub mod sign;

pub use digest::{digest, Hasher};
pub use sign::{EcdsaEncoding, SigningKey};
