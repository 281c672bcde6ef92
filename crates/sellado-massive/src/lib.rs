#![forbid(unsafe_code)]

//! Batch ("massive") signing: one [`MassiveSignConfiguration`] applied
//! to many files, buffers or digests through a [`MassiveSigner`].

pub mod config;
pub mod signer;

pub use config::{MassiveOperation, MassiveSignConfiguration};
pub use signer::{output_file_name, MassiveSigner};
