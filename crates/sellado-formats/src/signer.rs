#![forbid(unsafe_code)]

//! The per-format signer seam.

use crate::SignRequest;
use sellado_core::{CounterSignTarget, Error, SignatureFormat};

/// Produces signature containers of one format.
///
/// Signers are shared by every thread using a registry. Capability
/// checks happen in the registry before a signer is called.
pub trait Signer: Send + Sync {
    fn format(&self) -> SignatureFormat;

    fn sign_data(&self, data: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error>;

    /// Sign a precomputed digest of external content.
    fn sign_hash(&self, _hash: &[u8], _request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        Err(Error::UnsupportedOperation(format!(
            "{} cannot sign a precomputed digest",
            self.format()
        )))
    }

    /// Add counter-signatures to an existing signature of this format.
    fn counter_sign(
        &self,
        _sign: &[u8],
        _target: &CounterSignTarget,
        _request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        Err(Error::UnsupportedOperation(format!(
            "{} does not support counter-signatures",
            self.format()
        )))
    }
}
