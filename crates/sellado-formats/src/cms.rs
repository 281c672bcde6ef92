#![forbid(unsafe_code)]

//! CMS and CAdES signers.

use crate::{SignRequest, Signer};
use sellado_cms::{CmsProfile, CmsSignParameters, CounterSignParameters};
use sellado_core::{CounterSignTarget, Error, SignatureFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmsSigner {
    profile: CmsProfile,
}

impl CmsSigner {
    pub fn new(profile: CmsProfile) -> Self {
        Self { profile }
    }

    fn parameters(&self, request: &SignRequest<'_>) -> CmsSignParameters {
        CmsSignParameters::new(self.profile, request.mode)
            .with_digest_algorithm(request.digest_algorithm)
            .with_extra(request.extra.clone())
    }
}

impl Signer for CmsSigner {
    fn format(&self) -> SignatureFormat {
        match self.profile {
            CmsProfile::Cms => SignatureFormat::Cms,
            CmsProfile::Cades => SignatureFormat::Cades,
        }
    }

    fn sign_data(&self, data: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        sellado_cms::builder::sign_data(data, request.identity, &self.parameters(request))
    }

    fn sign_hash(&self, hash: &[u8], request: &SignRequest<'_>) -> Result<Vec<u8>, Error> {
        let hash_algorithm = request.hash_algorithm_for(hash)?;
        sellado_cms::builder::sign_hash(hash, hash_algorithm, request.identity, &self.parameters(request))
    }

    fn counter_sign(
        &self,
        sign: &[u8],
        target: &CounterSignTarget,
        request: &SignRequest<'_>,
    ) -> Result<Vec<u8>, Error> {
        let params = CounterSignParameters::new(request.digest_algorithm).with_extra(request.extra.clone());
        sellado_cms::counter_sign(sign, target, request.identity, &params)
    }
}
