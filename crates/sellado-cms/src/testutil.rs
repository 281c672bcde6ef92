//! Fixtures shared by the unit tests.

use crate::builder::{sign_data, CmsSignParameters};
use crate::container::SignedContainer;
use crate::tree::SignerInfoNode;
use cms::signed_data::SignerInfos;
use der::asn1::SetOfVec;
use sellado_core::SignMode;
use sellado_keys::SigningIdentity;
use std::path::Path;

pub const FIXTURE: &str = "../../test-data/cms/openssl-signed.p7s";
const CONTENT: &str = "../../test-data/cms/content.txt";
const KEYS: &str = "../../test-data/keys";

pub fn identity(name: &str) -> SigningIdentity {
    let keys = Path::new(KEYS);
    sellado_keys::loader::load_identity(
        &keys.join(format!("{name}.key")),
        &keys.join(format!("{name}.crt")),
        None,
    )
    .expect("test identity")
}

pub fn fixture_content() -> Vec<u8> {
    std::fs::read(CONTENT).expect("fixture content")
}

pub fn fixture_container() -> SignedContainer {
    SignedContainer::decode(&std::fs::read(FIXTURE).expect("fixture")).expect("decode fixture")
}

/// A lone SignerInfo produced by signing `data` detached.
pub fn detached_node(signer: &str, data: &[u8]) -> SignerInfoNode {
    let params = CmsSignParameters::new(crate::CmsProfile::Cms, SignMode::Explicit);
    let der = sign_data(data, &identity(signer), &params).expect("sign");
    SignedContainer::decode(&der)
        .expect("decode")
        .roots()
        .expect("roots")
        .remove(0)
}

/// An implicit container over the fixture content with three parallel
/// signers: signer-rsa, counter-rsa and signer-p256.
pub fn three_root_container() -> Vec<u8> {
    let content = fixture_content();
    let params = CmsSignParameters::default();
    let mut merged: Option<SignedContainer> = None;
    let mut infos = Vec::new();
    for name in ["signer-rsa", "counter-rsa", "signer-p256"] {
        let signer = identity(name);
        let container =
            SignedContainer::decode(&sign_data(&content, &signer, &params).expect("sign"))
                .expect("decode");
        infos.extend(container.signed_data().signer_infos.0.iter().cloned());
        match merged.as_mut() {
            Some(target) => target
                .add_certificate(signer.certificate().clone())
                .expect("certificate"),
            None => merged = Some(container),
        }
    }
    let mut merged = merged.expect("containers");
    let mut signed_data = merged.signed_data().clone();
    signed_data.signer_infos = SignerInfos(SetOfVec::try_from(infos).expect("signer infos"));
    merged = SignedContainer::new(signed_data);
    merged.encode().expect("encode")
}
