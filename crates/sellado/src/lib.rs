#![forbid(unsafe_code)]

pub use sellado_cms as cms;
pub use sellado_core as core;
pub use sellado_crypto as crypto;
pub use sellado_formats as formats;
pub use sellado_keys as keys;
pub use sellado_massive as massive;
pub use sellado_xades as xades;
