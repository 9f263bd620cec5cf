//! Real TFHE-rs implementation
//!
//! Thin wrappers over TFHE-rs that track which key a ciphertext belongs to.

mod ciphertext;
mod keys;
mod operations;

pub use ciphertext::FHEUint64;
pub use keys::{ClientKey, KeyId, KeyPair, ServerKey};
pub use operations::FHEOps;
