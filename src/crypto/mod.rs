//! Cryptographic utilities for the vault
//!
//! This module provides:
//! - SHA-256 hashing for transaction digests
//! - secp256k1 key generation for owner identities
//! - Base58Check address derivation

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_hex};
pub use keys::{public_key_to_address, KeyError, KeyPair};
