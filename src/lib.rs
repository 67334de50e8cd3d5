//! Quorum Vault: a multi-owner transaction vault in Rust
//!
//! This crate provides:
//! - An owner registry with a single admin and a derived 60% quorum
//! - A transaction ledger with a per-owner confirmation matrix
//! - An execution controller that invokes a transaction as soon as the
//!   confirming current owners reach quorum, with retry after failure
//! - JSON persistence with backups
//! - A CLI and a REST/WebSocket API
//!
//! # Example
//!
//! ```rust
//! use quorum_vault::vault::{Address, Treasury, Vault};
//!
//! let owners: Vec<Address> = vec!["alice".into(), "bob".into(), "carol".into()];
//! let mut vault = Vault::new("admin".into(), owners, Treasury::with_balance(10)).unwrap();
//!
//! // Three owners need one confirmation, so submitting executes at once
//! let (id, outcome) = vault.submit_transaction(&"alice".into(), "shop".into(), 4, vec![]).unwrap();
//! assert!(outcome.is_executed());
//! assert_eq!(vault.valid_transactions()[0].id, id);
//! ```

pub mod api;
pub mod cli;
pub mod crypto;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use crypto::KeyPair;
pub use storage::{Storage, StorageConfig};
pub use vault::{Address, ExecutionOutcome, Treasury, Vault, VaultError, VaultEvent};
