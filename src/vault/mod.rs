//! Quorum-controlled vault
//!
//! A fixed admin manages a set of owners. Any owner may propose an outgoing
//! transaction; it executes once the number of current owners confirming it
//! reaches `floor(owners * 60 / 100)`.
//!
//! # Example
//!
//! ```rust
//! use quorum_vault::vault::{Address, Treasury, Vault};
//!
//! let owners: Vec<Address> = vec!["alice".into(), "bob".into(), "carol".into(), "dave".into(), "erin".into()];
//! let mut vault = Vault::new("admin".into(), owners, Treasury::with_balance(100)).unwrap();
//! assert_eq!(vault.quorum(), 3);
//!
//! // Submitting counts as the submitter's confirmation
//! let (id, _) = vault.submit_transaction(&"alice".into(), "shop".into(), 40, vec![]).unwrap();
//! vault.confirm_transaction(&"bob".into(), id).unwrap();
//!
//! // The third confirmation crosses the threshold and executes
//! let outcome = vault.confirm_transaction(&"carol".into(), id).unwrap();
//! assert!(outcome.is_executed());
//! assert_eq!(vault.balance(), 60);
//! ```

pub mod controller;
pub mod error;
pub mod events;
pub mod identity;
pub mod invoker;
pub mod ledger;
pub mod quorum;
pub mod registry;

pub use controller::{ExecutionOutcome, TransactionStatus, Vault};
pub use error::VaultError;
pub use events::VaultEvent;
pub use identity::Address;
pub use invoker::{Invoker, Treasury};
pub use ledger::{Transaction, TransactionLedger, TxId, TxState, ValidTransaction};
pub use quorum::{threshold, QUORUM_PERCENT};
pub use registry::{AdminCapability, OwnerRegistry, MIN_OWNERS};
