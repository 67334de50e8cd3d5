//! Vault error taxonomy

use crate::vault::identity::Address;
use crate::vault::ledger::TxId;
use thiserror::Error;

/// Errors raised by vault operations.
///
/// Every error is raised before any state is touched. A failed external
/// invocation is not an error; see [`crate::vault::ExecutionOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Caller {0} lacks the required role")]
    Unauthorized(Address),
    #[error("Invalid (null) identity")]
    InvalidIdentity,
    #[error("Already an owner: {0}")]
    AlreadyOwner(Address),
    #[error("Not an owner: {0}")]
    NotAnOwner(Address),
    #[error("Transaction {id} already confirmed by {owner}")]
    AlreadyConfirmed { id: TxId, owner: Address },
    #[error("Transaction {id} not confirmed by {owner}")]
    NotConfirmed { id: TxId, owner: Address },
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(TxId),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(TxId),
    #[error("Insufficient owners: need at least {need}, got {have}")]
    InsufficientOwners { have: usize, need: usize },
    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Address),
}
