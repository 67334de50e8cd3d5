//! Vault events
//!
//! Each committed mutation queues one or more events. Front ends drain the
//! queue after every call and forward it (stdout, websocket).

use crate::vault::identity::Address;
use crate::vault::ledger::TxId;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum VaultEvent {
    Deposit { from: Address, amount: u64 },
    Submission { id: TxId },
    Confirmation { id: TxId, owner: Address },
    Revocation { id: TxId, owner: Address },
    Execution { id: TxId },
    ExecutionFailure { id: TxId },
    OwnerAddition { owner: Address },
    OwnerRemoval { owner: Address },
    OwnerReplaced { from: Address, to: Address },
    QuorumChanged { quorum: usize },
    AdminTransferred { from: Address, to: Address },
}

impl VaultEvent {
    /// Transaction the event refers to, if any
    pub fn transaction_id(&self) -> Option<TxId> {
        match self {
            Self::Submission { id }
            | Self::Confirmation { id, .. }
            | Self::Revocation { id, .. }
            | Self::Execution { id }
            | Self::ExecutionFailure { id } => Some(*id),
            _ => None,
        }
    }
}
