//! Execution controller
//!
//! [`Vault`] ties the owner registry, the transaction ledger and the
//! invocation primitive together. Every public operation takes `&mut self`,
//! so one submit/confirm/revoke/execute call, including the invocation it
//! may trigger, is a single exclusive step. Shared front ends wrap the vault
//! in a lock held for the whole call.
//!
//! Transaction lifecycle:
//!
//! ```text
//! Submitted --(tally >= quorum)--> QuorumReached --invoke--> Executed
//!     ^                                 |            \
//!     +--------(revoke / quorum up)-----+             +--> ExecutionFailed --(retry)--> ...
//! ```

use crate::vault::error::VaultError;
use crate::vault::events::VaultEvent;
use crate::vault::identity::Address;
use crate::vault::invoker::{Invoker, Treasury};
use crate::vault::ledger::{Transaction, TransactionLedger, TxId, TxState, ValidTransaction};
use crate::vault::registry::OwnerRegistry;
use serde::{Deserialize, Serialize};

/// Result of a tally/invoke step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Tally below quorum; nothing invoked
    Pending { tally: usize, quorum: usize },
    /// Invocation succeeded
    Executed,
    /// Invocation failed; the transaction stays executable
    Failed,
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Lifecycle position of a transaction, derived from stored state and the
/// current owner set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    Submitted,
    QuorumReached,
    Executed,
    ExecutionFailed,
}

/// Multi-owner vault: owners propose outgoing transactions and a quorum of
/// them must confirm before the invoker is called.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault<I = Treasury> {
    registry: OwnerRegistry,
    ledger: TransactionLedger,
    invoker: I,
    #[serde(skip)]
    events: Vec<VaultEvent>,
}

impl<I: Invoker> Vault<I> {
    /// Create a vault with at least three unique owners
    pub fn new(admin: Address, owners: Vec<Address>, invoker: I) -> Result<Self, VaultError> {
        let registry = OwnerRegistry::new(admin, owners)?;
        log::info!(
            "Vault created with {} owners, quorum {}",
            registry.owner_count(),
            registry.quorum()
        );
        Ok(Self {
            registry,
            ledger: TransactionLedger::new(),
            invoker,
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------

    /// Incoming value with an empty payload. Accepted from anyone.
    pub fn deposit(&mut self, from: Address, amount: u64) {
        log::info!("Deposit of {} from {}", amount, from);
        self.invoker.receive(&from, amount);
        self.events.push(VaultEvent::Deposit { from, amount });
    }

    /// Propose a transaction. The submitter's confirmation is applied in the
    /// same step, which may execute it immediately.
    pub fn submit_transaction(
        &mut self,
        caller: &Address,
        destination: Address,
        value: u64,
        payload: Vec<u8>,
    ) -> Result<(TxId, ExecutionOutcome), VaultError> {
        let id = self
            .ledger
            .submit(&self.registry, caller, destination, value, payload)?;
        log::info!("Transaction {} submitted by {}", id, caller);
        self.events.push(VaultEvent::Submission { id });

        let outcome = self.confirm_and_execute(caller, id)?;
        Ok((id, outcome))
    }

    /// Confirm a transaction, then attempt execution
    pub fn confirm_transaction(
        &mut self,
        caller: &Address,
        id: TxId,
    ) -> Result<ExecutionOutcome, VaultError> {
        self.confirm_and_execute(caller, id)
    }

    /// Withdraw the caller's confirmation of a not yet executed transaction
    pub fn revoke_transaction(&mut self, caller: &Address, id: TxId) -> Result<(), VaultError> {
        self.ledger.revoke(&self.registry, id, caller)?;
        log::info!("Transaction {} revoked by {}", id, caller);
        self.events.push(VaultEvent::Revocation {
            id,
            owner: caller.clone(),
        });
        Ok(())
    }

    /// Re-run the tally and, at quorum, invoke. Lets any owner retry after a
    /// failure or after the owner set shrank.
    pub fn execute_transaction(
        &mut self,
        caller: &Address,
        id: TxId,
    ) -> Result<ExecutionOutcome, VaultError> {
        self.registry.ensure_owner(caller)?;
        let tx = self.ledger.get(id).ok_or(VaultError::InvalidTransaction(id))?;
        if tx.executed() {
            return Err(VaultError::AlreadyExecuted(id));
        }
        self.try_execute(id)
    }

    /// Confirm-then-tally as one sequence. Confirmation preconditions are
    /// all checked before anything is written.
    fn confirm_and_execute(
        &mut self,
        caller: &Address,
        id: TxId,
    ) -> Result<ExecutionOutcome, VaultError> {
        self.ledger.confirm(&self.registry, id, caller)?;
        log::info!("Transaction {} confirmed by {}", id, caller);
        self.events.push(VaultEvent::Confirmation {
            id,
            owner: caller.clone(),
        });
        self.try_execute(id)
    }

    fn try_execute(&mut self, id: TxId) -> Result<ExecutionOutcome, VaultError> {
        let tally = self.ledger.tally(&self.registry, id);
        let quorum = self.registry.quorum();
        if tally < quorum {
            log::debug!("Transaction {} at {}/{} confirmations", id, tally, quorum);
            return Ok(ExecutionOutcome::Pending { tally, quorum });
        }

        // Flagged executed before the invoker sees it
        let tx = self
            .ledger
            .begin_execution(id)
            .ok_or(VaultError::InvalidTransaction(id))?;
        let success = self.invoker.invoke(tx);
        self.ledger.finish_execution(id, success);

        if success {
            log::info!("Transaction {} executed ({}/{})", id, tally, quorum);
            self.events.push(VaultEvent::Execution { id });
            Ok(ExecutionOutcome::Executed)
        } else {
            log::warn!("Transaction {} execution failed; it remains executable", id);
            self.events.push(VaultEvent::ExecutionFailure { id });
            Ok(ExecutionOutcome::Failed)
        }
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    pub fn add_owner(&mut self, caller: &Address, identity: Address) -> Result<(), VaultError> {
        let cap = self.registry.authorize_admin(caller)?;
        let quorum = self.registry.add_owner(&cap, identity.clone())?;
        self.events.push(VaultEvent::OwnerAddition { owner: identity });
        self.events.push(VaultEvent::QuorumChanged { quorum });
        Ok(())
    }

    pub fn remove_owner(&mut self, caller: &Address, identity: &Address) -> Result<(), VaultError> {
        let cap = self.registry.authorize_admin(caller)?;
        let quorum = self.registry.remove_owner(&cap, identity)?;
        self.events.push(VaultEvent::OwnerRemoval {
            owner: identity.clone(),
        });
        self.events.push(VaultEvent::QuorumChanged { quorum });
        Ok(())
    }

    pub fn transfer_owner_slot(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
    ) -> Result<(), VaultError> {
        let cap = self.registry.authorize_admin(caller)?;
        self.registry.transfer_owner_slot(&cap, from, to.clone())?;
        self.events.push(VaultEvent::OwnerReplaced {
            from: from.clone(),
            to,
        });
        Ok(())
    }

    pub fn transfer_admin(&mut self, caller: &Address, new_admin: Address) -> Result<(), VaultError> {
        let cap = self.registry.authorize_admin(caller)?;
        let previous = self.registry.transfer_admin(cap, new_admin.clone())?;
        self.events.push(VaultEvent::AdminTransferred {
            from: previous,
            to: new_admin,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    pub fn admin(&self) -> &Address {
        self.registry.admin()
    }

    pub fn quorum(&self) -> usize {
        self.registry.quorum()
    }

    pub fn is_owner(&self, identity: &Address) -> bool {
        self.registry.is_owner(identity)
    }

    pub fn valid_transactions(&self) -> &[ValidTransaction] {
        self.ledger.valid_transactions()
    }

    pub fn get_transaction(&self, id: TxId) -> Option<&Transaction> {
        self.ledger.get(id)
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.ledger.transactions()
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger.len()
    }

    /// Transactions not yet executed
    pub fn pending_transactions(&self) -> Vec<&Transaction> {
        self.ledger
            .transactions()
            .iter()
            .filter(|tx| !tx.executed())
            .collect()
    }

    /// Tally over the current owner set
    pub fn confirmation_count(&self, id: TxId) -> usize {
        self.ledger.tally(&self.registry, id)
    }

    /// Current owners who confirmed `id`
    pub fn confirmations(&self, id: TxId) -> Vec<Address> {
        self.ledger.confirmed_owners(&self.registry, id)
    }

    /// Confirmations recorded for `id`, including stale ones of removed owners
    pub fn recorded_confirmations(&self, id: TxId) -> usize {
        self.ledger.recorded_confirmations(id)
    }

    pub fn is_confirmed(&self, id: TxId, owner: &Address) -> bool {
        self.ledger.is_confirmed(id, owner)
    }

    pub fn status(&self, id: TxId) -> Option<TransactionStatus> {
        let tx = self.ledger.get(id)?;
        let status = match tx.state() {
            TxState::Executed => TransactionStatus::Executed,
            TxState::Failed => TransactionStatus::ExecutionFailed,
            TxState::Pending if self.confirmation_count(id) >= self.quorum() => {
                TransactionStatus::QuorumReached
            }
            TxState::Pending => TransactionStatus::Submitted,
        };
        Some(status)
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Take all events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Vault<Treasury> {
    /// Pooled balance held by the treasury
    pub fn balance(&self) -> u64 {
        self.invoker.balance()
    }
}
