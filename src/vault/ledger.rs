//! Transaction ledger
//!
//! Append-only table of proposed transactions, the per-transaction
//! confirmation matrix, and the log of successfully executed transactions.

use crate::crypto::sha256_hex;
use crate::vault::error::VaultError;
use crate::vault::identity::Address;
use crate::vault::registry::OwnerRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sequential transaction identifier, starting at 0
pub type TxId = u64;

/// Stored lifecycle state of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// Never invoked, awaiting confirmations
    Pending,
    /// Invocation succeeded; terminal
    Executed,
    /// Last invocation failed; may be retried
    Failed,
}

/// A proposed outgoing action
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub destination: Address,
    pub value: u64,
    pub payload: Vec<u8>,
    pub submitted_by: Address,
    pub submitted_at: DateTime<Utc>,
    state: TxState,
    /// Number of invocation attempts so far
    attempts: u32,
}

impl Transaction {
    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn executed(&self) -> bool {
        self.state == TxState::Executed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// SHA-256 over the immutable fields
    pub fn digest(&self) -> String {
        let mut data = Vec::with_capacity(self.payload.len() + 64);
        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(self.destination.as_str().as_bytes());
        data.extend_from_slice(&self.value.to_be_bytes());
        data.extend_from_slice(&self.payload);
        sha256_hex(&data)
    }
}

/// Audit record of a transaction that reached quorum and executed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidTransaction {
    pub id: TxId,
    pub digest: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
    /// Owners with a standing confirmation, per transaction. Entries of
    /// removed owners are left in place and ignored when tallying.
    confirmations: BTreeMap<TxId, BTreeSet<Address>>,
    valid: Vec<ValidTransaction>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new unexecuted transaction and return its id.
    ///
    /// Does not confirm; the caller's implicit confirmation is applied by
    /// the vault in the same step.
    pub fn submit(
        &mut self,
        registry: &OwnerRegistry,
        caller: &Address,
        destination: Address,
        value: u64,
        payload: Vec<u8>,
    ) -> Result<TxId, VaultError> {
        registry.ensure_owner(caller)?;
        if destination.is_null() {
            return Err(VaultError::InvalidIdentity);
        }

        let id = self.transactions.len() as TxId;
        self.transactions.push(Transaction {
            id,
            destination,
            value,
            payload,
            submitted_by: caller.clone(),
            submitted_at: Utc::now(),
            state: TxState::Pending,
            attempts: 0,
        });
        Ok(id)
    }

    /// Record `caller`'s confirmation of `id`
    pub fn confirm(
        &mut self,
        registry: &OwnerRegistry,
        id: TxId,
        caller: &Address,
    ) -> Result<(), VaultError> {
        registry.ensure_owner(caller)?;
        let tx = self.get(id).ok_or(VaultError::InvalidTransaction(id))?;
        if tx.executed() {
            return Err(VaultError::AlreadyExecuted(id));
        }
        if self.is_confirmed(id, caller) {
            return Err(VaultError::AlreadyConfirmed {
                id,
                owner: caller.clone(),
            });
        }

        self.confirmations
            .entry(id)
            .or_default()
            .insert(caller.clone());
        Ok(())
    }

    /// Withdraw `caller`'s standing confirmation of `id`
    pub fn revoke(
        &mut self,
        registry: &OwnerRegistry,
        id: TxId,
        caller: &Address,
    ) -> Result<(), VaultError> {
        registry.ensure_owner(caller)?;
        let tx = self.get(id).ok_or(VaultError::InvalidTransaction(id))?;
        if !self.is_confirmed(id, caller) {
            return Err(VaultError::NotConfirmed {
                id,
                owner: caller.clone(),
            });
        }
        if tx.executed() {
            return Err(VaultError::AlreadyExecuted(id));
        }

        if let Some(set) = self.confirmations.get_mut(&id) {
            set.remove(caller);
        }
        Ok(())
    }

    pub fn get(&self, id: TxId) -> Option<&Transaction> {
        self.transactions.get(usize::try_from(id).ok()?)
    }

    fn get_mut(&mut self, id: TxId) -> Option<&mut Transaction> {
        self.transactions.get_mut(usize::try_from(id).ok()?)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_confirmed(&self, id: TxId, owner: &Address) -> bool {
        self.confirmations
            .get(&id)
            .map_or(false, |set| set.contains(owner))
    }

    /// Confirmations recorded for `id`, including those of removed owners
    pub fn recorded_confirmations(&self, id: TxId) -> usize {
        self.confirmations.get(&id).map_or(0, BTreeSet::len)
    }

    /// Current owners with a standing confirmation of `id`
    pub fn confirmed_owners(&self, registry: &OwnerRegistry, id: TxId) -> Vec<Address> {
        registry
            .owners()
            .iter()
            .filter(|owner| self.is_confirmed(id, owner))
            .cloned()
            .collect()
    }

    /// Count of current owners with a standing confirmation of `id`
    pub fn tally(&self, registry: &OwnerRegistry, id: TxId) -> usize {
        registry
            .owners()
            .iter()
            .filter(|owner| self.is_confirmed(id, owner))
            .count()
    }

    /// Flag `id` as executed ahead of invocation and return it.
    pub(crate) fn begin_execution(&mut self, id: TxId) -> Option<&Transaction> {
        let tx = self.get_mut(id)?;
        tx.state = TxState::Executed;
        tx.attempts += 1;
        Some(tx)
    }

    /// Settle an invocation started with [`Self::begin_execution`]
    pub(crate) fn finish_execution(&mut self, id: TxId, success: bool) {
        let Some(tx) = self.get_mut(id) else {
            return;
        };
        if success {
            let record = ValidTransaction {
                id,
                digest: tx.digest(),
                executed_at: Utc::now(),
            };
            self.valid.push(record);
        } else {
            tx.state = TxState::Failed;
        }
    }

    /// Transactions that reached quorum and executed, in execution order
    pub fn valid_transactions(&self) -> &[ValidTransaction] {
        &self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn setup() -> (OwnerRegistry, TransactionLedger) {
        let owners = vec![addr("a"), addr("b"), addr("c"), addr("d"), addr("e")];
        let registry = OwnerRegistry::new(addr("admin"), owners).unwrap();
        (registry, TransactionLedger::new())
    }

    #[test]
    fn test_submit_assigns_sequential_ids() {
        let (reg, mut ledger) = setup();
        let id0 = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();
        let id1 = ledger
            .submit(&reg, &addr("b"), addr("y"), 2, vec![0xde, 0xad])
            .unwrap();

        assert_eq!((id0, id1), (0, 1));
        assert_eq!(ledger.len(), 2);
        let tx = ledger.get(1).unwrap();
        assert_eq!(tx.submitted_by, addr("b"));
        assert_eq!(tx.state(), TxState::Pending);
        assert!(!tx.executed());
        assert_eq!(ledger.recorded_confirmations(1), 0);
    }

    #[test]
    fn test_submit_rejections() {
        let (reg, mut ledger) = setup();
        assert_eq!(
            ledger
                .submit(&reg, &addr("mallory"), addr("x"), 1, vec![])
                .unwrap_err(),
            VaultError::Unauthorized(addr("mallory"))
        );
        assert_eq!(
            ledger
                .submit(&reg, &addr("a"), Address::null(), 1, vec![])
                .unwrap_err(),
            VaultError::InvalidIdentity
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_confirm_rules() {
        let (reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();

        ledger.confirm(&reg, id, &addr("b")).unwrap();
        assert!(ledger.is_confirmed(id, &addr("b")));
        assert_eq!(
            ledger.confirm(&reg, id, &addr("b")).unwrap_err(),
            VaultError::AlreadyConfirmed {
                id,
                owner: addr("b")
            }
        );
        assert_eq!(
            ledger.confirm(&reg, 7, &addr("b")).unwrap_err(),
            VaultError::InvalidTransaction(7)
        );
        assert_eq!(
            ledger.confirm(&reg, id, &addr("z")).unwrap_err(),
            VaultError::Unauthorized(addr("z"))
        );
    }

    #[test]
    fn test_confirm_slot_zero_without_submission() {
        let (reg, mut ledger) = setup();
        assert_eq!(
            ledger.confirm(&reg, 0, &addr("a")).unwrap_err(),
            VaultError::InvalidTransaction(0)
        );
    }

    #[test]
    fn test_revoke_rules() {
        let (reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();

        assert_eq!(
            ledger.revoke(&reg, id, &addr("c")).unwrap_err(),
            VaultError::NotConfirmed {
                id,
                owner: addr("c")
            }
        );
        ledger.confirm(&reg, id, &addr("c")).unwrap();
        ledger.revoke(&reg, id, &addr("c")).unwrap();
        assert!(!ledger.is_confirmed(id, &addr("c")));
        assert_eq!(
            ledger.revoke(&reg, 3, &addr("c")).unwrap_err(),
            VaultError::InvalidTransaction(3)
        );
    }

    #[test]
    fn test_executed_transaction_is_frozen() {
        let (reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();
        ledger.confirm(&reg, id, &addr("a")).unwrap();

        ledger.begin_execution(id).unwrap();
        ledger.finish_execution(id, true);

        assert_eq!(
            ledger.revoke(&reg, id, &addr("a")).unwrap_err(),
            VaultError::AlreadyExecuted(id)
        );
        assert_eq!(
            ledger.confirm(&reg, id, &addr("b")).unwrap_err(),
            VaultError::AlreadyExecuted(id)
        );
        assert_eq!(ledger.valid_transactions().len(), 1);
        assert_eq!(ledger.valid_transactions()[0].digest, ledger.get(id).unwrap().digest());
    }

    #[test]
    fn test_failed_execution_resets_flag() {
        let (reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();

        assert!(ledger.begin_execution(id).unwrap().executed());
        ledger.finish_execution(id, false);

        let tx = ledger.get(id).unwrap();
        assert!(!tx.executed());
        assert_eq!(tx.state(), TxState::Failed);
        assert_eq!(tx.attempts(), 1);
        assert!(ledger.valid_transactions().is_empty());
    }

    #[test]
    fn test_tally_ignores_removed_owners() {
        let (mut reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 1, vec![]).unwrap();
        ledger.confirm(&reg, id, &addr("a")).unwrap();
        ledger.confirm(&reg, id, &addr("b")).unwrap();
        assert_eq!(ledger.tally(&reg, id), 2);

        let cap = reg.authorize_admin(&addr("admin")).unwrap();
        reg.remove_owner(&cap, &addr("b")).unwrap();

        assert_eq!(ledger.tally(&reg, id), 1);
        assert_eq!(ledger.recorded_confirmations(id), 2);
        assert_eq!(ledger.confirmed_owners(&reg, id), vec![addr("a")]);
    }

    #[test]
    fn test_digest_covers_payload() {
        let (reg, mut ledger) = setup();
        let id = ledger.submit(&reg, &addr("a"), addr("x"), 5, vec![1]).unwrap();
        let tx = ledger.get(id).unwrap();
        let mut altered = tx.clone();
        altered.payload = vec![2];
        assert_eq!(tx.digest(), tx.clone().digest());
        assert_ne!(tx.digest(), altered.digest());
    }
}
