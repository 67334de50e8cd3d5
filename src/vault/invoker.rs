//! External invocation primitive
//!
//! The vault does not know how value leaves it. An [`Invoker`] receives an
//! immutable view of a transaction that has already been flagged as
//! executed and reports success or failure. It holds no handle on the vault
//! and so cannot re-enter it.

use crate::vault::identity::Address;
use crate::vault::ledger::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait Invoker {
    /// Attempt the transaction's action once. No retries.
    fn invoke(&mut self, tx: &Transaction) -> bool;

    /// Observe an incoming value transfer with an empty payload
    fn receive(&mut self, _from: &Address, _amount: u64) {}
}

/// Pooled balance paying out to destinations.
///
/// An invocation succeeds when the balance covers the value. The payload is
/// opaque and carried through untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Treasury {
    balance: u64,
    /// Total paid out per destination
    payouts: BTreeMap<Address, u64>,
    /// Total received per depositor
    deposits: BTreeMap<Address, u64>,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn paid_to(&self, destination: &Address) -> u64 {
        self.payouts.get(destination).copied().unwrap_or(0)
    }

    pub fn deposited_by(&self, from: &Address) -> u64 {
        self.deposits.get(from).copied().unwrap_or(0)
    }
}

impl Invoker for Treasury {
    fn invoke(&mut self, tx: &Transaction) -> bool {
        if tx.value > self.balance {
            log::warn!(
                "Treasury cannot cover transaction {}: value {}, balance {}",
                tx.id,
                tx.value,
                self.balance
            );
            return false;
        }
        let Some(total) = self.paid_to(&tx.destination).checked_add(tx.value) else {
            return false;
        };
        self.payouts.insert(tx.destination.clone(), total);
        self.balance -= tx.value;
        true
    }

    fn receive(&mut self, from: &Address, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
        let deposited = self.deposits.entry(from.clone()).or_insert(0);
        *deposited = deposited.saturating_add(amount);
    }
}
