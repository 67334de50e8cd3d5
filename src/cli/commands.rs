//! CLI commands for the vault
//!
//! Each mutating command loads the vault, performs exactly one operation,
//! prints the events it produced and saves.

use crate::crypto::KeyPair;
use crate::storage::{Storage, StorageConfig};
use crate::vault::{
    Address, ExecutionOutcome, Transaction, Treasury, TxId, Vault, VaultError, VaultEvent,
};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub vault: Vault,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the vault from `data_dir`
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;
        if !storage.exists() {
            return Err(format!(
                "No vault found in {:?}. Create one with: vault init",
                data_dir
            )
            .into());
        }
        let vault = storage.load()?;

        Ok(Self {
            vault,
            storage,
            data_dir,
        })
    }

    /// Print queued events and persist
    pub fn commit(&mut self) -> CliResult<()> {
        for event in self.vault.drain_events() {
            print_event(&event);
        }
        self.storage.save(&self.vault)?;
        Ok(())
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(config)?)
}

/// Parse a comma-separated owner list
pub fn parse_owners(list: &str) -> Vec<Address> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Address::new)
        .collect()
}

/// Decode an optional hex payload (with or without a 0x prefix)
pub fn parse_payload(payload: Option<&str>) -> CliResult<Vec<u8>> {
    match payload {
        None => Ok(Vec::new()),
        Some(hex_str) => {
            let trimmed = hex_str.trim_start_matches("0x");
            Ok(hex::decode(trimmed).map_err(|e| format!("Invalid hex payload: {}", e))?)
        }
    }
}

fn print_event(event: &VaultEvent) {
    match event {
        VaultEvent::Deposit { from, amount } => println!("   📥 Deposit of {} from {}", amount, from),
        VaultEvent::Submission { id } => println!("   📝 Transaction {} submitted", id),
        VaultEvent::Confirmation { id, owner } => {
            println!("   ✍️  Transaction {} confirmed by {}", id, owner)
        }
        VaultEvent::Revocation { id, owner } => {
            println!("   ↩️  Transaction {} revoked by {}", id, owner)
        }
        VaultEvent::Execution { id } => println!("   ✅ Transaction {} executed", id),
        VaultEvent::ExecutionFailure { id } => {
            println!("   ❌ Transaction {} execution failed (retry possible)", id)
        }
        VaultEvent::OwnerAddition { owner } => println!("   ➕ Owner added: {}", owner),
        VaultEvent::OwnerRemoval { owner } => println!("   ➖ Owner removed: {}", owner),
        VaultEvent::OwnerReplaced { from, to } => println!("   🔁 Owner {} replaced by {}", from, to),
        VaultEvent::QuorumChanged { quorum } => println!("   🧮 Quorum is now {}", quorum),
        VaultEvent::AdminTransferred { from, to } => {
            println!("   👑 Admin transferred from {} to {}", from, to)
        }
    }
}

fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Pending { tally, quorum } => {
            println!("   ⏳ {}/{} confirmations, awaiting quorum", tally, quorum)
        }
        ExecutionOutcome::Executed => println!("   🎉 Executed"),
        ExecutionOutcome::Failed => println!("   ⚠️  Invocation failed; transaction stays executable"),
    }
}

/// Create a new vault
pub fn cmd_init(data_dir: &Path, admin: &str, owners: &str, balance: u64) -> CliResult<()> {
    let storage = open_storage(data_dir)?;
    if storage.exists() {
        println!("⚠️  Vault already exists at {:?}", data_dir);
        return Ok(());
    }

    let vault = Vault::new(
        Address::new(admin),
        parse_owners(owners),
        Treasury::with_balance(balance),
    )?;
    storage.save(&vault)?;

    println!("✅ Vault initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   👑 Admin: {}", vault.admin());
    println!("   👥 Owners: {}", vault.owners().len());
    println!("   🧮 Quorum: {}", vault.quorum());
    println!("   💰 Balance: {}", vault.balance());

    Ok(())
}

/// Generate a fresh owner identity
pub fn cmd_identity_new() -> CliResult<()> {
    let key_pair = KeyPair::generate();

    println!("🔐 New identity created!");
    println!("   📍 Address: {}", key_pair.address());
    println!("   🔑 Public Key: {}", key_pair.public_key_hex());
    println!("   🗝️  Private Key: {}", key_pair.private_key_hex());
    println!("\n   ⚠️  Store the private key safely; it is not saved anywhere.");

    Ok(())
}

/// Recover an identity from its private key
pub fn cmd_identity_show(private_key: &str) -> CliResult<()> {
    let key_pair = KeyPair::from_private_key_hex(private_key.trim())?;

    println!("🔐 Identity");
    println!("   📍 Address: {}", key_pair.address());
    println!("   🔑 Public Key: {}", key_pair.public_key_hex());

    Ok(())
}

/// Show vault summary
pub fn cmd_info(state: &AppState) -> CliResult<()> {
    let vault = &state.vault;

    println!("🏦 Vault Info");
    println!("   ├─ Admin: {}", vault.admin());
    println!("   ├─ Owners: {}", vault.owners().len());
    println!("   ├─ Quorum: {}", vault.quorum());
    println!("   ├─ Balance: {}", vault.balance());
    println!("   ├─ Transactions: {}", vault.transaction_count());
    println!("   ├─ Pending: {}", vault.pending_transactions().len());
    println!("   └─ Executed: {}", vault.valid_transactions().len());

    let stats = state.storage.stats()?;
    println!("💾 Storage");
    println!("   ├─ Data directory: {:?}", stats.data_dir);
    println!("   ├─ Vault file: {} bytes", stats.file_size);
    println!("   └─ Backups: {}", stats.backup_count);

    Ok(())
}

pub fn cmd_owner_list(state: &AppState) -> CliResult<()> {
    println!("👥 Owners (quorum {}):", state.vault.quorum());
    for owner in state.vault.owners() {
        println!("   {}", owner);
    }
    Ok(())
}

pub fn cmd_owner_add(state: &mut AppState, caller: &str, owner: &str) -> CliResult<()> {
    state
        .vault
        .add_owner(&Address::new(caller), Address::new(owner))?;
    state.commit()
}

pub fn cmd_owner_remove(state: &mut AppState, caller: &str, owner: &str) -> CliResult<()> {
    state
        .vault
        .remove_owner(&Address::new(caller), &Address::new(owner))?;
    state.commit()
}

pub fn cmd_owner_replace(state: &mut AppState, caller: &str, from: &str, to: &str) -> CliResult<()> {
    state
        .vault
        .transfer_owner_slot(&Address::new(caller), &Address::new(from), Address::new(to))?;
    state.commit()
}

pub fn cmd_admin_transfer(state: &mut AppState, caller: &str, to: &str) -> CliResult<()> {
    state
        .vault
        .transfer_admin(&Address::new(caller), Address::new(to))?;
    state.commit()
}

pub fn cmd_deposit(state: &mut AppState, from: &str, amount: u64) -> CliResult<()> {
    state.vault.deposit(Address::new(from), amount);
    state.commit()?;
    println!("💰 Balance: {}", state.vault.balance());
    Ok(())
}

pub fn cmd_submit(
    state: &mut AppState,
    caller: &str,
    to: &str,
    value: u64,
    payload: Option<&str>,
) -> CliResult<()> {
    let payload = parse_payload(payload)?;
    let (id, outcome) =
        state
            .vault
            .submit_transaction(&Address::new(caller), Address::new(to), value, payload)?;

    println!("📤 Transaction {} submitted", id);
    state.commit()?;
    print_outcome(&outcome);
    Ok(())
}

pub fn cmd_confirm(state: &mut AppState, caller: &str, id: TxId) -> CliResult<()> {
    let outcome = state
        .vault
        .confirm_transaction(&Address::new(caller), id)?;
    state.commit()?;
    print_outcome(&outcome);
    Ok(())
}

pub fn cmd_revoke(state: &mut AppState, caller: &str, id: TxId) -> CliResult<()> {
    state.vault.revoke_transaction(&Address::new(caller), id)?;
    state.commit()
}

pub fn cmd_execute(state: &mut AppState, caller: &str, id: TxId) -> CliResult<()> {
    let outcome = state
        .vault
        .execute_transaction(&Address::new(caller), id)?;
    state.commit()?;
    print_outcome(&outcome);
    Ok(())
}

fn print_transaction_line(state: &AppState, tx: &Transaction) {
    let status = state
        .vault
        .status(tx.id)
        .map(|s| format!("{:?}", s))
        .unwrap_or_default();
    println!(
        "   #{} | {} -> {} | {}/{} | {}",
        tx.id,
        tx.value,
        tx.destination,
        state.vault.confirmation_count(tx.id),
        state.vault.quorum(),
        status
    );
}

pub fn cmd_tx_list(state: &AppState, pending_only: bool) -> CliResult<()> {
    let transactions: Vec<&Transaction> = if pending_only {
        state.vault.pending_transactions()
    } else {
        state.vault.transactions().iter().collect()
    };

    if transactions.is_empty() {
        println!("📭 No transactions.");
        return Ok(());
    }

    println!("📋 Transactions:");
    for tx in transactions {
        print_transaction_line(state, tx);
    }
    Ok(())
}

pub fn cmd_tx_show(state: &AppState, id: TxId) -> CliResult<()> {
    let tx = state
        .vault
        .get_transaction(id)
        .ok_or(VaultError::InvalidTransaction(id))?;

    println!("📄 Transaction {}", tx.id);
    println!("   ├─ Destination: {}", tx.destination);
    println!("   ├─ Value: {}", tx.value);
    println!("   ├─ Payload: 0x{}", hex::encode(&tx.payload));
    println!("   ├─ Submitted by: {}", tx.submitted_by);
    println!(
        "   ├─ Submitted at: {}",
        tx.submitted_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("   ├─ Attempts: {}", tx.attempts());
    println!("   ├─ Status: {:?}", state.vault.status(id));
    println!("   ├─ Digest: {}", tx.digest());
    println!(
        "   └─ Confirmed by ({}/{}):",
        state.vault.confirmation_count(id),
        state.vault.quorum()
    );
    for owner in state.vault.confirmations(id) {
        println!("      {}", owner);
    }
    Ok(())
}

pub fn cmd_valid(state: &AppState) -> CliResult<()> {
    let valid = state.vault.valid_transactions();
    if valid.is_empty() {
        println!("📭 No executed transactions yet.");
        return Ok(());
    }

    println!("🧾 Executed transactions:");
    for entry in valid {
        println!(
            "   #{} | {:.16} | {}",
            entry.id,
            entry.digest,
            entry.executed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub fn cmd_backup_list(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();
    if backups.is_empty() {
        println!("📭 No backups.");
        return Ok(());
    }

    println!("🗄️  Backups (0 is the most recent):");
    for index in backups {
        println!("   #{}", index);
    }
    Ok(())
}

/// Replace the current vault with a backup
pub fn cmd_backup_restore(state: &mut AppState, index: usize) -> CliResult<()> {
    state.vault = state.storage.restore_backup(index)?;
    state.commit()?;

    println!("♻️  Vault restored from backup {}", index);
    println!("   Owners: {}", state.vault.owners().len());
    println!("   Transactions: {}", state.vault.transaction_count());
    Ok(())
}

/// Export vault to file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.vault, path)?;
    println!("📦 Vault exported to {:?}", path);
    Ok(())
}

/// Import vault from file
pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    state.vault = crate::storage::load_from_file(path)?;
    state.storage.save(&state.vault)?;

    println!("📥 Vault imported from {:?}", path);
    println!("   Owners: {}", state.vault.owners().len());
    println!("   Transactions: {}", state.vault.transaction_count());
    Ok(())
}
