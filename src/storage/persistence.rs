//! Vault persistence layer
//!
//! Saves the whole vault (owners, admin, transactions, confirmation matrix,
//! valid-transaction log and treasury) as pretty JSON.

use crate::vault::Vault;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub vault_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".vault_data"),
            vault_file: "vault.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Vault storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn vault_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.vault_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.vault_file, index))
    }

    /// Save the vault to disk
    pub fn save(&self, vault: &Vault) -> Result<(), StorageError> {
        let path = self.vault_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("vault.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, vault)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        log::debug!("Vault saved to {:?}", path);

        Ok(())
    }

    /// Load the vault from disk
    pub fn load(&self) -> Result<Vault, StorageError> {
        let path = self.vault_path();
        if !path.exists() {
            return Err(StorageError::InvalidData("Vault file not found".to_string()));
        }
        load_from_file(&path)
    }

    /// Check if a saved vault exists
    pub fn exists(&self) -> bool {
        self.vault_path().exists()
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<Vault, StorageError> {
        let backup_path = self.backup_path(backup_index);
        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }
        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.vault_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Save vault to a specific file path
pub fn save_to_file(vault: &Vault, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, vault)?;
    Ok(())
}

/// Load vault from a specific file path
pub fn load_from_file(path: &Path) -> Result<Vault, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{Address, Treasury};

    fn sample_vault() -> Vault {
        let owners: Vec<Address> = vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()];
        Vault::new("admin".into(), owners, Treasury::with_balance(100)).unwrap()
    }

    fn storage_in(dir: &Path, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: dir.to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_vault() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);

        let mut vault = sample_vault();
        let (id, _) = vault
            .submit_transaction(&"a".into(), "dest".into(), 10, vec![0xab])
            .unwrap();
        vault.confirm_transaction(&"b".into(), id).unwrap();

        storage.save(&vault).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.owners(), vault.owners());
        assert_eq!(loaded.admin(), vault.admin());
        assert_eq!(loaded.quorum(), 3);
        assert_eq!(loaded.balance(), 100);
        assert_eq!(loaded.confirmation_count(id), 2);
        assert_eq!(loaded.get_transaction(id).unwrap().payload, vec![0xab]);
    }

    #[test]
    fn test_executed_state_survives_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);

        let mut vault = sample_vault();
        let (id, _) = vault
            .submit_transaction(&"a".into(), "dest".into(), 10, vec![])
            .unwrap();
        vault.confirm_transaction(&"b".into(), id).unwrap();
        vault.confirm_transaction(&"c".into(), id).unwrap();
        storage.save(&vault).unwrap();

        let mut loaded = storage.load().unwrap();
        assert!(loaded.get_transaction(id).unwrap().executed());
        assert_eq!(loaded.valid_transactions(), vault.valid_transactions());
        assert_eq!(loaded.balance(), 90);
        assert!(loaded.drain_events().is_empty());
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 3);
        let mut vault = sample_vault();

        for i in 0..5u64 {
            storage.save(&vault).unwrap();
            vault.deposit("donor".into(), i);
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);
        assert!(storage.restore_backup(0).is_ok());
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_export_import() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");
        let vault = sample_vault();

        save_to_file(&vault, &path).unwrap();
        let imported = load_from_file(&path).unwrap();
        assert_eq!(imported.owners().len(), 5);
    }
}
