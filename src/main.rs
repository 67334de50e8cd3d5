//! Quorum Vault CLI Application
//!
//! A command-line interface for operating a multi-owner vault.

use clap::{Parser, Subcommand};
use quorum_vault::api::{create_router, ApiState};
use quorum_vault::cli::{self, AppState};
use quorum_vault::storage::{Storage, StorageConfig};
use quorum_vault::vault::TxId;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "vault")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A quorum-controlled multi-owner vault", long_about = None)]
struct Cli {
    /// Data directory for vault storage
    #[arg(short, long, default_value = ".vault_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault
    Init {
        /// Admin identity
        #[arg(long)]
        admin: String,

        /// Owner identities (comma-separated, at least 3)
        #[arg(long)]
        owners: String,

        /// Opening treasury balance
        #[arg(long, default_value = "0")]
        balance: u64,
    },

    /// Identity operations
    Identity {
        #[command(subcommand)]
        action: IdentityCommands,
    },

    /// Owner management (admin only, except list)
    Owner {
        #[command(subcommand)]
        action: OwnerCommands,
    },

    /// Admin role operations
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },

    /// Record an incoming value transfer
    Deposit {
        /// Sender identity
        #[arg(short, long)]
        from: String,

        /// Amount deposited
        #[arg(short, long)]
        amount: u64,
    },

    /// Submit a transaction (counts as your confirmation)
    Submit {
        /// Submitting owner
        #[arg(long = "as")]
        caller: String,

        /// Destination identity
        #[arg(short, long)]
        to: String,

        /// Value to transfer
        #[arg(short, long)]
        value: u64,

        /// Hex-encoded payload
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Confirm a transaction
    Confirm {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        id: TxId,
    },

    /// Revoke your confirmation
    Revoke {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        id: TxId,
    },

    /// Re-run the tally and execute at quorum
    Execute {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        id: TxId,
    },

    /// Transaction queries
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// List executed transactions
    Valid,

    /// Display vault information
    Info,

    /// Export vault to file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import vault from file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Saved vault backups
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Generate a new identity key pair
    New,

    /// Show the address and public key for a private key
    Show {
        /// Hex-encoded private key
        #[arg(long)]
        private_key: String,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List available backups
    List,

    /// Replace the current vault with a backup
    Restore {
        /// Backup index (0 is the most recent)
        #[arg(short, long)]
        index: usize,
    },
}

#[derive(Subcommand)]
enum OwnerCommands {
    /// List owners
    List,

    /// Add an owner
    Add {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        owner: String,
    },

    /// Remove an owner
    Remove {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        owner: String,
    },

    /// Replace an owner in place
    Replace {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Hand the admin role to another identity
    Transfer {
        #[arg(long = "as")]
        caller: String,

        #[arg(short, long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// List transactions
    List {
        /// Only transactions not yet executed
        #[arg(long)]
        pending: bool,
    },

    /// Show one transaction
    Show {
        #[arg(short, long)]
        id: TxId,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need a loaded vault
    match &cli.command {
        Commands::Init {
            admin,
            owners,
            balance,
        } => return cli::cmd_init(&cli.data_dir, admin, owners, *balance),
        Commands::Identity { action } => {
            return match action {
                IdentityCommands::New => cli::cmd_identity_new(),
                IdentityCommands::Show { private_key } => cli::cmd_identity_show(private_key),
            }
        }
        Commands::Api { action } => return run_api_command(action, &cli.data_dir),
        _ => {}
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } | Commands::Identity { .. } | Commands::Api { .. } => {
            unreachable!()
        }

        Commands::Owner { action } => match action {
            OwnerCommands::List => cli::cmd_owner_list(&state)?,
            OwnerCommands::Add { caller, owner } => cli::cmd_owner_add(&mut state, &caller, &owner)?,
            OwnerCommands::Remove { caller, owner } => {
                cli::cmd_owner_remove(&mut state, &caller, &owner)?
            }
            OwnerCommands::Replace { caller, from, to } => {
                cli::cmd_owner_replace(&mut state, &caller, &from, &to)?
            }
        },

        Commands::Admin {
            action: AdminCommands::Transfer { caller, to },
        } => cli::cmd_admin_transfer(&mut state, &caller, &to)?,

        Commands::Deposit { from, amount } => cli::cmd_deposit(&mut state, &from, amount)?,

        Commands::Submit {
            caller,
            to,
            value,
            payload,
        } => cli::cmd_submit(&mut state, &caller, &to, value, payload.as_deref())?,

        Commands::Confirm { caller, id } => cli::cmd_confirm(&mut state, &caller, id)?,
        Commands::Revoke { caller, id } => cli::cmd_revoke(&mut state, &caller, id)?,
        Commands::Execute { caller, id } => cli::cmd_execute(&mut state, &caller, id)?,

        Commands::Tx { action } => match action {
            TxCommands::List { pending } => cli::cmd_tx_list(&state, pending)?,
            TxCommands::Show { id } => cli::cmd_tx_show(&state, id)?,
        },

        Commands::Valid => cli::cmd_valid(&state)?,
        Commands::Info => cli::cmd_info(&state)?,
        Commands::Export { output } => cli::cmd_export(&state, &output)?,
        Commands::Import { input } => cli::cmd_import(&mut state, &input)?,

        Commands::Backup { action } => match action {
            BackupCommands::List => cli::cmd_backup_list(&state)?,
            BackupCommands::Restore { index } => cli::cmd_backup_restore(&mut state, index)?,
        },
    }

    Ok(())
}

fn run_api_command(action: &ApiCommands, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                let storage_config = StorageConfig {
                    data_dir: data_dir.to_path_buf(),
                    ..Default::default()
                };
                let storage = Arc::new(Storage::new(storage_config)?);

                if !storage.exists() {
                    return Err(format!(
                        "No vault found in {:?}. Create one with: vault init",
                        data_dir
                    )
                    .into());
                }
                println!("📂 Loading vault...");
                let vault = storage.load()?;

                let state = ApiState::new(vault, Some(storage.clone()));
                let shutdown_state = state.clone();
                let app = create_router(state);

                let addr = format!("0.0.0.0:{}", port);
                println!("🚀 REST API server starting on http://localhost:{}", port);
                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                          - Health check");
                println!("   GET  /ws                              - Event feed");
                println!("   GET  /api/vault                       - Vault info");
                println!("   POST /api/deposit                     - Deposit");
                println!("   GET  /api/transactions                - List transactions");
                println!("   POST /api/transactions                - Submit transaction");
                println!("   GET  /api/transactions/valid          - Executed log");
                println!("   GET  /api/transactions/{{id}}           - Get transaction");
                println!("   POST /api/transactions/{{id}}/confirm   - Confirm");
                println!("   POST /api/transactions/{{id}}/revoke    - Revoke");
                println!("   POST /api/transactions/{{id}}/execute   - Execute");
                println!("   GET  /api/owners                      - Owners and quorum");
                println!("   POST /api/owners                      - Add owner");
                println!("   POST /api/owners/remove               - Remove owner");
                println!("   POST /api/owners/replace              - Replace owner");
                println!("   POST /api/admin/transfer              - Transfer admin");
                println!();

                // Handle Ctrl+C with a final save
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    let vault = shutdown_state.vault.read().await;
                    match storage.save(&vault) {
                        Ok(()) => println!("✅ Vault saved"),
                        Err(e) => log::error!("Failed to save vault on shutdown: {}", e),
                    }
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
