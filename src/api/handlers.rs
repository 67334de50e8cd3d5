//! REST API handlers for vault operations
//!
//! Mutating handlers hold the vault write lock for the whole call,
//! including any invocation it triggers, then broadcast the drained events
//! and persist.

use crate::api::websocket::EventBroadcaster;
use crate::storage::Storage;
use crate::vault::{
    Address, ExecutionOutcome, Transaction, TransactionStatus, TxId, ValidTransaction, Vault,
    VaultError,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub vault: Arc<RwLock<Vault>>,
    pub storage: Option<Arc<Storage>>,
    pub broadcaster: Arc<EventBroadcaster>,
}

impl ApiState {
    pub fn new(vault: Vault, storage: Option<Arc<Storage>>) -> Self {
        Self {
            vault: Arc::new(RwLock::new(vault)),
            storage,
            broadcaster: Arc::new(EventBroadcaster::new()),
        }
    }

    /// Broadcast queued events and persist. Runs under the write lock.
    fn commit(&self, vault: &mut Vault) {
        for event in vault.drain_events() {
            self.broadcaster.broadcast(event);
        }
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(vault) {
                log::error!("Failed to persist vault: {}", e);
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

fn vault_error(e: VaultError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        VaultError::Unauthorized(_) => StatusCode::FORBIDDEN,
        VaultError::InvalidTransaction(_) => StatusCode::NOT_FOUND,
        VaultError::InvalidIdentity
        | VaultError::InsufficientOwners { .. }
        | VaultError::DuplicateOwner(_) => StatusCode::BAD_REQUEST,
        VaultError::AlreadyOwner(_)
        | VaultError::NotAnOwner(_)
        | VaultError::AlreadyConfirmed { .. }
        | VaultError::NotConfirmed { .. }
        | VaultError::AlreadyExecuted(_) => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
}

#[derive(Serialize)]
pub struct VaultInfo {
    pub admin: Address,
    pub owners: Vec<Address>,
    pub quorum: usize,
    pub balance: u64,
    pub transaction_count: usize,
    pub executed_count: usize,
}

#[derive(Serialize)]
pub struct TransactionInfo {
    pub id: TxId,
    pub destination: Address,
    pub value: u64,
    pub payload: String,
    pub submitted_by: Address,
    pub submitted_at: String,
    pub executed: bool,
    pub status: Option<TransactionStatus>,
    pub attempts: u32,
    pub confirmations: usize,
    pub quorum: usize,
    pub confirmed_by: Vec<Address>,
}

impl TransactionInfo {
    fn new(vault: &Vault, tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            destination: tx.destination.clone(),
            value: tx.value,
            payload: hex::encode(&tx.payload),
            submitted_by: tx.submitted_by.clone(),
            submitted_at: tx.submitted_at.to_rfc3339(),
            executed: tx.executed(),
            status: vault.status(tx.id),
            attempts: tx.attempts(),
            confirmations: vault.confirmation_count(tx.id),
            quorum: vault.quorum(),
            confirmed_by: vault.confirmations(tx.id),
        }
    }
}

#[derive(Serialize)]
pub struct OutcomeResponse {
    pub id: TxId,
    pub executed: bool,
    pub outcome: ExecutionOutcome,
}

impl OutcomeResponse {
    fn new(id: TxId, outcome: ExecutionOutcome) -> Self {
        Self {
            id,
            executed: outcome.is_executed(),
            outcome,
        }
    }
}

#[derive(Serialize)]
pub struct OwnersResponse {
    pub admin: Address,
    pub owners: Vec<Address>,
    pub quorum: usize,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub caller: String,
    pub destination: String,
    pub value: u64,
    /// Hex-encoded, optional
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Deserialize)]
pub struct OwnerRequest {
    pub caller: String,
    pub owner: String,
}

#[derive(Deserialize)]
pub struct ReplaceOwnerRequest {
    pub caller: String,
    pub from: String,
    pub to: String,
}

#[derive(Deserialize)]
pub struct TransferAdminRequest {
    pub caller: String,
    pub new_admin: String,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub from: String,
    pub amount: u64,
}

// ============================================================================
// Query Endpoints
// ============================================================================

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

fn vault_info(vault: &Vault) -> Json<VaultInfo> {
    Json(VaultInfo {
        admin: vault.admin().clone(),
        owners: vault.owners().to_vec(),
        quorum: vault.quorum(),
        balance: vault.balance(),
        transaction_count: vault.transaction_count(),
        executed_count: vault.valid_transactions().len(),
    })
}

/// GET /api/vault
pub async fn get_vault_info(State(state): State<ApiState>) -> Json<VaultInfo> {
    let vault = state.vault.read().await;
    vault_info(&vault)
}

/// GET /api/owners
pub async fn get_owners(State(state): State<ApiState>) -> Json<OwnersResponse> {
    let vault = state.vault.read().await;
    owners_response(&vault)
}

/// GET /api/transactions
pub async fn list_transactions(State(state): State<ApiState>) -> Json<Vec<TransactionInfo>> {
    let vault = state.vault.read().await;
    Json(
        vault
            .transactions()
            .iter()
            .map(|tx| TransactionInfo::new(&vault, tx))
            .collect(),
    )
}

/// GET /api/transactions/{id}
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(id): Path<TxId>,
) -> ApiResult<TransactionInfo> {
    let vault = state.vault.read().await;
    let tx = vault
        .get_transaction(id)
        .ok_or_else(|| vault_error(VaultError::InvalidTransaction(id)))?;
    Ok(Json(TransactionInfo::new(&vault, tx)))
}

/// GET /api/transactions/valid
pub async fn get_valid_transactions(
    State(state): State<ApiState>,
) -> Json<Vec<ValidTransaction>> {
    let vault = state.vault.read().await;
    Json(vault.valid_transactions().to_vec())
}

// ============================================================================
// Transaction Endpoints
// ============================================================================

/// POST /api/transactions
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<OutcomeResponse> {
    let payload = match req.payload.as_deref() {
        None => Vec::new(),
        Some(p) => hex::decode(p.trim_start_matches("0x")).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    error: format!("Invalid hex payload: {}", e),
                }),
            )
        })?,
    };

    let mut vault = state.vault.write().await;
    let (id, outcome) = vault
        .submit_transaction(
            &Address::new(req.caller),
            Address::new(req.destination),
            req.value,
            payload,
        )
        .map_err(vault_error)?;
    state.commit(&mut vault);

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// POST /api/transactions/{id}/confirm
pub async fn confirm_transaction(
    State(state): State<ApiState>,
    Path(id): Path<TxId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<OutcomeResponse> {
    let mut vault = state.vault.write().await;
    let outcome = vault
        .confirm_transaction(&Address::new(req.caller), id)
        .map_err(vault_error)?;
    state.commit(&mut vault);

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// POST /api/transactions/{id}/revoke
pub async fn revoke_transaction(
    State(state): State<ApiState>,
    Path(id): Path<TxId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<TransactionInfo> {
    let mut vault = state.vault.write().await;
    vault
        .revoke_transaction(&Address::new(req.caller), id)
        .map_err(vault_error)?;
    state.commit(&mut vault);

    let tx = vault
        .get_transaction(id)
        .ok_or_else(|| vault_error(VaultError::InvalidTransaction(id)))?;
    Ok(Json(TransactionInfo::new(&vault, tx)))
}

/// POST /api/transactions/{id}/execute
pub async fn execute_transaction(
    State(state): State<ApiState>,
    Path(id): Path<TxId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<OutcomeResponse> {
    let mut vault = state.vault.write().await;
    let outcome = vault
        .execute_transaction(&Address::new(req.caller), id)
        .map_err(vault_error)?;
    state.commit(&mut vault);

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// POST /api/deposit
pub async fn deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> Json<VaultInfo> {
    let mut vault = state.vault.write().await;
    vault.deposit(Address::new(req.from), req.amount);
    state.commit(&mut vault);

    vault_info(&vault)
}

// ============================================================================
// Admin Endpoints
// ============================================================================

fn owners_response(vault: &Vault) -> Json<OwnersResponse> {
    Json(OwnersResponse {
        admin: vault.admin().clone(),
        owners: vault.owners().to_vec(),
        quorum: vault.quorum(),
    })
}

/// POST /api/owners
pub async fn add_owner(
    State(state): State<ApiState>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult<OwnersResponse> {
    let mut vault = state.vault.write().await;
    vault
        .add_owner(&Address::new(req.caller), Address::new(req.owner))
        .map_err(vault_error)?;
    state.commit(&mut vault);
    Ok(owners_response(&vault))
}

/// POST /api/owners/remove
pub async fn remove_owner(
    State(state): State<ApiState>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult<OwnersResponse> {
    let mut vault = state.vault.write().await;
    vault
        .remove_owner(&Address::new(req.caller), &Address::new(req.owner))
        .map_err(vault_error)?;
    state.commit(&mut vault);
    Ok(owners_response(&vault))
}

/// POST /api/owners/replace
pub async fn replace_owner(
    State(state): State<ApiState>,
    Json(req): Json<ReplaceOwnerRequest>,
) -> ApiResult<OwnersResponse> {
    let mut vault = state.vault.write().await;
    vault
        .transfer_owner_slot(
            &Address::new(req.caller),
            &Address::new(req.from),
            Address::new(req.to),
        )
        .map_err(vault_error)?;
    state.commit(&mut vault);
    Ok(owners_response(&vault))
}

/// POST /api/admin/transfer
pub async fn transfer_admin(
    State(state): State<ApiState>,
    Json(req): Json<TransferAdminRequest>,
) -> ApiResult<OwnersResponse> {
    let mut vault = state.vault.write().await;
    vault
        .transfer_admin(&Address::new(req.caller), Address::new(req.new_admin))
        .map_err(vault_error)?;
    state.commit(&mut vault);
    Ok(owners_response(&vault))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{Treasury, VaultEvent};

    fn test_state() -> ApiState {
        let owners: Vec<Address> = vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()];
        let vault = Vault::new("admin".into(), owners, Treasury::with_balance(100)).unwrap();
        ApiState::new(vault, None)
    }

    fn caller(name: &str) -> Json<CallerRequest> {
        Json(CallerRequest {
            caller: name.to_string(),
        })
    }

    async fn submit(state: &ApiState, who: &str, value: u64) -> OutcomeResponse {
        let req = SubmitRequest {
            caller: who.to_string(),
            destination: "shop".to_string(),
            value,
            payload: Some("0xcafe".to_string()),
        };
        submit_transaction(State(state.clone()), Json(req))
            .await
            .map_err(|(status, _)| status)
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_submit_confirm_execute_flow() {
        let state = test_state();
        let mut events = state.broadcaster.subscribe();

        let submitted = submit(&state, "a", 40).await;
        assert!(!submitted.executed);
        assert_eq!(submitted.outcome, ExecutionOutcome::Pending { tally: 1, quorum: 3 });

        confirm_transaction(State(state.clone()), Path(submitted.id), caller("b"))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        let third = confirm_transaction(State(state.clone()), Path(submitted.id), caller("c"))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        assert!(third.0.executed);

        assert_eq!(events.recv().await.unwrap(), VaultEvent::Submission { id: 0 });

        let info = get_transaction(State(state.clone()), Path(0))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        assert!(info.0.executed);
        assert_eq!(info.0.payload, "cafe");

        let valid = get_valid_transactions(State(state.clone())).await;
        assert_eq!(valid.0.len(), 1);
        assert_eq!(get_vault_info(State(state)).await.0.balance, 60);
    }

    #[tokio::test]
    async fn test_error_status_codes() {
        let state = test_state();
        submit(&state, "a", 1).await;

        let err = confirm_transaction(State(state.clone()), Path(0), caller("mallory"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let err = confirm_transaction(State(state.clone()), Path(0), caller("a"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let err = execute_transaction(State(state.clone()), Path(9), caller("a"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let req = SubmitRequest {
            caller: "a".to_string(),
            destination: "shop".to_string(),
            value: 1,
            payload: Some("xyz".to_string()),
        };
        let err = submit_transaction(State(state), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_endpoints() {
        let state = test_state();

        let req = OwnerRequest {
            caller: "admin".to_string(),
            owner: "f".to_string(),
        };
        let owners = add_owner(State(state.clone()), Json(req))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        assert_eq!(owners.0.owners.len(), 6);
        assert_eq!(owners.0.quorum, 3);

        let req = OwnerRequest {
            caller: "a".to_string(),
            owner: "b".to_string(),
        };
        let err = remove_owner(State(state.clone()), Json(req)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let req = TransferAdminRequest {
            caller: "admin".to_string(),
            new_admin: "boss".to_string(),
        };
        let owners = transfer_admin(State(state.clone()), Json(req))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        assert_eq!(owners.0.admin, Address::new("boss"));
    }

    #[tokio::test]
    async fn test_revoke_endpoint() {
        let state = test_state();
        submit(&state, "a", 1).await;

        let info = revoke_transaction(State(state.clone()), Path(0), caller("a"))
            .await
            .map_err(|(status, _)| status)
            .unwrap();
        assert_eq!(info.0.confirmations, 0);
        assert_eq!(info.0.status, Some(TransactionStatus::Submitted));
    }
}
