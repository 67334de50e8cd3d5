//! REST API module
//!
//! Provides HTTP access to the vault. The caller identity travels in the
//! JSON body as `caller`.
//!
//! # Endpoints
//!
//! ## Vault
//! - `GET /api/vault` - Admin, owners, quorum, balance, counts
//! - `POST /api/deposit` - Record an incoming value transfer
//!
//! ## Transactions
//! - `GET /api/transactions` - List transactions
//! - `POST /api/transactions` - Submit (auto-confirms for the submitter)
//! - `GET /api/transactions/valid` - Executed transaction log
//! - `GET /api/transactions/{id}` - Transaction with tally and status
//! - `POST /api/transactions/{id}/confirm` - Confirm, then attempt execution
//! - `POST /api/transactions/{id}/revoke` - Withdraw a confirmation
//! - `POST /api/transactions/{id}/execute` - Re-run tally and invoke
//!
//! ## Owners (admin only)
//! - `GET /api/owners` - Owner set and quorum
//! - `POST /api/owners` - Add owner
//! - `POST /api/owners/remove` - Remove owner
//! - `POST /api/owners/replace` - Replace owner in place
//! - `POST /api/admin/transfer` - Transfer the admin role
//!
//! ## WebSocket
//! - `GET /ws` - Vault events as they are committed

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::EventBroadcaster;
