// Expose the modules
pub mod api;
pub mod auth;
pub mod orders;
pub mod pricing;
pub mod store;
pub mod transfer;
pub mod types;

// Re-export key types for easier usage
pub use api::Api;
pub use auth::{AuthError, PasswordCipher};
pub use orders::{OrderEntry, OrderError, Settlement};
pub use store::{LedgerStore, MemoryLedger, StoreError, StoreResult};
pub use transfer::{is_transferable, owns_ticket, settle, TransferError};
pub use types::{Account, Ask, Bid, Event, OrderKey, OrderSide, Ticket, Transaction};
