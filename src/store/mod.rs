//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the boundary to the external relational ledger store. The store supports
// single-statement creates, updates, deletes and composite-key point queries. It does NOT offer a
// multi-statement transaction across the matching flow; callers must treat every statement as
// independently committed and re-validate between steps.
//
// | Component      | Description                                                  |
// |----------------|--------------------------------------------------------------|
// | LedgerStore    | Trait describing the store's single-statement operations.    |
// | StoreError     | Errors surfaced by a store implementation.                   |
// | MemoryLedger   | In-memory implementation (see memory.rs).                    |
//--------------------------------------------------------------------------------------------------

mod memory;

pub use memory::MemoryLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Account, Ask, Bid, Event, OrderKey, Ticket, Transaction};

/// Errors surfaced by a ledger store implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("row not found")]
    NotFound,

    /// A uniqueness constraint rejected the statement.
    #[error("uniqueness constraint violated: {0}")]
    Duplicate(&'static str),

    /// The row was mutated by a concurrent writer between read and write.
    #[error("row already mutated")]
    Conflict,

    /// The store backend itself failed (connection, statement, ...).
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// The external relational collaborator holding accounts, events, tickets, asks, bids and
/// transactions. Every method is one statement against the store; there is no way to group
/// several of them atomically.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -- accounts ---------------------------------------------------------------------------------

    /// Inserts an account. Fails with `Duplicate` if the email is already taken.
    async fn create_account(&self, account: Account) -> StoreResult<Account>;

    /// Point query by account id.
    async fn account_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// Point query by unique email.
    async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    // -- events -----------------------------------------------------------------------------------

    /// Inserts an event.
    async fn create_event(&self, event: Event) -> StoreResult<Event>;

    /// Point query by event id.
    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// All events, soonest start time first.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    /// Toggles whether resale is allowed for an event.
    async fn set_sales_enabled(&self, event_id: Uuid, enabled: bool) -> StoreResult<Event>;

    // -- tickets ----------------------------------------------------------------------------------

    /// Inserts a ticket. Fails with `Duplicate` if the (owner, event) pair already has one.
    async fn create_ticket(&self, ticket: Ticket) -> StoreResult<Ticket>;

    /// Point query by composite key.
    async fn ticket(&self, key: OrderKey) -> StoreResult<Option<Ticket>>;

    /// Sets or clears the listed flag; returns the updated row.
    async fn set_ticket_listed(&self, key: OrderKey, listed: bool) -> StoreResult<Ticket>;

    /// Marks a ticket consumed at the venue. Terminal; set from outside the marketplace.
    async fn mark_ticket_used(&self, key: OrderKey) -> StoreResult<Ticket>;

    /// Reassigns ownership and clears the listed flag in one statement; returns the updated
    /// row so the caller can confirm the new owner. Fails with `Duplicate` if the new owner
    /// already holds a ticket for the event.
    async fn transfer_ticket(&self, key: OrderKey, new_owner_id: Uuid) -> StoreResult<Ticket>;

    // -- asks -------------------------------------------------------------------------------------

    /// Inserts an ask. Fails with `Duplicate` if one exists for the pair.
    async fn create_ask(&self, ask: Ask) -> StoreResult<Ask>;

    /// Point query by composite key.
    async fn ask(&self, key: OrderKey) -> StoreResult<Option<Ask>>;

    /// All asks for an event, in insertion order.
    async fn asks_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Ask>>;

    /// Updates the price in place; returns the updated row.
    async fn update_ask_price(&self, key: OrderKey, price: Decimal) -> StoreResult<Ask>;

    /// Removes an ask; returns the deleted row.
    async fn delete_ask(&self, key: OrderKey) -> StoreResult<Ask>;

    // -- bids -------------------------------------------------------------------------------------

    /// Inserts a bid. Fails with `Duplicate` if one exists for the pair.
    async fn create_bid(&self, bid: Bid) -> StoreResult<Bid>;

    /// Point query by composite key.
    async fn bid(&self, key: OrderKey) -> StoreResult<Option<Bid>>;

    /// All bids for an event, in insertion order.
    async fn bids_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Bid>>;

    /// Updates the price in place; returns the updated row.
    async fn update_bid_price(&self, key: OrderKey, price: Decimal) -> StoreResult<Bid>;

    /// Removes a bid; returns the deleted row.
    async fn delete_bid(&self, key: OrderKey) -> StoreResult<Bid>;

    // -- transactions -----------------------------------------------------------------------------

    /// Appends a transaction to the audit trail.
    async fn add_transaction(&self, transaction: Transaction) -> StoreResult<Transaction>;

    /// All transactions recorded for an event, oldest first.
    async fn transactions_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Transaction>>;
}
