//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Ticket eligibility checks and the match-and-transfer engine. `settle` executes a crossing
// (bid, ask) pair as one logical unit of work against a store that cannot group its statements:
// every step re-validates current store state, and a failure at any step aborts with a
// human-readable reason while leaving earlier-committed rows as they are. The caller decides how
// to report that partial outcome.
//
// | Component        | Description                                                  |
// |------------------|--------------------------------------------------------------|
// | is_transferable  | Pure predicate: may this unlisted ticket change hands?       |
// | owns_ticket      | Does an account hold a ticket for an event?                  |
// | settle           | Execute a crossing bid/ask pair: transfer, record, retire.   |
// | TransferError    | Step-specific failure reasons.                               |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name             | Description                                        | Return Type           |
// |------------------|----------------------------------------------------|----------------------|
// | is_transferable  | Eligibility of an unlisted ticket                  | bool                 |
// | owns_ticket      | Ticket-ownership point check                       | StoreResult<bool>    |
// | settle           | Transfer ownership and retire the matched orders   | Result<Transaction>  |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::store::{LedgerStore, StoreError, StoreResult};
use crate::types::{Ask, Bid, Event, OrderKey, Ticket, Transaction};

/// Reasons a settlement attempt can fail. Each maps to one step of `settle`; the
/// `Cleanup*` variants fire after ownership has already moved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    /// No ticket exists under the ask's (owner, event) key.
    #[error("ticket does not exist")]
    TicketMissing,

    /// The ticket or its event no longer permits a transfer.
    #[error("ticket is not transferrable")]
    NotTransferable,

    /// The bidder already holds a ticket for this event.
    #[error("new owner already owns ticket")]
    AlreadyOwned,

    /// The store did not confirm the ownership change.
    #[error("error transferring ticket")]
    TransferFailed,

    /// The transaction row could not be appended.
    #[error("error adding to transaction table")]
    RecordFailed,

    /// Ownership moved but the matched bid could not be removed.
    #[error("transferred ticket, error deleting bid")]
    CleanupBid,

    /// Ownership moved but the matched ask could not be removed.
    #[error("transferred ticket, error deleting ask")]
    CleanupAsk,

    /// The store backend failed outright; distinct from a business-rule rejection.
    #[error("store failure during settlement: {0}")]
    Store(#[from] StoreError),
}

/// True iff an unlisted, unused ticket may change hands: resale is enabled for the
/// event and the event has not yet started.
pub fn is_transferable(ticket: &Ticket, event: &Event) -> bool {
    !ticket.listed && sale_window_open(ticket, event)
}

/// The listed-independent half of transferability. At match time the ask's ticket is
/// listed by construction, so only these conditions are re-checked.
fn sale_window_open(ticket: &Ticket, event: &Event) -> bool {
    !ticket.used && event.sales_enabled && event.start_time > Utc::now()
}

/// True iff a ticket row exists for the (account, event) pair.
pub async fn owns_ticket(
    store: &dyn LedgerStore,
    owner_id: Uuid,
    event_id: Uuid,
) -> StoreResult<bool> {
    Ok(store.ticket(OrderKey::new(owner_id, event_id)).await?.is_some())
}

/// Executes a crossing (bid, ask) pair: looks the ticket up fresh, re-validates
/// eligibility and bidder non-ownership, transfers ownership, appends the transaction
/// at the bid's price, then retires both orders.
///
/// Nothing observed before this call is trusted; each step reads current store state,
/// so a row deleted or mutated by a concurrent request surfaces as a step failure, not
/// a crash. The settlement price is the bid's price by policy.
///
/// # Arguments
/// * `store` - The ledger store
/// * `bid` - The buy side of the crossing pair
/// * `ask` - The sell side of the crossing pair
///
/// # Returns
/// The appended `Transaction` on success, or the step's `TransferError`.
pub async fn settle(
    store: &dyn LedgerStore,
    bid: &Bid,
    ask: &Ask,
) -> Result<Transaction, TransferError> {
    // Step 1: the ticket being sold must still exist under the ask's key.
    let ticket = store
        .ticket(ask.key())
        .await?
        .ok_or(TransferError::TicketMissing)?;

    // Step 2: re-validate eligibility. The ticket must still be the one the ask
    // listed, unconsumed, with the event's sale window open.
    let event = store
        .event_by_id(ask.event_id)
        .await?
        .ok_or(TransferError::NotTransferable)?;
    if !ticket.listed || !sale_window_open(&ticket, &event) {
        return Err(TransferError::NotTransferable);
    }

    // Step 3: the bidder must not already own a ticket for this event.
    if owns_ticket(store, bid.owner_id, bid.event_id).await? {
        return Err(TransferError::AlreadyOwned);
    }

    // Step 4: reassign ownership and clear the listed flag. A Duplicate or NotFound
    // here means a concurrent request won the race; recoverable, not fatal.
    let moved = match store.transfer_ticket(ask.key(), bid.owner_id).await {
        Ok(ticket) => ticket,
        Err(StoreError::NotFound | StoreError::Duplicate(_) | StoreError::Conflict) => {
            return Err(TransferError::TransferFailed);
        }
        Err(err) => return Err(TransferError::Store(err)),
    };
    if moved.owner_id != bid.owner_id {
        return Err(TransferError::TransferFailed);
    }

    // Step 5: append the audit row at the bid's price.
    let transaction = Transaction {
        id: Uuid::new_v4(),
        buyer_id: bid.owner_id,
        seller_id: ask.owner_id,
        event_id: ask.event_id,
        price: bid.price,
        created_at: Utc::now(),
    };
    let transaction = store
        .add_transaction(transaction)
        .await
        .map_err(|_| TransferError::RecordFailed)?;

    // Steps 6 and 7: retire the matched orders.
    store
        .delete_bid(bid.key())
        .await
        .map_err(|_| TransferError::CleanupBid)?;
    store
        .delete_ask(ask.key())
        .await
        .map_err(|_| TransferError::CleanupAsk)?;

    info!(
        event_id = %ask.event_id,
        buyer_id = %bid.owner_id,
        seller_id = %ask.owner_id,
        price = %bid.price,
        "ticket transferred"
    );

    Ok(transaction)
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                | Description                                         |
// |-------------------------------------|-----------------------------------------------------|
// | test_settle_happy_path              | Crossing pair transfers, records, retires orders.   |
// | test_settle_price_is_bid_price      | Settlement price policy: the bid's price.           |
// | test_settle_missing_ticket          | Absent ticket aborts at step 1.                     |
// | test_settle_sales_disabled          | sales_enabled=false rejected at match time.         |
// | test_settle_used_ticket             | Used ticket rejected at match time.                 |
// | test_settle_started_event           | Event already started rejected at match time.       |
// | test_settle_bidder_owns_ticket      | Bidder with a ticket rejected without mutation.     |
// | test_is_transferable_requires_unlisted | Listed tickets fail the direct-transfer check.   |
//--------------------------------------------------------------------------------------------------
