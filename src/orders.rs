//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Order entry: create, edit and delete standing bids and asks, and trigger settlement when a new
// or edited order crosses the best opposing price. Each (account, event) order slot moves through
// absent -> active -> (matched | cancelled).
//
// Matching for one event is serialized behind a per-event mutex, closing the double-transfer
// window between observing the best opposing price and settling against it. The engine still
// re-validates every step against the store, so a store-level race surfaces as a recoverable
// settlement failure with the originating order left persisted.
//
// | Component        | Description                                                  |
// |------------------|--------------------------------------------------------------|
// | OrderEntry       | Create/edit/delete handlers for both order types.            |
// | Settlement       | Outcome of placing an order: placed, settled, or unsettled.  |
// | OrderError       | Rejections distinct from store/transport failures.           |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name             | Description                                        | Return Type           |
// |------------------|----------------------------------------------------|----------------------|
// | create_bid       | Place a bid, settle if it crosses                  | Result<Settlement>   |
// | edit_bid         | Reprice a bid, settle if it now crosses            | Result<Settlement>   |
// | delete_bid       | Cancel a bid                                       | Result<Bid>          |
// | create_ask       | Place an ask, list the ticket, settle if crossing  | Result<Settlement>   |
// | edit_ask         | Reprice an ask, settle if it now crosses           | Result<Settlement>   |
// | delete_ask       | Cancel an ask, unlist the ticket                   | Result<Ask>          |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::pricing;
use crate::store::{LedgerStore, StoreError};
use crate::transfer::{owns_ticket, settle};
use crate::types::{Ask, Bid, OrderKey, OrderSide, Transaction};

/// Rejections from order entry. Business-rule violations carry the specific message the
/// caller reports; store failures stay distinguishable through the `Store` variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    /// Prices must be strictly positive.
    #[error("invalid body parameters")]
    NonPositivePrice,

    /// An order of this type already exists for the (owner, event) slot.
    #[error("cannot place multiple {0}s")]
    DuplicateOrder(OrderSide),

    /// Asks require the owner to hold a ticket for the event.
    #[error("must own ticket to place ask")]
    TicketRequired,

    /// Bids are rejected when the bidder already owns a ticket for the event.
    #[error("cannot place bid for ticket when one is already owned")]
    AlreadyOwnsTicket,

    /// Edit or delete addressed an order slot that is empty.
    #[error("no {0} found for this account and event")]
    NotFound(OrderSide),

    /// The ask was persisted but the ticket's listed flag could not be set or cleared.
    #[error("failed to list ticket")]
    ListingFailed(#[source] StoreError),

    /// The store backend failed before the order was persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of placing or editing an order. The order itself is persisted in every
/// variant; only the settlement attempt differs.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// No crossing opposing order; the order rests on the book.
    Placed,

    /// The order crossed and the transfer completed.
    Settled { transaction: Transaction },

    /// The order crossed but settlement failed; the order rests on the book and the
    /// caller reports the partial outcome.
    Unsettled { reason: String },
}

/// Order entry service. Holds the store handle and one mutex per event so matching for
/// an event runs single-file.
pub struct OrderEntry {
    store: Arc<dyn LedgerStore>,
    event_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl OrderEntry {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            event_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The serialization lock for one event's matching.
    async fn event_lock(&self, event_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.event_locks.lock().await;
        locks.entry(event_id).or_default().clone()
    }

    // -- bids -------------------------------------------------------------------------------------

    /// Places a bid. The bidder must not already own a ticket for the event or hold
    /// another bid. If the bid meets or exceeds the lowest ask, settlement runs
    /// immediately against it.
    pub async fn create_bid(
        &self,
        owner_id: Uuid,
        event_id: Uuid,
        price: Decimal,
    ) -> Result<Settlement, OrderError> {
        if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice);
        }
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        let key = OrderKey::new(owner_id, event_id);
        if self.store.bid(key).await?.is_some() {
            return Err(OrderError::DuplicateOrder(OrderSide::Bid));
        }
        if owns_ticket(self.store.as_ref(), owner_id, event_id).await? {
            return Err(OrderError::AlreadyOwnsTicket);
        }

        let bid = match self.store.create_bid(Bid::new(owner_id, event_id, price)).await {
            Ok(bid) => bid,
            Err(StoreError::Duplicate(_)) => {
                return Err(OrderError::DuplicateOrder(OrderSide::Bid));
            }
            Err(err) => return Err(err.into()),
        };
        info!(%owner_id, %event_id, %price, "bid placed");

        self.try_settle_bid(&bid).await
    }

    /// Reprices an existing bid. Ownership was validated at creation and cannot change
    /// while the bid is open, so only the slot's existence is checked; the crossing
    /// check then runs against the refreshed best ask.
    pub async fn edit_bid(
        &self,
        owner_id: Uuid,
        event_id: Uuid,
        price: Decimal,
    ) -> Result<Settlement, OrderError> {
        if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice);
        }
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        let key = OrderKey::new(owner_id, event_id);
        let bid = match self.store.update_bid_price(key, price).await {
            Ok(bid) => bid,
            Err(StoreError::NotFound) => return Err(OrderError::NotFound(OrderSide::Bid)),
            Err(err) => return Err(err.into()),
        };
        info!(%owner_id, %event_id, %price, "bid repriced");

        self.try_settle_bid(&bid).await
    }

    /// Cancels a bid. Removing liquidity cannot trigger a match, so no crossing check.
    pub async fn delete_bid(&self, owner_id: Uuid, event_id: Uuid) -> Result<Bid, OrderError> {
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        match self.store.delete_bid(OrderKey::new(owner_id, event_id)).await {
            Ok(bid) => {
                info!(%owner_id, %event_id, "bid cancelled");
                Ok(bid)
            }
            Err(StoreError::NotFound) => Err(OrderError::NotFound(OrderSide::Bid)),
            Err(err) => Err(err.into()),
        }
    }

    /// Crossing check for a bid: execute when the lowest ask's price is at or below the
    /// bid's price. Called with the event lock held.
    async fn try_settle_bid(&self, bid: &Bid) -> Result<Settlement, OrderError> {
        let asks = self.store.asks_for_event(bid.event_id).await?;
        let best = match pricing::lowest_ask(&asks) {
            Some(ask) if ask.price <= bid.price => ask.clone(),
            _ => return Ok(Settlement::Placed),
        };
        Ok(self.run_settlement(bid, &best).await)
    }

    // -- asks -------------------------------------------------------------------------------------

    /// Places an ask. The seller must own a ticket for the event and hold no other ask.
    /// The ticket is marked listed, and if the highest bid meets or exceeds the ask's
    /// price, settlement runs immediately against it.
    pub async fn create_ask(
        &self,
        owner_id: Uuid,
        event_id: Uuid,
        price: Decimal,
    ) -> Result<Settlement, OrderError> {
        if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice);
        }
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        let key = OrderKey::new(owner_id, event_id);
        if self.store.ask(key).await?.is_some() {
            return Err(OrderError::DuplicateOrder(OrderSide::Ask));
        }
        if !owns_ticket(self.store.as_ref(), owner_id, event_id).await? {
            return Err(OrderError::TicketRequired);
        }

        let ask = match self.store.create_ask(Ask::new(owner_id, event_id, price)).await {
            Ok(ask) => ask,
            Err(StoreError::Duplicate(_)) => {
                return Err(OrderError::DuplicateOrder(OrderSide::Ask));
            }
            Err(err) => return Err(err.into()),
        };

        self.store
            .set_ticket_listed(key, true)
            .await
            .map_err(OrderError::ListingFailed)?;
        info!(%owner_id, %event_id, %price, "ask placed, ticket listed");

        self.try_settle_ask(&ask).await
    }

    /// Reprices an existing ask; the crossing check then runs against the refreshed
    /// highest bid.
    pub async fn edit_ask(
        &self,
        owner_id: Uuid,
        event_id: Uuid,
        price: Decimal,
    ) -> Result<Settlement, OrderError> {
        if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice);
        }
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        let key = OrderKey::new(owner_id, event_id);
        let ask = match self.store.update_ask_price(key, price).await {
            Ok(ask) => ask,
            Err(StoreError::NotFound) => return Err(OrderError::NotFound(OrderSide::Ask)),
            Err(err) => return Err(err.into()),
        };
        info!(%owner_id, %event_id, %price, "ask repriced");

        self.try_settle_ask(&ask).await
    }

    /// Cancels an ask and clears the ticket's listed flag.
    pub async fn delete_ask(&self, owner_id: Uuid, event_id: Uuid) -> Result<Ask, OrderError> {
        let lock = self.event_lock(event_id).await;
        let _guard = lock.lock().await;

        let key = OrderKey::new(owner_id, event_id);
        let ask = match self.store.delete_ask(key).await {
            Ok(ask) => ask,
            Err(StoreError::NotFound) => return Err(OrderError::NotFound(OrderSide::Ask)),
            Err(err) => return Err(err.into()),
        };
        self.store
            .set_ticket_listed(key, false)
            .await
            .map_err(OrderError::ListingFailed)?;
        info!(%owner_id, %event_id, "ask cancelled, ticket unlisted");
        Ok(ask)
    }

    /// Crossing check for an ask: execute when the highest bid's price is at or above
    /// the ask's price. Called with the event lock held.
    async fn try_settle_ask(&self, ask: &Ask) -> Result<Settlement, OrderError> {
        let bids = self.store.bids_for_event(ask.event_id).await?;
        let best = match pricing::highest_bid(&bids) {
            Some(bid) if bid.price >= ask.price => bid.clone(),
            _ => return Ok(Settlement::Placed),
        };
        Ok(self.run_settlement(&best, ask).await)
    }

    /// Runs the engine for a crossing pair. The originating order is already committed,
    /// so engine failure is reported as an unsettled placement rather than an error.
    async fn run_settlement(&self, bid: &Bid, ask: &Ask) -> Settlement {
        match settle(self.store.as_ref(), bid, ask).await {
            Ok(transaction) => Settlement::Settled { transaction },
            Err(err) => {
                warn!(
                    event_id = %ask.event_id,
                    bid_owner = %bid.owner_id,
                    ask_owner = %ask.owner_id,
                    reason = %err,
                    "crossing order placed but settlement failed"
                );
                Settlement::Unsettled {
                    reason: err.to_string(),
                }
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                  | Description                                        |
// |---------------------------------------|----------------------------------------------------|
// | test_bid_without_crossing_rests       | Bid below the best ask just rests.                 |
// | test_ask_then_crossing_bid_settles    | The §8-style A/B scenario settles at bid price.    |
// | test_duplicate_orders_rejected        | Second bid/ask for a slot rejected.                |
// | test_bid_rejected_when_owner          | Ticket owners cannot bid on their own event.       |
// | test_ask_requires_ticket              | Asks without a ticket rejected.                    |
// | test_ask_toggles_listed_flag          | Create sets listed, delete clears it.              |
// | test_edit_bid_crossing_behaviour      | Repricing below stays resting; at/above settles.   |
// | test_edit_missing_order_not_found     | Editing an empty slot reports not found.           |
// | test_settlement_failure_keeps_order   | Match-time rejection leaves the new order live.    |
// | test_nonpositive_price_rejected       | Zero or negative prices never reach the store.     |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;
    use crate::types::{Event, Ticket};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    struct Fixture {
        orders: OrderEntry,
        store: Arc<MemoryLedger>,
        event_id: Uuid,
        seller: Uuid,
        buyer: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryLedger::new());
        let event = Event {
            id: Uuid::new_v4(),
            event_type: "basketball".to_string(),
            opponent: "Visitors".to_string(),
            start_time: Utc::now() + Duration::days(7),
            location: "Home Stadium".to_string(),
            sales_enabled: true,
            created_at: Utc::now(),
        };
        store.create_event(event.clone()).await.unwrap();

        let seller = Uuid::new_v4();
        store.create_ticket(Ticket::issue(seller, event.id)).await.unwrap();

        Fixture {
            orders: OrderEntry::new(store.clone() as Arc<dyn LedgerStore>),
            store,
            event_id: event.id,
            seller,
            buyer: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_bid_without_crossing_rests() {
        let fx = fixture().await;
        fx.orders.create_ask(fx.seller, fx.event_id, dec!(50)).await.unwrap();

        let outcome = fx.orders.create_bid(fx.buyer, fx.event_id, dec!(40)).await.unwrap();
        assert_eq!(outcome, Settlement::Placed);
        assert!(fx
            .store
            .bid(OrderKey::new(fx.buyer, fx.event_id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_ask_then_crossing_bid_settles() {
        let fx = fixture().await;
        let outcome = fx.orders.create_ask(fx.seller, fx.event_id, dec!(50)).await.unwrap();
        assert_eq!(outcome, Settlement::Placed);

        let outcome = fx.orders.create_bid(fx.buyer, fx.event_id, dec!(60)).await.unwrap();
        let transaction = match outcome {
            Settlement::Settled { transaction } => transaction,
            other => panic!("expected settlement, got {:?}", other),
        };
        assert_eq!(transaction.buyer_id, fx.buyer);
        assert_eq!(transaction.seller_id, fx.seller);
        assert_eq!(transaction.price, dec!(60));

        let moved = fx
            .store
            .ticket(OrderKey::new(fx.buyer, fx.event_id))
            .await
            .unwrap()
            .unwrap();
        assert!(!moved.listed);
        assert!(fx
            .store
            .ask(OrderKey::new(fx.seller, fx.event_id))
            .await
            .unwrap()
            .is_none());
        assert!(fx
            .store
            .bid(OrderKey::new(fx.buyer, fx.event_id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_orders_rejected() {
        let fx = fixture().await;
        fx.orders.create_bid(fx.buyer, fx.event_id, dec!(40)).await.unwrap();
        let second = fx.orders.create_bid(fx.buyer, fx.event_id, dec!(45)).await;
        assert_eq!(second, Err(OrderError::DuplicateOrder(OrderSide::Bid)));

        fx.orders.create_ask(fx.seller, fx.event_id, dec!(90)).await.unwrap();
        let second = fx.orders.create_ask(fx.seller, fx.event_id, dec!(95)).await;
        assert_eq!(second, Err(OrderError::DuplicateOrder(OrderSide::Ask)));
    }

    #[tokio::test]
    async fn test_bid_rejected_when_owner() {
        let fx = fixture().await;
        let result = fx.orders.create_bid(fx.seller, fx.event_id, dec!(40)).await;
        assert_eq!(result, Err(OrderError::AlreadyOwnsTicket));
        // Rejected without any mutation.
        assert!(fx
            .store
            .bid(OrderKey::new(fx.seller, fx.event_id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ask_requires_ticket() {
        let fx = fixture().await;
        let result = fx.orders.create_ask(fx.buyer, fx.event_id, dec!(50)).await;
        assert_eq!(result, Err(OrderError::TicketRequired));
    }

    #[tokio::test]
    async fn test_ask_toggles_listed_flag() {
        let fx = fixture().await;
        let key = OrderKey::new(fx.seller, fx.event_id);

        fx.orders.create_ask(fx.seller, fx.event_id, dec!(50)).await.unwrap();
        assert!(fx.store.ticket(key).await.unwrap().unwrap().listed);

        fx.orders.delete_ask(fx.seller, fx.event_id).await.unwrap();
        assert!(!fx.store.ticket(key).await.unwrap().unwrap().listed);
    }

    #[tokio::test]
    async fn test_edit_bid_crossing_behaviour() {
        let fx = fixture().await;
        fx.orders.create_ask(fx.seller, fx.event_id, dec!(50)).await.unwrap();
        fx.orders.create_bid(fx.buyer, fx.event_id, dec!(30)).await.unwrap();

        // Below the lowest ask: still resting.
        let outcome = fx.orders.edit_bid(fx.buyer, fx.event_id, dec!(45)).await.unwrap();
        assert_eq!(outcome, Settlement::Placed);

        // Meets the lowest ask: settles at the bid's new price.
        let outcome = fx.orders.edit_bid(fx.buyer, fx.event_id, dec!(50)).await.unwrap();
        match outcome {
            Settlement::Settled { transaction } => assert_eq!(transaction.price, dec!(50)),
            other => panic!("expected settlement, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_edit_missing_order_not_found() {
        let fx = fixture().await;
        let result = fx.orders.edit_bid(fx.buyer, fx.event_id, dec!(40)).await;
        assert_eq!(result, Err(OrderError::NotFound(OrderSide::Bid)));

        let result = fx.orders.edit_ask(fx.seller, fx.event_id, dec!(40)).await;
        assert_eq!(result, Err(OrderError::NotFound(OrderSide::Ask)));
    }

    #[tokio::test]
    async fn test_settlement_failure_keeps_order() {
        let fx = fixture().await;
        fx.orders.create_ask(fx.seller, fx.event_id, dec!(50)).await.unwrap();
        // Resale closes between order entry and the crossing bid.
        fx.store.set_sales_enabled(fx.event_id, false).await.unwrap();

        let outcome = fx.orders.create_bid(fx.buyer, fx.event_id, dec!(60)).await.unwrap();
        match outcome {
            Settlement::Unsettled { reason } => {
                assert_eq!(reason, "ticket is not transferrable");
            }
            other => panic!("expected unsettled placement, got {:?}", other),
        }
        // The bid stayed on the book for the user to retry or cancel.
        assert!(fx
            .store
            .bid(OrderKey::new(fx.buyer, fx.event_id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_nonpositive_price_rejected() {
        let fx = fixture().await;
        let result = fx.orders.create_bid(fx.buyer, fx.event_id, dec!(0)).await;
        assert_eq!(result, Err(OrderError::NonPositivePrice));
        let result = fx.orders.create_ask(fx.seller, fx.event_id, dec!(-5)).await;
        assert_eq!(result, Err(OrderError::NonPositivePrice));
    }
}
