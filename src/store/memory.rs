//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-memory implementation of the ledger store. Each operation takes the lock once, mirroring a
// single-statement round trip to a relational store, and enforces the same composite uniqueness
// constraints a schema would.
//
// | Component      | Description                                                  |
// |----------------|--------------------------------------------------------------|
// | MemoryLedger   | HashMap-backed LedgerStore used by the binary and tests.     |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LedgerStore, StoreError, StoreResult};
use crate::types::{Account, Ask, Bid, Event, OrderKey, Ticket, Transaction};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    accounts_by_email: HashMap<String, Uuid>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<OrderKey, Ticket>,
    asks: HashMap<OrderKey, Ask>,
    bids: HashMap<OrderKey, Bid>,
    transactions: Vec<Transaction>,
}

/// HashMap-backed ledger store.
#[derive(Default)]
pub struct MemoryLedger {
    tables: RwLock<Tables>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_account(&self, account: Account) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        if tables.accounts_by_email.contains_key(&account.email) {
            return Err(StoreError::Duplicate("account.email"));
        }
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate("account.id"));
        }
        tables
            .accounts_by_email
            .insert(account.email.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts_by_email
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::Duplicate("event.id"));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn event_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.tables.read().await.events.values().cloned().collect();
        events.sort_by_key(|event| event.start_time);
        Ok(events)
    }

    async fn set_sales_enabled(&self, event_id: Uuid, enabled: bool) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::NotFound)?;
        event.sales_enabled = enabled;
        Ok(event.clone())
    }

    async fn create_ticket(&self, ticket: Ticket) -> StoreResult<Ticket> {
        let mut tables = self.tables.write().await;
        if tables.tickets.contains_key(&ticket.key()) {
            return Err(StoreError::Duplicate("ticket.owner_id_event_id"));
        }
        tables.tickets.insert(ticket.key(), ticket.clone());
        Ok(ticket)
    }

    async fn ticket(&self, key: OrderKey) -> StoreResult<Option<Ticket>> {
        Ok(self.tables.read().await.tickets.get(&key).cloned())
    }

    async fn set_ticket_listed(&self, key: OrderKey, listed: bool) -> StoreResult<Ticket> {
        let mut tables = self.tables.write().await;
        let ticket = tables.tickets.get_mut(&key).ok_or(StoreError::NotFound)?;
        ticket.listed = listed;
        Ok(ticket.clone())
    }

    async fn mark_ticket_used(&self, key: OrderKey) -> StoreResult<Ticket> {
        let mut tables = self.tables.write().await;
        let ticket = tables.tickets.get_mut(&key).ok_or(StoreError::NotFound)?;
        ticket.used = true;
        Ok(ticket.clone())
    }

    async fn transfer_ticket(&self, key: OrderKey, new_owner_id: Uuid) -> StoreResult<Ticket> {
        let mut tables = self.tables.write().await;
        let new_key = OrderKey::new(new_owner_id, key.event_id);
        if tables.tickets.contains_key(&new_key) {
            return Err(StoreError::Duplicate("ticket.owner_id_event_id"));
        }
        let mut ticket = tables.tickets.remove(&key).ok_or(StoreError::NotFound)?;
        ticket.owner_id = new_owner_id;
        ticket.listed = false;
        tables.tickets.insert(new_key, ticket.clone());
        Ok(ticket)
    }

    async fn create_ask(&self, ask: Ask) -> StoreResult<Ask> {
        let mut tables = self.tables.write().await;
        if tables.asks.contains_key(&ask.key()) {
            return Err(StoreError::Duplicate("ask.owner_id_event_id"));
        }
        tables.asks.insert(ask.key(), ask.clone());
        Ok(ask)
    }

    async fn ask(&self, key: OrderKey) -> StoreResult<Option<Ask>> {
        Ok(self.tables.read().await.asks.get(&key).cloned())
    }

    async fn asks_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Ask>> {
        Ok(self
            .tables
            .read()
            .await
            .asks
            .values()
            .filter(|ask| ask.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn update_ask_price(&self, key: OrderKey, price: Decimal) -> StoreResult<Ask> {
        let mut tables = self.tables.write().await;
        let ask = tables.asks.get_mut(&key).ok_or(StoreError::NotFound)?;
        ask.price = price;
        Ok(ask.clone())
    }

    async fn delete_ask(&self, key: OrderKey) -> StoreResult<Ask> {
        let mut tables = self.tables.write().await;
        tables.asks.remove(&key).ok_or(StoreError::NotFound)
    }

    async fn create_bid(&self, bid: Bid) -> StoreResult<Bid> {
        let mut tables = self.tables.write().await;
        if tables.bids.contains_key(&bid.key()) {
            return Err(StoreError::Duplicate("bid.owner_id_event_id"));
        }
        tables.bids.insert(bid.key(), bid.clone());
        Ok(bid)
    }

    async fn bid(&self, key: OrderKey) -> StoreResult<Option<Bid>> {
        Ok(self.tables.read().await.bids.get(&key).cloned())
    }

    async fn bids_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Bid>> {
        Ok(self
            .tables
            .read()
            .await
            .bids
            .values()
            .filter(|bid| bid.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn update_bid_price(&self, key: OrderKey, price: Decimal) -> StoreResult<Bid> {
        let mut tables = self.tables.write().await;
        let bid = tables.bids.get_mut(&key).ok_or(StoreError::NotFound)?;
        bid.price = price;
        Ok(bid.clone())
    }

    async fn delete_bid(&self, key: OrderKey) -> StoreResult<Bid> {
        let mut tables = self.tables.write().await;
        tables.bids.remove(&key).ok_or(StoreError::NotFound)
    }

    async fn add_transaction(&self, transaction: Transaction) -> StoreResult<Transaction> {
        let mut tables = self.tables.write().await;
        tables.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn transactions_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .tables
            .read()
            .await
            .transactions
            .iter()
            .filter(|transaction| transaction.event_id == event_id)
            .cloned()
            .collect())
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                              | Description                                           |
// |-----------------------------------|-------------------------------------------------------|
// | test_one_order_per_pair           | Composite uniqueness rejects a second ask/bid.        |
// | test_email_unique                 | Duplicate email rejected on account creation.         |
// | test_transfer_moves_key_and_flags | Transfer rehomes the row and clears listed.           |
// | test_transfer_into_owner_rejected | Transfer to an owner that already holds one fails.    |
// | test_delete_missing_is_not_found  | Deleting an absent order reports NotFound.            |
//--------------------------------------------------------------------------------------------------
