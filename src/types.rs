//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types of the ticket resale marketplace: accounts, events,
// tickets, standing orders (asks and bids) and completed transactions.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Discrete sets of values (OrderSide).                             |
// | STRUCTS            | The marketplace entities and the composite order key.            |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                  |
// |---------------|----------------------------------------------|
// | OrderSide     | Which side of the book an order sits on.     |
//--------------------------------------------------------------------------------------------------

/// Which side of the book a standing order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// A standing buy order.
    Bid,
    /// A standing sell order.
    Ask,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "bid"),
            OrderSide::Ask => write!(f, "ask"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                                  |
// |---------------|--------------------------------------------------------------|
// | OrderKey      | Composite (owner, event) identity for tickets and orders.    |
// | Account       | A marketplace account.                                       |
// | Event         | An event tickets are sold for.                               |
// | Ticket        | Access for one account to one event.                         |
// | Ask           | Standing sell order.                                         |
// | Bid           | Standing buy order.                                          |
// | Transaction   | Immutable record of a completed transfer.                    |
//--------------------------------------------------------------------------------------------------

/// Composite identity shared by tickets, asks and bids: one row per (account, event) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    /// The owning account.
    pub owner_id: Uuid,
    /// The event the row belongs to.
    pub event_id: Uuid,
}

impl OrderKey {
    pub fn new(owner_id: Uuid, event_id: Uuid) -> Self {
        Self { owner_id, event_id }
    }
}

/// A marketplace account. The password is held asymmetrically encrypted at rest
/// (base64 RSA-OAEP ciphertext), never in the clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account.
    pub id: Uuid,
    /// Email address, unique across accounts.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Encrypted password material.
    pub password_enc: String,
    /// Timestamp of account creation.
    pub created_at: DateTime<Utc>,
}

/// An event that tickets grant access to. `sales_enabled` and `start_time` together
/// gate whether its tickets are transferable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for the event.
    pub id: Uuid,
    /// Kind of event (e.g. "basketball").
    pub event_type: String,
    /// The visiting side.
    pub opponent: String,
    /// When the event starts.
    pub start_time: DateTime<Utc>,
    /// Venue location.
    pub location: String,
    /// Whether resale is currently allowed for this event.
    pub sales_enabled: bool,
    /// Timestamp of event creation.
    pub created_at: DateTime<Utc>,
}

/// Access for one account to one event. Keyed by (owner, event); `owner_id` mutates
/// on a successful transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// The current owner.
    pub owner_id: Uuid,
    /// The event this ticket admits to.
    pub event_id: Uuid,
    /// Consumed at the venue; terminal.
    pub used: bool,
    /// True while an ask is open for this ticket.
    pub listed: bool,
    /// Timestamp of ticket issuance.
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Issues a fresh, unused, unlisted ticket for the pair.
    pub fn issue(owner_id: Uuid, event_id: Uuid) -> Self {
        Self {
            owner_id,
            event_id,
            used: false,
            listed: false,
            created_at: Utc::now(),
        }
    }

    /// The composite key this ticket is stored under.
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.owner_id, self.event_id)
    }
}

/// A standing sell order for one ticket to one event. Exists only while its owner
/// still owns an eligible ticket; removed on match or cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ask {
    /// The selling account.
    pub owner_id: Uuid,
    /// The event being sold.
    pub event_id: Uuid,
    /// Asking price.
    pub price: Decimal,
    /// Timestamp of order placement, used for time priority.
    pub created_at: DateTime<Utc>,
}

impl Ask {
    pub fn new(owner_id: Uuid, event_id: Uuid, price: Decimal) -> Self {
        Self {
            owner_id,
            event_id,
            price,
            created_at: Utc::now(),
        }
    }

    /// The composite key this ask is stored under.
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.owner_id, self.event_id)
    }
}

/// A standing buy order for one ticket to one event. An account may not hold a bid
/// for an event it already owns a ticket to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// The buying account.
    pub owner_id: Uuid,
    /// The event being bid on.
    pub event_id: Uuid,
    /// Bid price.
    pub price: Decimal,
    /// Timestamp of order placement, used for time priority.
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(owner_id: Uuid, event_id: Uuid, price: Decimal) -> Self {
        Self {
            owner_id,
            event_id,
            price,
            created_at: Utc::now(),
        }
    }

    /// The composite key this bid is stored under.
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.owner_id, self.event_id)
    }
}

/// Immutable record of a completed transfer; the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction.
    pub id: Uuid,
    /// The account that bought the ticket.
    pub buyer_id: Uuid,
    /// The account that sold the ticket.
    pub seller_id: Uuid,
    /// The event the ticket admits to.
    pub event_id: Uuid,
    /// Settlement price.
    pub price: Decimal,
    /// Timestamp of settlement.
    pub created_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                       | Description                                      |
// |----------------------------|--------------------------------------------------|
// | test_ticket_issue          | Fresh tickets are unused and unlisted.           |
// | test_order_keys_align      | Ticket/ask/bid keys agree for the same pair.     |
// | test_side_display          | OrderSide renders as lowercase words.            |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ticket_issue() {
        let owner = Uuid::new_v4();
        let event = Uuid::new_v4();
        let ticket = Ticket::issue(owner, event);
        assert_eq!(ticket.owner_id, owner);
        assert_eq!(ticket.event_id, event);
        assert!(!ticket.used);
        assert!(!ticket.listed);
    }

    #[test]
    fn test_order_keys_align() {
        let owner = Uuid::new_v4();
        let event = Uuid::new_v4();
        let ticket = Ticket::issue(owner, event);
        let ask = Ask::new(owner, event, dec!(50));
        let bid = Bid::new(owner, event, dec!(60));
        assert_eq!(ticket.key(), ask.key());
        assert_eq!(ask.key(), bid.key());
        assert_eq!(ask.key(), OrderKey::new(owner, event));
    }

    #[test]
    fn test_side_display() {
        assert_eq!(OrderSide::Bid.to_string(), "bid");
        assert_eq!(OrderSide::Ask.to_string(), "ask");
    }
}
