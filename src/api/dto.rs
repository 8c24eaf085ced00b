//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Key Methods         |
// |-----------------------|-------------------------------------------|---------------------|
// | OrderRequest          | Body for bid/ask create, edit and delete  |                     |
// | CreateEventRequest    | Body for event creation                   | into_event          |
// | CreateAccountRequest  | Body for sign-up                          |                     |
// | SignInRequest         | Body for sign-in                          |                     |
// | CreateTicketRequest   | Body for ticket issuance                  |                     |
// | TransferTicketRequest | Body for the direct transfer path         |                     |
// | ProfileResponse       | Account view without password material    | from                |
// | EventResponse         | Event view                                | from                |
// | TicketResponse        | Ticket view                               | from                |
// | PricesResponse        | Best prices for an event, -1 sentinel     |                     |
// | DepthResponse         | Top-5 ask/bid prices for an event         |                     |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Account, Event, Ticket};

/// Body shared by the bid and ask order routes. Typed fields reject missing or
/// non-numeric parameters at the boundary, before any store access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Order price; ignored on delete but accepted for a uniform body shape.
    pub price: Decimal,
    /// The event the order targets.
    pub event_id: Uuid,
    /// The account placing the order.
    pub owner_id: Uuid,
}

/// Body for event creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub event_type: String,
    pub opponent: String,
    pub start_time: DateTime<Utc>,
    pub location: String,
    #[serde(default = "default_sales_enabled")]
    pub sales_enabled: bool,
}

fn default_sales_enabled() -> bool {
    true
}

impl CreateEventRequest {
    /// Converts the request into an Event with a fresh id.
    pub fn into_event(self) -> Event {
        Event {
            id: Uuid::new_v4(),
            event_type: self.event_type,
            opponent: self.opponent,
            start_time: self.start_time,
            location: self.location,
            sales_enabled: self.sales_enabled,
            created_at: Utc::now(),
        }
    }
}

/// Body for sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub email_address: String,
    pub name: String,
    pub password: String,
}

/// Body for sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email_address: String,
    pub password: String,
}

/// Body for ticket issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub account_id: Uuid,
    pub event_id: Uuid,
}

/// Body for the direct transfer path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferTicketRequest {
    pub owner_id: Uuid,
    pub new_owner_id: Uuid,
    pub event_id: Uuid,
}

/// Account view returned to clients; never includes the stored password material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email_address: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for ProfileResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email_address: account.email,
            name: account.name,
            created_at: account.created_at,
        }
    }
}

/// Event view returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub event_type: String,
    pub opponent: String,
    pub start_time: DateTime<Utc>,
    pub location: String,
    pub sales_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            opponent: event.opponent,
            start_time: event.start_time,
            location: event.location,
            sales_enabled: event.sales_enabled,
            created_at: event.created_at,
        }
    }
}

/// Ticket view returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub owner_id: Uuid,
    pub event_id: Uuid,
    pub used: bool,
    pub listed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            owner_id: ticket.owner_id,
            event_id: ticket.event_id,
            used: ticket.used,
            listed: ticket.listed,
            created_at: ticket.created_at,
        }
    }
}

/// Best prices for an event. `-1` is the sentinel for an empty side of the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesResponse {
    pub success: bool,
    pub event: EventResponse,
    pub lowest_ask: Decimal,
    pub highest_bid: Decimal,
}

/// Top-of-book market depth for an event: up to five prices a side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthResponse {
    pub success: bool,
    pub asks: Vec<Decimal>,
    pub bids: Vec<Decimal>,
}
