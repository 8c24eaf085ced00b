//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | health                | Health check endpoint                  | Response            |
// | create_bid            | Place a bid, settling if it crosses    | ApiResult<Response> |
// | edit_bid              | Reprice a bid                          | ApiResult<Response> |
// | delete_bid            | Cancel a bid                           | ApiResult<Response> |
// | create_ask            | Place an ask, listing the ticket       | ApiResult<Response> |
// | edit_ask              | Reprice an ask                         | ApiResult<Response> |
// | delete_ask            | Cancel an ask, unlisting the ticket    | ApiResult<Response> |
// | list_bids             | Bid prices for an event, highest first | ApiResult<Response> |
// | list_asks             | Ask prices for an event, lowest first  | ApiResult<Response> |
// | list_events           | All events                             | ApiResult<Response> |
// | create_event          | Create an event                        | ApiResult<Response> |
// | event_prices          | Best prices with -1 sentinel           | ApiResult<Response> |
// | event_depth           | Top-5 prices a side                    | ApiResult<Response> |
// | create_account        | Sign-up with encrypted password        | ApiResult<Response> |
// | sign_in               | Decrypt-then-compare sign-in           | ApiResult<Response> |
// | profile               | Fetch an account profile               | ApiResult<Response> |
// | create_ticket         | Issue a ticket for an (account, event) | ApiResult<Response> |
// | transfer_ticket       | Direct transfer outside the book       | ApiResult<Response> |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::{
    ApiError, ApiResult, AppState, CreateAccountRequest, CreateEventRequest, CreateTicketRequest,
    DepthResponse, EventResponse, OrderRequest, PricesResponse, ProfileResponse, SignInRequest,
    TicketResponse, TransferTicketRequest,
};
use crate::orders::Settlement;
use crate::pricing;
use crate::transfer::{is_transferable, owns_ticket};
use crate::types::{Account, OrderKey, OrderSide, Ticket};
use crate::AuthError;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Renders an order-placement outcome. A settled crossing reports the new owner; an
/// unsettled one is the distinguishable "order placed, settlement failed" shape.
fn placement_response(outcome: Settlement, side: OrderSide, verb: &str) -> ApiResult<Response> {
    match outcome {
        Settlement::Placed => {
            let body = serde_json::json!({
                "success": true,
                "message": format!("{verb} {side}"),
            });
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        Settlement::Settled { transaction } => {
            let body = serde_json::json!({
                "success": true,
                "message": format!(
                    "transferred ticket to new owner. new owner id: {}",
                    transaction.buyer_id
                ),
            });
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        Settlement::Unsettled { reason } => Err(ApiError::SettlementFailed {
            message: format!("error executing sale, {side} placed"),
            detail: reason,
        }),
    }
}

/// Place a bid; settles immediately when it crosses the lowest ask.
pub async fn create_bid(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .orders
        .create_bid(req.owner_id, req.event_id, req.price)
        .await?;
    placement_response(outcome, OrderSide::Bid, "placed")
}

/// Reprice an existing bid; re-runs the crossing check.
pub async fn edit_bid(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .orders
        .edit_bid(req.owner_id, req.event_id, req.price)
        .await?;
    placement_response(outcome, OrderSide::Bid, "updated")
}

/// Cancel an existing bid.
pub async fn delete_bid(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    state.orders.delete_bid(req.owner_id, req.event_id).await?;
    let body = serde_json::json!({ "success": true, "message": "deleted bid" });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Place an ask; lists the ticket and settles immediately when it crosses the
/// highest bid.
pub async fn create_ask(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .orders
        .create_ask(req.owner_id, req.event_id, req.price)
        .await?;
    placement_response(outcome, OrderSide::Ask, "placed")
}

/// Reprice an existing ask; re-runs the crossing check.
pub async fn edit_ask(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .orders
        .edit_ask(req.owner_id, req.event_id, req.price)
        .await?;
    placement_response(outcome, OrderSide::Ask, "updated")
}

/// Cancel an existing ask and clear the ticket's listed flag.
pub async fn delete_ask(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> ApiResult<Response> {
    state.orders.delete_ask(req.owner_id, req.event_id).await?;
    let body = serde_json::json!({ "success": true, "message": "deleted ask" });
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn event_id_param(params: &HashMap<String, String>) -> ApiResult<Uuid> {
    let raw = params
        .get("event_id")
        .ok_or_else(|| ApiError::BadRequest("event_id query parameter required".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest("event_id query parameter invalid".to_string()))
}

/// Bid prices for an event, highest first.
pub async fn list_bids(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let event_id = event_id_param(&params)?;
    let bids = state.store.bids_for_event(event_id).await?;
    let prices = pricing::top_bid_prices(&bids, bids.len());
    let body = serde_json::json!({ "success": true, "bids": prices });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Ask prices for an event, lowest first.
pub async fn list_asks(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let event_id = event_id_param(&params)?;
    let asks = state.store.asks_for_event(event_id).await?;
    let prices = pricing::top_ask_prices(&asks, asks.len());
    let body = serde_json::json!({ "success": true, "asks": prices });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// All events, soonest first.
pub async fn list_events(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    let events: Vec<EventResponse> = state
        .store
        .list_events()
        .await?
        .into_iter()
        .map(EventResponse::from)
        .collect();
    let body = serde_json::json!({ "success": true, "events": events });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Create an event.
pub async fn create_event(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<Response> {
    let event = state.store.create_event(req.into_event()).await?;
    let body = serde_json::json!({ "success": true, "event": EventResponse::from(event) });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Best prices for an event; `-1` marks an empty side of the book.
pub async fn event_prices(
    Extension(state): Extension<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Response> {
    let event = state
        .store
        .event_by_id(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;

    let asks = state.store.asks_for_event(event_id).await?;
    let bids = state.store.bids_for_event(event_id).await?;

    let response = PricesResponse {
        success: true,
        event: EventResponse::from(event),
        lowest_ask: pricing::lowest_ask(&asks).map_or(dec!(-1), |ask| ask.price),
        highest_bid: pricing::highest_bid(&bids).map_or(dec!(-1), |bid| bid.price),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Market depth for an event: up to five prices a side.
pub async fn event_depth(
    Extension(state): Extension<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Response> {
    if state.store.event_by_id(event_id).await?.is_none() {
        return Err(ApiError::NotFound("event not found".to_string()));
    }

    let asks = state.store.asks_for_event(event_id).await?;
    let bids = state.store.bids_for_event(event_id).await?;

    let response = DepthResponse {
        success: true,
        asks: pricing::top_ask_prices(&asks, pricing::DEPTH_LIMIT),
        bids: pricing::top_bid_prices(&bids, pricing::DEPTH_LIMIT),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Sign-up; the password is encrypted with the marketplace public key before it
/// touches the store.
pub async fn create_account(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Response> {
    if req.email_address.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("invalid body parameters".to_string()));
    }

    let password_enc = state.cipher.encrypt(&req.password)?;
    let account = Account {
        id: Uuid::new_v4(),
        email: req.email_address,
        name: req.name,
        password_enc,
        created_at: chrono::Utc::now(),
    };

    let account = match state.store.create_account(account).await {
        Ok(account) => account,
        Err(crate::StoreError::Duplicate(_)) => {
            return Err(ApiError::BadRequest(
                "email address already in use".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let body =
        serde_json::json!({ "success": true, "profile": ProfileResponse::from(account) });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Sign-in: decrypt the stored password with the private key and compare.
pub async fn sign_in(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let account = state
        .store
        .account_by_email(&req.email_address)
        .await?
        .ok_or_else(invalid)?;

    let matches = match state.cipher.verify(&account.password_enc, &req.password) {
        Ok(matches) => matches,
        // Undecryptable material cannot match this key pair; same rejection as a
        // wrong password, nothing leaked about which.
        Err(AuthError::Decrypt | AuthError::Encoding(_)) => false,
        Err(err) => return Err(err.into()),
    };
    if !matches {
        return Err(invalid());
    }

    let body =
        serde_json::json!({ "success": true, "profile": ProfileResponse::from(account) });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Fetch an account profile by id.
pub async fn profile(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let raw = params
        .get("id")
        .ok_or_else(|| ApiError::BadRequest("profile id query parameter required".to_string()))?;
    let id = Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest("profile id query parameter invalid".to_string()))?;

    let account = state
        .store
        .account_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile not found".to_string()))?;

    let body =
        serde_json::json!({ "success": true, "profile": ProfileResponse::from(account) });
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Issue a ticket for an (account, event) pair that does not already have one.
pub async fn create_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<Response> {
    if state.store.account_by_id(req.account_id).await?.is_none() {
        return Err(ApiError::NotFound("profile not found".to_string()));
    }
    if state.store.event_by_id(req.event_id).await?.is_none() {
        return Err(ApiError::NotFound("event not found".to_string()));
    }

    let ticket = match state
        .store
        .create_ticket(Ticket::issue(req.account_id, req.event_id))
        .await
    {
        Ok(ticket) => ticket,
        Err(crate::StoreError::Duplicate(_)) => {
            return Err(ApiError::BadRequest(
                "ticket already exists for this account and event".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let body =
        serde_json::json!({ "success": true, "ticket": TicketResponse::from(ticket) });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Direct transfer outside the book: same eligibility checks, no orders involved.
pub async fn transfer_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<TransferTicketRequest>,
) -> ApiResult<Response> {
    let key = OrderKey::new(req.owner_id, req.event_id);
    let ticket = state
        .store
        .ticket(key)
        .await?
        .ok_or_else(|| ApiError::NotFound("ticket not found".to_string()))?;
    let event = state
        .store
        .event_by_id(req.event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;

    if !is_transferable(&ticket, &event) {
        return Err(ApiError::PreconditionFailed {
            message: "ticket not transferrable".to_string(),
            detail: None,
        });
    }
    if owns_ticket(state.store.as_ref(), req.new_owner_id, req.event_id).await? {
        return Err(ApiError::PreconditionFailed {
            message: "new owner already owns ticket".to_string(),
            detail: None,
        });
    }

    let moved = state.store.transfer_ticket(key, req.new_owner_id).await?;
    if moved.owner_id != req.new_owner_id {
        return Err(ApiError::Internal {
            message: "error transferring ticket".to_string(),
            detail: "store did not confirm new owner".to_string(),
        });
    }

    let body =
        serde_json::json!({ "success": true, "message": "successfully transferred ticket" });
    Ok((StatusCode::OK, Json(body)).into_response())
}
