//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the marketplace API. Each test drives the router directly and inspects
// both the JSON envelopes and the underlying store state.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{from_slice, json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ticketbook::api::AppState;
use ticketbook::{
    Api, Event, LedgerStore, MemoryLedger, OrderKey, PasswordCipher, Ticket,
};

/// Key generation is the slow part of setup; share one key pair across tests.
fn test_cipher() -> PasswordCipher {
    static CIPHER: OnceLock<PasswordCipher> = OnceLock::new();
    CIPHER
        .get_or_init(|| PasswordCipher::generate().expect("key generation"))
        .clone()
}

/// Sets up a test router backed by a fresh in-memory ledger.
fn setup_test_router() -> (Router, Arc<AppState>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let store = Arc::new(MemoryLedger::new());
    let api = Api::new(addr, store, test_cipher());
    let state = api.state();
    (api.routes(), state)
}

/// Helper to parse JSON responses
async fn parse_json_response(response: Response) -> Value {
    let body_bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    from_slice(&body_bytes).unwrap()
}

/// Helper to POST a JSON body to the router.
async fn post_json(app: &Router, path: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::post(path)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Helper to GET a path from the router.
async fn get(app: &Router, path: &str) -> Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Seeds an event a week out with sales enabled.
async fn seed_event(state: &AppState) -> Uuid {
    let event = Event {
        id: Uuid::new_v4(),
        event_type: "basketball".to_string(),
        opponent: "Visitors".to_string(),
        start_time: chrono::Utc::now() + chrono::Duration::days(7),
        location: "Home Stadium".to_string(),
        sales_enabled: true,
        created_at: chrono::Utc::now(),
    };
    state.store.create_event(event.clone()).await.unwrap();
    event.id
}

/// Seeds an account holding a ticket for the event.
async fn seed_ticket_holder(state: &AppState, event_id: Uuid) -> Uuid {
    let owner = Uuid::new_v4();
    state
        .store
        .create_ticket(Ticket::issue(owner, event_id))
        .await
        .unwrap();
    owner
}

fn order_body(owner: Uuid, event: Uuid, price: i64) -> Value {
    json!({
        "price": price.to_string(),
        "event_id": event.to_string(),
        "owner_id": owner.to_string(),
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup_test_router();
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sign_up_and_sign_in() {
    let (app, _) = setup_test_router();

    let response = post_json(
        &app,
        "/account/create",
        json!({
            "email_address": "fan@example.com",
            "name": "Season Fan",
            "password": "hunter2",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_json_response(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["profile"]["email_address"], "fan@example.com");
    // The stored password never leaves the server.
    assert!(body["profile"].get("password_enc").is_none());
    let profile_id = body["profile"]["id"].as_str().unwrap().to_string();

    // Correct password signs in.
    let response = post_json(
        &app,
        "/account/sign-in",
        json!({ "email_address": "fan@example.com", "password": "hunter2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["profile"]["name"], "Season Fan");

    // Wrong password does not.
    let response = post_json(
        &app,
        "/account/sign-in",
        json!({ "email_address": "fan@example.com", "password": "hunter3" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_json_response(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], "invalid email or password");

    // Profile lookup by id.
    let response = get(&app, &format!("/account/profile?id={}", profile_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["profile"]["name"], "Season Fan");
}

#[tokio::test]
async fn test_create_ticket_once_per_pair() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;

    let response = post_json(
        &app,
        "/account/create",
        json!({
            "email_address": "holder@example.com",
            "name": "Holder",
            "password": "pw",
        }),
    )
    .await;
    let body = parse_json_response(response).await;
    let account_id = body["profile"]["id"].as_str().unwrap().to_string();

    let ticket_body = json!({ "account_id": account_id, "event_id": event_id.to_string() });
    let response = post_json(&app, "/account/create-ticket", ticket_body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(&app, "/account/create-ticket", ticket_body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"], "ticket already exists for this account and event");
}

#[tokio::test]
async fn test_ask_lists_ticket_and_shows_price() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;

    let response = post_json(&app, "/asks/create", order_body(seller, event_id, 50)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["message"], "placed ask");

    let ticket = state
        .store
        .ticket(OrderKey::new(seller, event_id))
        .await
        .unwrap()
        .unwrap();
    assert!(ticket.listed);

    let response = get(&app, &format!("/events/prices/{}", event_id)).await;
    let body = parse_json_response(response).await;
    assert_eq!(body["lowest_ask"], "50");
    assert_eq!(body["highest_bid"], "-1");
}

#[tokio::test]
async fn test_crossing_bid_settles_at_bid_price() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;
    let buyer = Uuid::new_v4();

    post_json(&app, "/asks/create", order_body(seller, event_id, 50)).await;

    let response = post_json(&app, "/bids/create", order_body(buyer, event_id, 60)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_json_response(response).await;
    assert_eq!(
        body["message"],
        format!("transferred ticket to new owner. new owner id: {}", buyer)
    );

    // Ownership moved, listed cleared.
    assert!(state
        .store
        .ticket(OrderKey::new(seller, event_id))
        .await
        .unwrap()
        .is_none());
    let ticket = state
        .store
        .ticket(OrderKey::new(buyer, event_id))
        .await
        .unwrap()
        .unwrap();
    assert!(!ticket.listed);

    // Both orders retired; one transaction at the bid's price.
    assert!(state
        .store
        .ask(OrderKey::new(seller, event_id))
        .await
        .unwrap()
        .is_none());
    assert!(state
        .store
        .bid(OrderKey::new(buyer, event_id))
        .await
        .unwrap()
        .is_none());
    let transactions = state.store.transactions_for_event(event_id).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].price, rust_decimal_macros::dec!(60));
    assert_eq!(transactions[0].buyer_id, buyer);
    assert_eq!(transactions[0].seller_id, seller);
}

#[tokio::test]
async fn test_bid_without_crossing_rests_on_book() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let bidder = Uuid::new_v4();

    let response = post_json(&app, "/bids/create", order_body(bidder, event_id, 40)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["message"], "placed bid");

    let response = get(&app, &format!("/events/prices/{}", event_id)).await;
    let body = parse_json_response(response).await;
    assert_eq!(body["highest_bid"], "40");
    assert_eq!(body["lowest_ask"], "-1");

    let response = get(&app, &format!("/bids?event_id={}", event_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["bids"], json!(["40"]));
}

#[tokio::test]
async fn test_bid_rejected_for_ticket_owner() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let owner = seed_ticket_holder(&state, event_id).await;

    let response = post_json(&app, "/bids/create", order_body(owner, event_id, 40)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_json_response(response).await;
    assert_eq!(
        body["error"],
        "cannot place bid for ticket when one is already owned"
    );
    // Rejected without mutation.
    assert!(state
        .store
        .bid(OrderKey::new(owner, event_id))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_ask_rejected() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;

    post_json(&app, "/asks/create", order_body(seller, event_id, 90)).await;
    let response = post_json(&app, "/asks/create", order_body(seller, event_id, 95)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"], "cannot place multiple asks");
}

#[tokio::test]
async fn test_depth_caps_at_five_prices() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;

    // Six asks from distinct holders, six bids from distinct bidders; prices spread
    // high enough that nothing crosses.
    for i in 0..6i64 {
        let seller = seed_ticket_holder(&state, event_id).await;
        post_json(&app, "/asks/create", order_body(seller, event_id, 100 + i * 10)).await;
        let bidder = Uuid::new_v4();
        post_json(&app, "/bids/create", order_body(bidder, event_id, 10 + i * 5)).await;
    }

    let response = get(&app, &format!("/events/prices/top/{}", event_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(
        body["asks"],
        json!(["100", "110", "120", "130", "140"])
    );
    assert_eq!(body["bids"], json!(["35", "30", "25", "20", "15"]));
}

#[tokio::test]
async fn test_edit_bid_crossing_behaviour() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;
    let buyer = Uuid::new_v4();

    post_json(&app, "/asks/create", order_body(seller, event_id, 50)).await;
    post_json(&app, "/bids/create", order_body(buyer, event_id, 30)).await;

    // Still below the lowest ask: no match.
    let response = post_json(&app, "/bids/edit", order_body(buyer, event_id, 45)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["message"], "updated bid");

    // Meets the lowest ask: settles.
    let response = post_json(&app, "/bids/edit", order_body(buyer, event_id, 50)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let transactions = state.store.transactions_for_event(event_id).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].price, rust_decimal_macros::dec!(50));
}

#[tokio::test]
async fn test_edit_missing_bid_is_not_found() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;

    let response = post_json(&app, "/bids/edit", order_body(Uuid::new_v4(), event_id, 40)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"], "no bid found for this account and event");
}

#[tokio::test]
async fn test_settlement_failure_reports_order_placed() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;
    let buyer = Uuid::new_v4();

    post_json(&app, "/asks/create", order_body(seller, event_id, 50)).await;
    // Resale closes after the ask was accepted.
    state.store.set_sales_enabled(event_id, false).await.unwrap();

    let response = post_json(&app, "/bids/create", order_body(buyer, event_id, 60)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_json_response(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], "error executing sale, bid placed");
    assert_eq!(body["error_message"], "ticket is not transferrable");

    // The bid was persisted despite the failed settlement.
    assert!(state
        .store
        .bid(OrderKey::new(buyer, event_id))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_delete_ask_unlists_ticket() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let seller = seed_ticket_holder(&state, event_id).await;

    post_json(&app, "/asks/create", order_body(seller, event_id, 50)).await;
    let response = post_json(&app, "/asks/delete", order_body(seller, event_id, 50)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ticket = state
        .store
        .ticket(OrderKey::new(seller, event_id))
        .await
        .unwrap()
        .unwrap();
    assert!(!ticket.listed);
    assert!(state
        .store
        .ask(OrderKey::new(seller, event_id))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_order_body_rejected() {
    let (app, _) = setup_test_router();

    // Missing price.
    let response = post_json(
        &app,
        "/bids/create",
        json!({ "event_id": Uuid::new_v4().to_string(), "owner_id": Uuid::new_v4().to_string() }),
    )
    .await;
    assert!(response.status().is_client_error());

    // Non-numeric price.
    let response = post_json(
        &app,
        "/bids/create",
        json!({
            "price": "not-a-number",
            "event_id": Uuid::new_v4().to_string(),
            "owner_id": Uuid::new_v4().to_string(),
        }),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_direct_transfer_route() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let owner = seed_ticket_holder(&state, event_id).await;
    let recipient = Uuid::new_v4();

    let response = post_json(
        &app,
        "/transfer/ticket",
        json!({
            "owner_id": owner.to_string(),
            "new_owner_id": recipient.to_string(),
            "event_id": event_id.to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["message"], "successfully transferred ticket");

    let moved = state
        .store
        .ticket(OrderKey::new(recipient, event_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.owner_id, recipient);
}

#[tokio::test]
async fn test_direct_transfer_rejects_listed_ticket() {
    let (app, state) = setup_test_router();
    let event_id = seed_event(&state).await;
    let owner = seed_ticket_holder(&state, event_id).await;

    post_json(&app, "/asks/create", order_body(owner, event_id, 50)).await;

    let response = post_json(
        &app,
        "/transfer/ticket",
        json!({
            "owner_id": owner.to_string(),
            "new_owner_id": Uuid::new_v4().to_string(),
            "event_id": event_id.to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"], "ticket not transferrable");
}
