//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{build_test_router, login, selected_kitchen, send, setup_test_db};

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/ready", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "ok");
    // No API key in tests
    assert_eq!(json["checks"]["speech_to_text"]["status"], "unavailable");
    assert_eq!(json["checks"]["text_to_speech"]["status"], "unavailable");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Sam", "email": "sam@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["user"]["name"], "Sam");
    let user_id = json["user"]["id"].clone();

    // Same email signs in the same account
    let token = login(&app, "SAM@example.com").await;
    let (status, json) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], user_id);
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "", "email": "a@b.c", "password": "pw" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_login_rejects_empty_password() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@b.c", "password": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_google_login_uses_mock_account() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "POST", "/api/auth/google", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["email"], "user@example.com");
    assert_eq!(json["user"]["name"], "Google User");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_kitchens_require_session() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/api/kitchens", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let (status, _) = send(&app, "GET", "/api/kitchens", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_listing_creates_default_kitchen() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let (status, json) = send(&app, "GET", "/api/kitchens", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    let kitchens = json["kitchens"].as_array().unwrap();
    assert_eq!(kitchens.len(), 1);
    assert_eq!(kitchens[0]["name"], "My Kitchen");
    assert_eq!(json["selected_id"], kitchens[0]["id"]);
}

#[tokio::test]
async fn test_kitchen_lifecycle() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let first = selected_kitchen(&app, &token).await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/kitchens",
        Some(&token),
        Some(json!({ "name": "Cabin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cabin = json["id"].as_str().unwrap().to_string();

    // New kitchens are selected
    assert_eq!(selected_kitchen(&app, &token).await, cabin);

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/kitchens/{cabin}"),
        Some(&token),
        Some(json!({ "name": "Lake Cabin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Lake Cabin");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/kitchens/{first}/select"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selected_kitchen(&app, &token).await, first);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/kitchens/{first}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Selection moves to the remaining kitchen
    assert_eq!(selected_kitchen(&app, &token).await, cabin);
}

#[tokio::test]
async fn test_kitchen_name_required() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/kitchens",
        Some(&token),
        Some(json!({ "name": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_kitchen_is_not_found() {
    let app = build_test_router(setup_test_db());
    let owner = login(&app, "owner@example.com").await;
    let intruder = login(&app, "intruder@example.com").await;
    let kitchen = selected_kitchen(&app, &owner).await;

    let (status, json) = send(
        &app,
        "GET",
        &format!("/api/kitchens/{kitchen}/inventory"),
        Some(&intruder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/kitchens/{kitchen}/shopping"),
        Some(&intruder),
        Some(json!({ "name": "milk", "category": "Dairy", "quantity": 1, "unit": "bottle" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_crud_and_filters() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let kitchen = selected_kitchen(&app, &token).await;
    let base = format!("/api/kitchens/{kitchen}/inventory");

    let (status, rice) = send(
        &app,
        "POST",
        &base,
        Some(&token),
        Some(json!({ "name": "Rice", "category": "Grains", "quantity": 5, "unit": "kg", "low_threshold": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let rice_id = rice["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &base,
        Some(&token),
        Some(json!({ "name": "apple", "category": "Fruits", "quantity": 1, "unit": "pcs", "low_threshold": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Sorted by name, case-insensitive
    let (_, json) = send(&app, "GET", &base, Some(&token), None).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["apple", "Rice"]);

    let (_, json) = send(
        &app,
        "GET",
        &format!("{base}?low_stock=true"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["name"], "apple");

    let (_, json) = send(
        &app,
        "GET",
        &format!("{base}?search=ric"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = send(
        &app,
        "PUT",
        &format!("{base}/{rice_id}"),
        Some(&token),
        Some(json!({ "quantity": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quantity"], 8.0);
    assert_eq!(json["unit"], "kg");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("{base}/{rice_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("{base}/{rice_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_decrease_below_threshold_queues_restock() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let kitchen = selected_kitchen(&app, &token).await;

    let (_, milk) = send(
        &app,
        "POST",
        &format!("/api/kitchens/{kitchen}/inventory"),
        Some(&token),
        Some(json!({ "name": "milk", "category": "Dairy", "quantity": 3, "unit": "bottle", "low_threshold": 1 })),
    )
    .await;
    let milk_id = milk["id"].as_str().unwrap();
    let decrease = format!("/api/kitchens/{kitchen}/inventory/{milk_id}/decrease");

    let (status, json) = send(&app, "POST", &decrease, Some(&token), Some(json!({ "amount": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["item"]["quantity"], 2.0);
    assert!(json["restock"].is_null());

    let (_, json) = send(&app, "POST", &decrease, Some(&token), Some(json!({ "amount": 5 }))).await;
    assert_eq!(json["item"]["quantity"], 0.0);
    assert_eq!(json["restock"]["name"], "milk");
    assert_eq!(json["restock"]["quantity"], 2.0);
    assert_eq!(json["restock"]["automatic"], true);

    let (status, _) = send(&app, "POST", &decrease, Some(&token), Some(json!({ "amount": -1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shopping_merge_toggle_and_clear() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let kitchen = selected_kitchen(&app, &token).await;
    let base = format!("/api/kitchens/{kitchen}/shopping");

    let (status, first) = send(
        &app,
        "POST",
        &base,
        Some(&token),
        Some(json!({ "name": "Eggs", "category": "Dairy", "quantity": 6, "unit": "pcs" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, merged) = send(
        &app,
        "POST",
        &base,
        Some(&token),
        Some(json!({ "name": "eggs", "category": "Dairy", "quantity": 6, "unit": "pcs" })),
    )
    .await;
    assert_eq!(merged["id"], first["id"]);
    assert_eq!(merged["quantity"], 12.0);

    let (_, json) = send(&app, "GET", &base, Some(&token), None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let eggs = first["id"].as_str().unwrap();
    let (status, json) = send(
        &app,
        "POST",
        &format!("{base}/{eggs}/toggle"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_checked"], true);

    let (status, json) = send(&app, "DELETE", &format!("{base}/checked"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);

    let (_, json) = send(&app, "GET", &base, Some(&token), None).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_command_adds_to_inventory() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let kitchen = selected_kitchen(&app, &token).await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/voice/command",
        Some(&token),
        Some(json!({ "text": "Add 5 pcs of apple to inventory" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "added");
    assert_eq!(json["message"], "Added 5 pcs of apple to inventory");
    assert_eq!(json["kitchen_id"], kitchen.as_str());
    assert_eq!(json["intent"]["category"], "Fruits");

    let (_, items) = send(
        &app,
        "GET",
        &format!("/api/kitchens/{kitchen}/inventory"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(items[0]["name"], "apple");
    assert_eq!(items[0]["quantity"], 5.0);
    assert_eq!(items[0]["low_threshold"], 1.0);
}

#[tokio::test]
async fn test_voice_command_targets_requested_kitchen() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;
    let home = selected_kitchen(&app, &token).await;

    let (_, cabin) = send(
        &app,
        "POST",
        "/api/kitchens",
        Some(&token),
        Some(json!({ "name": "Cabin" })),
    )
    .await;
    let cabin = cabin["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        "POST",
        "/api/voice/command",
        Some(&token),
        Some(json!({ "text": "add two bottles of milk to shopping list", "kitchen_id": &home })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["kitchen_id"], home.as_str());

    let (_, list) = send(
        &app,
        "GET",
        &format!("/api/kitchens/{home}/shopping"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(list[0]["name"], "milk");
    assert_eq!(list[0]["unit"], "bottle");
    assert_eq!(list[0]["automatic"], false);

    let (_, list) = send(
        &app,
        "GET",
        &format!("/api/kitchens/{cabin}/shopping"),
        Some(&token),
        None,
    )
    .await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_command_clarifications() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/voice/command",
        Some(&token),
        Some(json!({ "text": "add rice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "clarify");
    assert_eq!(json["clarification"]["reason"], "missing_destination");
    assert_eq!(
        json["message"],
        "Please specify if you want to add to inventory or shopping list"
    );

    let (_, json) = send(
        &app,
        "POST",
        "/api/voice/command",
        Some(&token),
        Some(json!({ "text": "add rice to inventory" })),
    )
    .await;
    assert_eq!(json["clarification"]["reason"], "missing_quantity");
    assert_eq!(json["message"], "What quantity of rice would you like to add?");
}

#[tokio::test]
async fn test_voice_command_rejects_empty_text() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/voice/command",
        Some(&token),
        Some(json!({ "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/voice/command",
        None,
        Some(json!({ "text": "add 1 kg rice to inventory" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_speech_endpoints_unconfigured() {
    let app = build_test_router(setup_test_db());
    let token = login(&app, "cook@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice/transcribe")
                .header("Authorization", format!("Bearer {token}"))
                .header("Content-Type", "audio/wav")
                .body(Body::from(vec![0_u8; 64]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let (status, json) = send(
        &app,
        "POST",
        "/api/voice/synthesize",
        None,
        Some(json!({ "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "not_configured");
}

#[tokio::test]
async fn test_voice_capabilities_and_vocabulary() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/api/voice/capabilities", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stt_available"], false);
    assert_eq!(json["tts_available"], false);

    let (status, json) = send(&app, "GET", "/api/voice/vocabulary", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["units"].as_array().unwrap().len(), 13);
    assert_eq!(json["categories"].as_array().unwrap().len(), 14);
    assert_eq!(json["destinations"][1]["destination"], "shopping_list");
    assert_eq!(json["destinations"][1]["phrases"][1], "to shopping list");
}
