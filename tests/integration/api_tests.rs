//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000";

/// Username that does not collide with earlier runs
fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Utc::now().timestamp_micros())
}

/// Helper to register a user and return its id
async fn register(client: &Client, username: &str, password: &str) -> i64 {
    let response = client
        .post(format!("{}/api/auth/register", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse register response");
    body["userId"].as_i64().expect("No userId in response")
}

async fn create_equipment(client: &Client, name: &str) -> Value {
    let response = client
        .post(format!("{}/api/equipments", BASE_URL))
        .json(&json!({ "name": name, "description": "integration test item" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn equipment_status(client: &Client, id: i64) -> String {
    let body: Value = client
        .get(format!("{}/api/equipments/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["status"].as_str().expect("No status").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let username = unique("alice");
    let user_id = register(&client, &username, "pw123456").await;

    let response = client
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": "pw123456" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["id"].as_i64(), Some(user_id));
    assert_eq!(body["user"]["role"], "user");

    let response = client
        .get(format!("{}/api/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", body["token"].as_str().unwrap()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/api/auth/register", BASE_URL))
        .json(&json!({ "username": username, "password": "another" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_login_failures_look_identical() {
    let client = Client::new();
    let username = unique("carol");
    register(&client, &username, "pw123456").await;

    let wrong_password = client
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(wrong_password.status(), 401);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown_user = client
        .post(format!("{}/api/auth/login", BASE_URL))
        .json(&json!({ "username": unique("nobody"), "password": "pw123456" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(unknown_user.status(), 401);
    let unknown_user: Value = unknown_user.json().await.unwrap();

    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
#[ignore]
async fn test_booking_lifecycle() {
    let client = Client::new();
    let user_id = register(&client, &unique("dave"), "pw123456").await;
    let equipment = create_equipment(&client, "Microscope").await;
    let equipment_id = equipment["id"].as_i64().expect("No equipment ID");
    assert_eq!(equipment["status"], "available");

    let response = client
        .post(format!("{}/api/bookings", BASE_URL))
        .json(&json!({
            "equipment_id": equipment_id,
            "user_id": user_id,
            "booking_date": "2025-03-01"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let booking_id = body["bookingId"].as_i64().expect("No bookingId");

    assert_eq!(equipment_status(&client, equipment_id).await, "booked");

    let response = client
        .post(format!("{}/api/bookings", BASE_URL))
        .json(&json!({
            "equipment_id": equipment_id,
            "user_id": user_id,
            "booking_date": "2025-03-08"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/api/bookings?user_id={}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    let bookings: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(bookings[0]["equipment_name"], "Microscope");

    let response = client
        .delete(format!("{}/api/bookings/{}", BASE_URL, booking_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    assert_eq!(equipment_status(&client, equipment_id).await, "available");

    let response = client
        .delete(format!("{}/api/bookings/{}", BASE_URL, booking_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_delete_equipment_with_active_booking() {
    let client = Client::new();
    let user_id = register(&client, &unique("erin"), "pw123456").await;
    let equipment = create_equipment(&client, "Spectrometer").await;
    let equipment_id = equipment["id"].as_i64().expect("No equipment ID");

    let body: Value = client
        .post(format!("{}/api/bookings", BASE_URL))
        .json(&json!({
            "equipment_id": equipment_id,
            "user_id": user_id,
            "booking_date": "2025-03-01"
        }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let booking_id = body["bookingId"].as_i64().expect("No bookingId");

    let response = client
        .delete(format!("{}/api/equipments/{}", BASE_URL, equipment_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "HasActiveBookings");

    client
        .delete(format!("{}/api/bookings/{}", BASE_URL, booking_id))
        .send()
        .await
        .expect("Failed to send request");

    let response = client
        .delete(format!("{}/api/equipments/{}", BASE_URL, equipment_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/equipments/{}", BASE_URL, equipment_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_invalid_booking_date() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/bookings", BASE_URL))
        .json(&json!({
            "equipment_id": 1,
            "user_id": 1,
            "booking_date": "next tuesday"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
