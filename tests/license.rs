//! License checks, device registration and plugin downloads.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

fn device_request(token: &str, ip: &str, name: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let body = match name {
        Some(name) => json!({ "device_name": name }),
        None => json!({}),
    };
    let mut request = json_request("POST", "/download/verify", Some(token), body);
    request
        .headers_mut()
        .insert("x-forwarded-for", ip.parse().unwrap());
    request
}

#[tokio::test]
async fn test_validate_running_trial() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let token = token_for(&t.state, &account);

    let (status, body) = send(&t.app, json_request("POST", "/license/validate", Some(&token), json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["plan"], "trial");
    assert_eq!(body["trial_expired"], false);
    assert_eq!(body["time_left"]["days"], 3);
    assert_eq!(body["features"]["max_devices"], 1);
    assert_eq!(body["features"]["cloud_sync"], false);
    assert!(body["expires_at"].is_i64());
}

#[tokio::test]
async fn test_validate_expired_trial_is_forbidden() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let expired_at = chrono::Utc::now().timestamp() - 60;
    set_trial_expiry(&t.state, &account, expired_at);
    let token = token_for(&t.state, &account);

    let (status, body) = send(&t.app, json_request("POST", "/license/validate", Some(&token), json!({}))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["valid"], false);
    assert_eq!(body["trial_expired"], true);
    assert_eq!(body["expires_at"], expired_at);
    assert!(body["upgrade_url"].as_str().unwrap().ends_with("/pricing"));
}

#[tokio::test]
async fn test_validate_paid_and_free_plans() {
    let t = test_app();
    let pro = create_account(&t.state, "pro@example.com");
    set_plan(&t.state, &pro, Plan::Pro);
    let free = create_account(&t.state, "free@example.com");
    set_plan(&t.state, &free, Plan::Free);

    let (status, body) = send(
        &t.app,
        json_request("POST", "/license/validate", Some(&token_for(&t.state, &pro)), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["features"]["max_devices"], 3);
    assert_eq!(body["features"]["priority_support"], true);
    assert!(body.get("time_left").is_none());

    let (status, body) = send(
        &t.app,
        json_request("POST", "/license/validate", Some(&token_for(&t.state, &free)), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["trial_expired"], false);
}

#[tokio::test]
async fn test_validate_for_deleted_account() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let token = token_for(&t.state, &account);
    {
        let conn = t.state.db.get().unwrap();
        queries::delete_account(&conn, &account.id).unwrap();
    }

    let (status, _) = send(&t.app, json_request("POST", "/license/validate", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_device_quota_for_pro_plan() {
    let t = test_app();
    let account = create_account(&t.state, "pro@example.com");
    set_plan(&t.state, &account, Plan::Pro);
    let token = token_for(&t.state, &account);

    for (i, ip) in ["198.51.100.1", "198.51.100.2", "198.51.100.3"].iter().enumerate() {
        let (status, body) = send(&t.app, device_request(&token, ip, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["already_registered"], false);
        assert_eq!(body["devices_used"], i as i64 + 1);
        assert_eq!(body["device"]["name"], format!("Device {}", i + 1));
    }

    let (status, body) = send(&t.app, device_request(&token, "198.51.100.4", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["devices_used"], 3);
    assert_eq!(body["max_devices"], 3);

    // A known device is still recognized at the cap.
    let (status, body) = send(&t.app, device_request(&token, "198.51.100.2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_registered"], true);
    assert_eq!(reload(&t.state, &account).devices.len(), 3);
}

#[tokio::test]
async fn test_removing_a_device_frees_a_slot() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let token = token_for(&t.state, &account);

    let (status, body) = send(&t.app, device_request(&token, "198.51.100.1", Some("Laptop"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"]["name"], "Laptop");
    let fingerprint = body["device"]["fingerprint"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, device_request(&token, "198.51.100.2", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&t.app, get_request("/devices", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["devices"].as_array().unwrap().len(), 1);
    assert_eq!(body["max_devices"], 1);

    let (status, _) = send(
        &t.app,
        json_request("DELETE", &format!("/devices/{}", fingerprint), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        json_request("DELETE", &format!("/devices/{}", fingerprint), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, device_request(&token, "198.51.100.2", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_trial_cannot_register_devices() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    set_trial_expiry(&t.state, &account, chrono::Utc::now().timestamp() - 1);
    let token = token_for(&t.state, &account);

    let (status, body) = send(&t.app, device_request(&token, "198.51.100.1", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["trial_expired"], true);
    assert!(reload(&t.state, &account).devices.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_respect_the_cap() {
    let t = test_app();
    let account = create_account(&t.state, "pro@example.com");
    set_plan(&t.state, &account, Plan::Pro);
    let token = token_for(&t.state, &account);

    let mut handles = Vec::new();
    for i in 0..8 {
        let app = t.app.clone();
        let request = device_request(&token, &format!("192.0.2.{}", i + 1), None);
        handles.push(tokio::spawn(async move { send(&app, request).await.0 }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => accepted += 1,
            StatusCode::FORBIDDEN => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(reload(&t.state, &account).devices.len(), 3);
}

#[tokio::test]
async fn test_plugin_download_requires_paid_plan() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let token = token_for(&t.state, &account);

    let (status, _) = send(
        &t.app,
        json_request("POST", "/download/plugin", Some(&token), json!({ "plugin_id": "smart-home" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    set_plan(&t.state, &account, Plan::Lifetime);

    let (status, body) = send(
        &t.app,
        json_request("POST", "/download/plugin", Some(&token), json!({ "plugin_id": "smart-home" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Smart Home Hub");
    assert!(body["download_url"].as_str().unwrap().ends_with("smart-home.zip"));

    let (status, _) = send(
        &t.app,
        json_request("POST", "/download/plugin", Some(&token), json!({ "plugin_id": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let conn = t.state.db.get().unwrap();
    assert_eq!(queries::count_plugin_downloads(&conn, None).unwrap(), 1);
}
