//! Admin dashboard API.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

/// An admin account (flag set in storage) and its token.
fn admin(t: &TestApp) -> (Account, String) {
    let account = create_account(&t.state, "ops@example.com");
    {
        let conn = t.state.db.get().unwrap();
        queries::set_admin_by_email(&conn, &account.email).unwrap();
    }
    let account = reload(&t.state, &account);
    let token = token_for(&t.state, &account);
    (account, token)
}

#[tokio::test]
async fn test_admin_routes_reject_regular_accounts() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let token = token_for(&t.state, &account);

    let (status, _) = send(&t.app, get_request("/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&t.app, get_request("/admin/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_status_comes_from_storage_not_the_token() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let forged = t
        .state
        .sessions
        .issue(omega::jwt::SessionClaims {
            account_id: account.id.clone(),
            email: account.email.clone(),
            is_admin: true,
        })
        .unwrap();

    let (status, _) = send(&t.app, get_request("/admin/stats", Some(&forged))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Listed in ADMIN_EMAILS without the flag is enough.
    let configured = create_account(&t.state, ADMIN_EMAIL);
    let token = token_for(&t.state, &configured);
    let (status, _) = send(&t.app, get_request("/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_count_accounts_by_plan() {
    let t = test_app();
    let (_, token) = admin(&t);
    let pro = create_account(&t.state, "pro@example.com");
    set_plan(&t.state, &pro, Plan::Pro);
    create_account(&t.state, "trial@example.com");

    let (status, body) = send(&t.app, get_request("/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 3);
    assert_eq!(body["trial_users"], 2);
    assert_eq!(body["pro_users"], 1);
    assert_eq!(body["recent_registrations"], 3);
}

#[tokio::test]
async fn test_user_search_and_listing() {
    let t = test_app();
    let (_, token) = admin(&t);
    create_account(&t.state, "alice@example.com");
    create_account(&t.state, "bob@example.org");

    let (status, body) = send(&t.app, get_request("/admin/users", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert!(body["users"][0].get("password_hash").is_none());

    let (status, body) = send(&t.app, get_request("/admin/users?query=example.org", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["email"], "bob@example.org");

    let (status, _) = send(&t.app, get_request("/admin/users?query=b", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_user_but_never_self() {
    let t = test_app();
    let (me, token) = admin(&t);
    let other = create_account(&t.state, "ada@example.com");

    let (status, _) = send(
        &t.app,
        json_request("DELETE", &format!("/admin/users/{}", me.id), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        json_request("DELETE", &format!("/admin/users/{}", other.id), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        json_request("DELETE", &format!("/admin/users/{}", other.id), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_override_keeps_trial_invariant() {
    let t = test_app();
    let (_, token) = admin(&t);
    let account = create_account(&t.state, "ada@example.com");
    let uri = format!("/admin/users/{}/plan", account.id);

    let (status, body) = send(&t.app, json_request("PUT", &uri, Some(&token), json!({ "plan": "business" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["plan"], "business");
    assert_eq!(body["user"]["max_devices"], 10);
    assert!(body["user"]["trial_expires_at"].is_null());

    let (status, body) = send(&t.app, json_request("PUT", &uri, Some(&token), json!({ "plan": "trial" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["max_devices"], 1);
    let expires_at = body["user"]["trial_expires_at"].as_i64().unwrap();
    assert!(expires_at > chrono::Utc::now().timestamp() + 2 * 24 * 3600);

    let (status, _) = send(&t.app, json_request("PUT", &uri, Some(&token), json!({ "plan": "platinum" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        json_request("PUT", "/admin/users/missing/plan", Some(&token), json!({ "plan": "pro" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_notes() {
    let t = test_app();
    let (me, token) = admin(&t);
    let account = create_account(&t.state, "ada@example.com");
    let uri = format!("/admin/users/{}/notes", account.id);

    let (status, body) = send(
        &t.app,
        json_request("POST", &uri, Some(&token), json!({ "note": "Asked about refunds" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["created_by"], me.email);

    let (status, _) = send(&t.app, json_request("POST", &uri, Some(&token), json!({ "note": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&t.app, get_request(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"].as_array().unwrap().len(), 1);
    assert_eq!(body["notes"][0]["note"], "Asked about refunds");
}

#[tokio::test]
async fn test_campaign_counts_recipients_for_target_plan() {
    let t = test_app();
    let (_, token) = admin(&t);
    let pro = create_account(&t.state, "pro@example.com");
    set_plan(&t.state, &pro, Plan::Pro);
    create_account(&t.state, "trial@example.com");

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/admin/campaigns",
            Some(&token),
            json!({ "subject": "New plugins", "message": "Ten more!", "target_plan": "trial" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // The admin account and the trial account.
    assert_eq!(body["campaign"]["recipient_count"], 2);
    assert_eq!(body["campaign"]["target_plan"], "trial");

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/admin/campaigns",
            Some(&token),
            json!({ "subject": "Hello all", "message": "Hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["campaign"]["recipient_count"], 3);
    assert_eq!(body["campaign"]["target_plan"], "all");

    let (status, body) = send(&t.app, get_request("/admin/campaigns", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["campaigns"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stripe_backed_routes_need_stripe() {
    let t = test_app();
    let (_, token) = admin(&t);
    let account = create_account(&t.state, "ada@example.com");
    set_customer(&t.state, &account, "cus_1", Some("sub_1"));

    let (status, _) = send(&t.app, get_request("/admin/revenue", Some(&token))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&t.app, get_request("/admin/subscriptions", Some(&token))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/admin/users/{}/cancel-subscription", account.id),
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    // Nothing changes locally when Stripe was not told.
    assert_eq!(reload(&t.state, &account).subscription_id.as_deref(), Some("sub_1"));
}

#[tokio::test]
async fn test_health_reports_degraded_without_stripe() {
    let t = test_app();
    let (_, token) = admin(&t);

    let (status, body) = send(&t.app, get_request("/admin/health", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"]["status"], "healthy");
    assert_eq!(body["stripe"]["status"], "unconfigured");
    assert_eq!(body["webhook"]["configured"], true);
    assert_eq!(body["overall"], "degraded");
}

#[tokio::test]
async fn test_plugin_analytics() {
    let t = test_app();
    let (_, token) = admin(&t);
    let account = create_account(&t.state, "ada@example.com");
    {
        let conn = t.state.db.get().unwrap();
        queries::record_plugin_download(&conn, &account.id, "smart-home").unwrap();
        queries::record_plugin_download(&conn, &account.id, "smart-home").unwrap();
        queries::record_plugin_download(&conn, &account.id, "translation").unwrap();
    }

    let (status, body) = send(&t.app, get_request("/admin/plugins", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_downloads"], 3);
    assert_eq!(body["recent_download_count"], 3);
    assert_eq!(body["downloads_by_plugin"][0]["plugin_id"], "smart-home");
    assert_eq!(body["downloads_by_plugin"][0]["count"], 2);
    assert_eq!(body["recent_downloads"][0]["user_email"], "ada@example.com");
}

#[tokio::test]
async fn test_chat_inbox_and_reply() {
    let t = test_app();
    let (_, token) = admin(&t);

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/chat",
            None,
            json!({ "session_id": "sess-1", "message": "my mic is broken" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, get_request("/admin/chats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"][0]["session_id"], "sess-1");
    assert_eq!(body["sessions"][0]["unread_count"], 1);

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/admin/chats/sess-1/reply",
            Some(&token),
            json!({ "message": "Try unplugging it" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["sender"], "support");
    assert_eq!(body["message"]["is_auto_reply"], false);

    let (status, body) = send(&t.app, get_request("/chat?session_id=sess-1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &t.app,
        json_request("POST", "/admin/chats/nope/reply", Some(&token), json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
