//! Permission-gate integration tests: session resolution, role
//! short-circuit, wildcard matching and fail-closed behavior.

mod common;

use common::{login_as, open_session, send, test_app};
use http::{Method, StatusCode};

use bookstore_server::db::repository::role;
use shared::models::RoleUpdate;

#[tokio::test]
async fn anonymous_request_is_unauthorized() {
    let (app, _state) = test_app().await;
    let token = open_session(&app).await;
    let (status, _, body) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], serde_json::json!(false));
}

#[tokio::test]
async fn request_without_token_is_unauthorized() {
    let (app, _state) = test_app().await;
    let (status, headers, _) = send(&app, Method::GET, "/api/admin/roles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // A fresh session is still handed out
    assert!(headers.contains_key(common::SESSION_HEADER));
}

#[tokio::test]
async fn customer_role_is_forbidden() {
    let (app, state) = test_app().await;
    let token = login_as(&app, &state, "customer@example.com", "Customer").await;
    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn exact_permission_grants_only_that_action() {
    let (app, state) = test_app().await;

    let staff = role::find_by_name(&state.pool, "Staff").await.unwrap().unwrap();
    role::update(
        &state.pool,
        staff.id,
        RoleUpdate {
            name: None,
            description: None,
            permissions: Some(vec!["Role.View".to_string()]),
            is_active: None,
        },
    )
    .await
    .unwrap();

    let token = login_as(&app, &state, "staff@example.com", "Staff").await;

    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // View does not imply Create
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/admin/roles",
        Some(&token),
        Some(serde_json::json!({ "name": "X", "permissions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wildcard_permission_covers_module() {
    let (app, state) = test_app().await;

    let staff = role::find_by_name(&state.pool, "Staff").await.unwrap().unwrap();
    role::update(
        &state.pool,
        staff.id,
        RoleUpdate {
            name: None,
            description: None,
            permissions: Some(vec!["Author.*".to_string()]),
            is_active: None,
        },
    )
    .await
    .unwrap();

    let token = login_as(&app, &state, "wild@example.com", "Staff").await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/admin/authors",
        Some(&token),
        Some(serde_json::json!({ "name": "New Author", "bio": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Wildcard is module-scoped, not global
    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_bypasses_permission_lists() {
    let (app, state) = test_app().await;
    let token = login_as(&app, &state, "admin@example.com", "Admin").await;

    for uri in [
        "/api/admin/roles",
        "/api/admin/users",
        "/api/admin/orders",
        "/api/admin/chat/rooms",
        "/api/admin/dashboard",
    ] {
        let (status, _, _) = send(&app, Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "admin denied on {uri}");
    }
}

#[tokio::test]
async fn malformed_session_permissions_fail_closed() {
    let (app, state) = test_app().await;

    let staff = role::find_by_name(&state.pool, "Staff").await.unwrap().unwrap();
    role::update(
        &state.pool,
        staff.id,
        RoleUpdate {
            name: None,
            description: None,
            permissions: Some(vec!["Role.View".to_string()]),
            is_active: None,
        },
    )
    .await
    .unwrap();

    let token = login_as(&app, &state, "broken@example.com", "Staff").await;

    // Sanity: permission works before corruption
    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Corrupt the session's stored permission JSON: gate must deny
    state
        .sessions
        .write(&token, |s| s.permissions_json = Some("{not json".to_string()))
        .unwrap();
    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_drops_the_session() {
    let (app, state) = test_app().await;
    let token = login_as(&app, &state, "bye@example.com", "Admin").await;

    let (status, _, _) = send(&app, Method::POST, "/api/account/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Old token no longer resolves to a logged-in session
    let (status, _, _) = send(&app, Method::GET, "/api/admin/roles", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
