//! 管理触发接口测试
//!
//! 用内存实现直接对路由做 oneshot 请求，覆盖鉴权与
//! 封禁/删除/清空消息三类管理动作。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use application::{
    AdmissionController, MemoryMessageStore, MemoryUserDirectory, MessageStore, ModerationFanout,
    PublishPipeline, SessionRegistry, SystemClock, UserDirectory,
};
use domain::{StandingRecord, SubjectId};
use web_api::{router, AppState, JwtConfig, JwtService};

struct TestApp {
    app: Router,
    directory: Arc<MemoryUserDirectory>,
    store: Arc<MemoryMessageStore>,
    jwt: Arc<JwtService>,
}

async fn test_app() -> TestApp {
    let registry = Arc::new(SessionRegistry::new());
    let directory = Arc::new(MemoryUserDirectory::new());
    let store = Arc::new(MemoryMessageStore::new());
    let clock = Arc::new(SystemClock);
    let jwt = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-at-least-32-characters-long".to_owned(),
        expiration_hours: 1,
    }));
    let io_timeout = Duration::from_secs(1);

    let admission = Arc::new(AdmissionController::new(
        jwt.clone(),
        directory.clone(),
        registry.clone(),
        clock.clone(),
        io_timeout,
    ));
    let publisher = Arc::new(PublishPipeline::new(
        directory.clone(),
        store.clone(),
        registry.clone(),
        clock,
        io_timeout,
    ));
    let moderation = Arc::new(ModerationFanout::new(
        directory.clone(),
        store.clone(),
        registry.clone(),
        publisher.clone(),
        io_timeout,
    ));

    let state = AppState {
        admission,
        publisher,
        moderation,
        registry,
        store: store.clone(),
        directory: directory.clone(),
        jwt: jwt.clone(),
    };

    directory
        .upsert(StandingRecord {
            subject_id: SubjectId::from("admin-1"),
            display_name: "root".to_owned(),
            is_banned: false,
            is_admin: true,
        })
        .await;
    directory
        .upsert(StandingRecord {
            subject_id: SubjectId::from("bob"),
            display_name: "bob".to_owned(),
            is_banned: false,
            is_admin: false,
        })
        .await;

    TestApp {
        app: router(state),
        directory,
        store,
        jwt,
    }
}

fn cookie_for(app: &TestApp, subject: &str, name: &str) -> String {
    let token = app.jwt.generate_token(subject, name).unwrap();
    format!("token={token}")
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = test_app().await;
    let response = app
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_authentication() {
    let app = test_app().await;
    let response = app
        .app
        .oneshot(
            Request::post("/api/v1/admin/users/bob/ban")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_non_admins() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "bob", "bob");
    let response = app
        .app
        .clone()
        .oneshot(
            Request::post("/api/v1/admin/users/bob/ban")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ban_endpoint_toggles_standing() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "admin-1", "root");

    let response = app
        .app
        .clone()
        .oneshot(
            Request::post("/api/v1/admin/users/bob/ban")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["isBanned"], true);

    let standing = app
        .directory
        .get_standing(&SubjectId::from("bob"))
        .await
        .unwrap()
        .unwrap();
    assert!(standing.is_banned);

    // 再调一次就是解封
    let response = app
        .app
        .clone()
        .oneshot(
            Request::post("/api/v1/admin/users/bob/ban")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["isBanned"], false);
}

#[tokio::test]
async fn ban_unknown_user_is_not_found() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "admin-1", "root");
    let response = app
        .app
        .oneshot(
            Request::post("/api/v1/admin/users/nobody/ban")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_endpoint_removes_user() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "admin-1", "root");
    let response = app
        .app
        .clone()
        .oneshot(
            Request::delete("/api/v1/admin/users/bob")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let standing = app
        .directory
        .get_standing(&SubjectId::from("bob"))
        .await
        .unwrap();
    assert!(standing.is_none());
}

#[tokio::test]
async fn clear_messages_empties_store() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "admin-1", "root");

    let response = app
        .app
        .clone()
        .oneshot(
            Request::delete("/api/v1/admin/messages")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn message_history_requires_authentication() {
    let app = test_app().await;
    let response = app
        .app
        .oneshot(
            Request::get("/api/v1/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn banned_user_cannot_read_message_history() {
    let app = test_app().await;
    app.directory
        .upsert(StandingRecord {
            subject_id: SubjectId::from("bob"),
            display_name: "bob".to_owned(),
            is_banned: true,
            is_admin: false,
        })
        .await;

    let cookie = cookie_for(&app, "bob", "bob");
    let response = app
        .app
        .oneshot(
            Request::get("/api/v1/messages")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn member_reads_message_history() {
    let app = test_app().await;
    let cookie = cookie_for(&app, "bob", "bob");
    let response = app
        .app
        .oneshot(
            Request::get("/api/v1/messages")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.as_array().unwrap().is_empty());
}
