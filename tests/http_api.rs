use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::{routing::get, Extension, Router};
use hyper::body::HttpBody;
use serde_json::{json, Value};
use subscription_backend::catalog::{PlanCache, PlanCatalog};
use subscription_backend::notifications::{BroadcastNotifier, Notifier};
use subscription_backend::renewals::MonitorContext;
use subscription_backend::retry::RetryPolicy;
use subscription_backend::routes::{api_routes, root};
use subscription_backend::store::{DocumentStore, MemoryDocumentStore};
use tokio::sync::watch;
use tower::ServiceExt; // for `oneshot`

struct TestApp {
    router: Router,
    notifier: BroadcastNotifier,
    context: watch::Receiver<MonitorContext>,
}

async fn app() -> TestApp {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let catalog = Arc::new(PlanCatalog::new(
        store,
        RetryPolicy::new(0, Duration::ZERO),
        PlanCache::new(8, Duration::from_secs(60)),
    ));
    catalog.seed().await.unwrap();

    let notifier = BroadcastNotifier::new();
    let (sender, context) = watch::channel(MonitorContext::default());
    let router = Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(Extension(catalog))
        .layer(Extension(notifier.clone()))
        .layer(Extension(Arc::new(sender)));

    TestApp {
        router,
        notifier,
        context,
    }
}

fn put_account(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri("/api/session/account")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn root_responds_ok() {
    let app = app().await;
    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(body, "Subscription Backend API".as_bytes());
}

#[tokio::test]
async fn lists_plans_for_a_service() {
    let app = app().await;
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/services/4/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let plans: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(plans.len(), 3);
    assert!(plans.iter().all(|plan| plan["serviceId"] == json!(4)));
    assert!(plans.iter().all(|plan| plan["id"].as_str().map_or(false, |id| !id.is_empty())));
    assert_eq!(plans[0]["name"], json!("Monthly"));
    assert_eq!(plans[0]["price"], json!("0.008"));
    assert!(plans[0]["createdAt"].is_string());
}

#[tokio::test]
async fn rejects_non_numeric_service_ids() {
    let app = app().await;
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/services/dstv/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_account_updates_monitor_context() {
    let app = app().await;
    let account = "0xAbC0000000000000000000000000000000000001";

    let response = app
        .router
        .clone()
        .oneshot(put_account(json!({ "account": account })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.context.borrow().identity.as_deref(), Some(account));

    let response = app
        .router
        .clone()
        .oneshot(put_account(json!({ "account": null })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.context.borrow().identity.is_none());

    let response = app
        .router
        .oneshot(put_account(json!({ "account": "not-a-wallet" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.context.borrow().identity.is_none());
}

#[tokio::test]
async fn notifications_are_streamed_as_server_sent_events() {
    let app = app().await;
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/notifications/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    app.notifier.notify("Subscription renewed successfully!");

    let mut body = response.into_body();
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.data())
        .await
        .expect("event before timeout")
        .expect("stream open")
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.contains("event: notification"));
    assert!(text.contains("Subscription renewed successfully!"));
}
