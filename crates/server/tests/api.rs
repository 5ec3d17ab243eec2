use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
};
use engine::{
    CustomerId, DocumentService, Engine, JobState, JobStatus, MemoryLedgerStore, PollPolicy,
    ResultEngine, TrackingId,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{ServerState, router};
use tower::ServiceExt;

const ADA: &str = "ada@example.com";
const BOB: &str = "bob@example.com";

/// Completes every job on the first status call.
struct InstantDocuments;

#[async_trait]
impl DocumentService for InstantDocuments {
    async fn submit(&self, customer: &CustomerId) -> ResultEngine<TrackingId> {
        Ok(TrackingId::new(format!("job-{customer}")))
    }

    async fn status(&self, _id: &TrackingId) -> ResultEngine<JobStatus> {
        Ok(JobStatus {
            progress: 100,
            current_step: "Done".to_string(),
            estimated_time_remaining: "0 minutes".to_string(),
            state: JobState::Completed,
        })
    }
}

fn app_with(store: Arc<MemoryLedgerStore>, documents: bool) -> Router {
    let mut builder = Engine::builder()
        .store(store)
        .quiet_window(Duration::from_millis(20))
        .poll_policy(PollPolicy {
            interval: Duration::from_millis(10),
            max_duration: Duration::from_secs(5),
        });
    if documents {
        builder = builder.documents(Arc::new(InstantDocuments));
    }
    router(ServerState {
        engine: Arc::new(builder.build()),
    })
}

fn app() -> Router {
    app_with(Arc::new(MemoryLedgerStore::new()), false)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    customer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Bytes) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(customer) = customer {
        req = req.header("x-customer-email", customer);
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, bytes)
}

fn json(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(&app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn ledger_requires_a_valid_customer_header() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/ledger", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/ledger", Some("not-an-email"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn calculator_is_public() {
    let (status, body) = send(
        &app(),
        Method::POST,
        "/calculator",
        None,
        Some(json!({
            "annualWages": 10_000_000,
            "wageRdPercentage": 50,
            "contractorCosts": 4_000_000,
            "additionalYears": 2
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["summary"]["grandTotal"], 7_600_000);
    assert_eq!(body["estimate"]["federalCredit"], 494_000);
    assert_eq!(body["estimate"]["priceTier"], "basic");
    assert_eq!(body["estimate"]["price"], 50_000 + 2 * 29_700);
}

#[tokio::test]
async fn entry_lifecycle() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/ledger/wages", Some(ADA), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let wage = json(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/ledger/wages/{wage}"),
        Some(ADA),
        Some(json!({ "employeeName": "Ada", "annualSalary": 10_000_000, "rdPercentage": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["wages"][0]["qualifiedAmount"], 5_000_000);

    let (_, body) = send(&app, Method::POST, "/ledger/contractors", Some(ADA), None).await;
    let contractor = json(&body)["id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::PATCH,
        &format!("/ledger/contractors/{contractor}"),
        Some(ADA),
        Some(json!({ "amount": 4_000_000 })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/ledger/summary", Some(ADA), None).await;
    assert_eq!(status, StatusCode::OK);
    let summary = json(&body);
    assert_eq!(summary["wagesTotal"], 5_000_000);
    assert_eq!(summary["contractorsTotal"], 2_600_000);
    assert_eq!(summary["grandTotal"], 7_600_000);

    let (_, body) = send(
        &app,
        Method::GET,
        "/ledger/estimate?additionalYears=1",
        Some(ADA),
        None,
    )
    .await;
    let estimate = json(&body);
    assert_eq!(estimate["creditRate"], 0.065);
    assert_eq!(estimate["surcharge"], 29_700);
    assert_eq!(estimate["price"], 79_700);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/ledger/contractors/{contractor}"),
        Some(ADA),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/ledger/contractors/{contractor}"),
        Some(ADA),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/ledger", Some(ADA), None).await;
    let ledger = json(&body);
    assert_eq!(ledger["wages"].as_array().unwrap().len(), 1);
    assert!(ledger["contractors"].as_array().unwrap().is_empty());

    // Other customers see their own, empty, ledger.
    let (_, body) = send(&app, Method::GET, "/ledger/summary", Some(BOB), None).await;
    assert_eq!(json(&body)["grandTotal"], 0);
}

#[tokio::test]
async fn bad_patches_are_rejected() {
    let app = app();
    let (_, body) = send(&app, Method::POST, "/ledger/contractors", Some(ADA), None).await;
    let id = json(&body)["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/ledger/contractors/{id}"),
        Some(ADA),
        Some(json!({ "rdPercentage": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/ledger/contractors/missing",
        Some(ADA),
        Some(json!({ "amount": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json(&body)["error"].is_string());

    let (status, _) = send(&app, Method::POST, "/ledger/payroll", Some(ADA), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn review_reports_issues() {
    let app = app();
    send(&app, Method::POST, "/ledger/supplies", Some(ADA), None).await;

    let (status, body) = send(&app, Method::GET, "/ledger/review", Some(ADA), None).await;
    assert_eq!(status, StatusCode::OK);
    let review = json(&body);
    assert_eq!(review["ready"], false);
    assert_eq!(review["issues"][0]["category"], "supplies");
    assert_eq!(review["issues"][0]["field"], "supplyType");
}

#[tokio::test]
async fn export_is_csv() {
    let app = app();
    send(&app, Method::POST, "/ledger/wages", Some(ADA), None).await;

    let req = Request::builder()
        .uri("/ledger/export")
        .header("x-customer-email", ADA)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("wages,"));
}

#[tokio::test]
async fn empty_export_still_has_the_header_row() {
    let req = Request::builder()
        .uri("/ledger/export")
        .header("x-customer-email", BOB)
        .body(Body::empty())
        .unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        &body[..],
        b"category,id,name,detail,amount,rdPercentage,qualifiedAmount\n"
    );
}

#[tokio::test]
async fn save_flushes_to_the_store() {
    let store = Arc::new(MemoryLedgerStore::new());
    let app = app_with(store.clone(), false);
    send(&app, Method::POST, "/ledger/wages", Some(ADA), None).await;

    let (status, _) = send(&app, Method::POST, "/ledger/save", Some(ADA), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let ada: CustomerId = ADA.parse().unwrap();
    let saved = store.get(&ada).await.unwrap();
    assert_eq!(saved.wages().len(), 1);
}

#[tokio::test]
async fn documents_are_tracked_per_customer() {
    let app = app_with(Arc::new(MemoryLedgerStore::new()), true);

    let (status, body) = send(&app, Method::POST, "/documents", Some(ADA), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let submitted = json(&body);
    let tracking_id = submitted["trackingId"].as_str().unwrap().to_string();
    assert_eq!(tracking_id, "job-ada@example.com");

    let uri = format!("/documents/{tracking_id}");
    let mut outcome = Value::Null;
    for _ in 0..100 {
        let (status, body) = send(&app, Method::GET, &uri, Some(ADA), None).await;
        assert_eq!(status, StatusCode::OK);
        let job = json(&body);
        outcome = job["outcome"].clone();
        if outcome == "completed" {
            assert_eq!(job["progress"], 100);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(outcome, "completed");

    let (status, _) = send(&app, Method::GET, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documents_without_service_is_bad_gateway() {
    let (status, body) = send(&app(), Method::POST, "/documents", Some(ADA), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json(&body)["error"], "document service unavailable");
}
