//! Black-box tests for the router against a stub gateway.
//!
//! The stub records every statement it is handed, so tests can assert
//! both the response contract and that rejected statements never reach
//! the executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sqlgate::db::{DbError, DbGateway, RowObject};
use sqlgate::http::server::{build_router, AppState};

#[derive(Default)]
struct StubGateway {
    fail_insert: bool,
    fail_select: bool,
    rows: Vec<RowObject>,
    inserts: AtomicUsize,
    selects: Mutex<Vec<String>>,
}

impl StubGateway {
    fn with_rows(rows: Vec<RowObject>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn recorded_selects(&self) -> Vec<String> {
        self.selects.lock().unwrap().clone()
    }
}

fn stub_error() -> DbError {
    DbError::from(sqlx::Error::PoolClosed)
}

#[async_trait]
impl DbGateway for StubGateway {
    async fn insert_fixed_rows(&self) -> Result<u64, DbError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(stub_error());
        }
        Ok(3)
    }

    async fn run_select(&self, sql: &str) -> Result<Vec<RowObject>, DbError> {
        self.selects.lock().unwrap().push(sql.to_string());
        if self.fail_select {
            return Err(stub_error());
        }
        Ok(self.rows.clone())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}

fn app(stub: Arc<StubGateway>) -> Router {
    build_router(AppState {
        db: stub,
        cors_origin: HeaderValue::from_static("*"),
    })
}

fn patient_row(name: &str, age: i64, city: &str) -> RowObject {
    json!({"patientID": 1, "name": name, "age": age, "city": city})
        .as_object()
        .unwrap()
        .clone()
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn assert_cors_headers(response: &Response) {
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, ngrok-skip-browser-warning"
    );
}

#[tokio::test]
async fn options_preflight_is_204_on_any_path() {
    let stub = Arc::new(StubGateway::default());

    for uri in ["/lab5/api/v1/insert", "/lab5/api/v1/sql", "/nowhere"] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = send(app(stub.clone()), request).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_cors_headers(&response);
        assert!(body_text(response).await.is_empty());
    }
}

#[tokio::test]
async fn insert_reports_the_affected_row_count() {
    let stub = Arc::new(StubGateway::default());
    let request = Request::builder()
        .method("POST")
        .uri("/lab5/api/v1/insert")
        .body(Body::from("{}"))
        .unwrap();
    let response = send(app(stub.clone()), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(&response);

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Inserted fixed rows");
    assert_eq!(body["insertedRows"], 3);
    assert_eq!(stub.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn insert_failure_is_500_with_detail() {
    let stub = Arc::new(StubGateway {
        fail_insert: true,
        ..StubGateway::default()
    });
    let request = Request::builder()
        .method("POST")
        .uri("/lab5/api/v1/insert")
        .body(Body::empty())
        .unwrap();
    let response = send(app(stub), request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors_headers(&response);

    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Insert failed");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn query_param_select_forwards_the_statement_unchanged() {
    let stub = Arc::new(StubGateway::with_rows(vec![patient_row(
        "Alex",
        22,
        "Vancouver",
    )]));
    let response = send(
        app(stub.clone()),
        get("/lab5/api/v1/sql?query=SELECT%20*%20FROM%20patient"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["rows"][0]["name"], "Alex");
    assert_eq!(stub.recorded_selects(), vec!["SELECT * FROM patient"]);
}

#[tokio::test]
async fn lowercase_select_passes_the_guard() {
    let stub = Arc::new(StubGateway::default());
    let response = send(
        app(stub.clone()),
        get("/lab5/api/v1/sql?query=select%20name%20from%20patient"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.recorded_selects(), vec!["select name from patient"]);
}

#[tokio::test]
async fn missing_or_blank_query_param_is_400() {
    let stub = Arc::new(StubGateway::default());

    for uri in [
        "/lab5/api/v1/sql",
        "/lab5/api/v1/sql?query=",
        "/lab5/api/v1/sql?query=%20%20",
    ] {
        let response = send(app(stub.clone()), get(uri)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(
            body["error"],
            "Missing query param. Use /lab5/api/v1/sql?query=SELECT..."
        );
    }
    assert!(stub.recorded_selects().is_empty());
}

#[tokio::test]
async fn non_select_statements_never_reach_the_executor() {
    let stub = Arc::new(StubGateway::default());

    for uri in [
        "/lab5/api/v1/sql?query=DROP%20TABLE%20patient",
        "/lab5/api/v1/sql?query=update%20patient%20set%20age%3D1",
        "/lab5/api/v1/sql/DROP%20TABLE%20patient",
        "/lab5/api/v1/sql/%22update%20patient%20set%20age%3D1%22",
    ] {
        let response = send(app(stub.clone()), get(uri)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Only SELECT queries are allowed.");
    }
    assert!(stub.recorded_selects().is_empty());
}

#[tokio::test]
async fn bad_percent_encoding_on_path_route_is_400() {
    let stub = Arc::new(StubGateway::default());
    let response = send(app(stub.clone()), get("/lab5/api/v1/sql/select%FF1")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_cors_headers(&response);

    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Bad URL encoding");
    assert!(stub.recorded_selects().is_empty());
}

#[tokio::test]
async fn unreadable_body_on_insert_is_400() {
    let stub = Arc::new(StubGateway::default());

    let chunks: Vec<Result<&'static [u8], std::io::Error>> = vec![
        Ok(b"{".as_slice()),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "stream died",
        )),
    ];
    let request = Request::builder()
        .method("POST")
        .uri("/lab5/api/v1/insert")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap();
    let response = send(app(stub.clone()), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Bad request body");
    assert_eq!(stub.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn path_select_decodes_and_strips_one_quote_layer() {
    let stub = Arc::new(StubGateway::with_rows(vec![patient_row(
        "Jack", 30, "Burnaby",
    )]));
    let response = send(
        app(stub.clone()),
        get("/lab5/api/v1/sql/%22select%20*%20from%20patient%22"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["rows"][0]["city"], "Burnaby");
    assert_eq!(stub.recorded_selects(), vec!["select * from patient"]);
}

#[tokio::test]
async fn unquoted_path_select_works_too() {
    let stub = Arc::new(StubGateway::default());
    let response = send(
        app(stub.clone()),
        get("/lab5/api/v1/sql/select%20age%20from%20patient"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.recorded_selects(), vec!["select age from patient"]);
}

#[tokio::test]
async fn empty_path_statement_fails_the_guard() {
    let stub = Arc::new(StubGateway::default());
    let response = send(app(stub.clone()), get("/lab5/api/v1/sql/")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Only SELECT queries are allowed.");
    assert!(stub.recorded_selects().is_empty());
}

#[tokio::test]
async fn select_execution_failure_is_400_query_failed() {
    let stub = Arc::new(StubGateway {
        fail_select: true,
        ..StubGateway::default()
    });
    let response = send(
        app(stub),
        get("/lab5/api/v1/sql?query=SELECT%20*%20FROM%20missing_table"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Query failed");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn unmatched_routes_are_404_json_with_cors() {
    let stub = Arc::new(StubGateway::default());

    let delete = Request::builder()
        .method("DELETE")
        .uri("/foo")
        .body(Body::empty())
        .unwrap();
    for request in [delete, get("/lab5/api/v2/sql"), get("/")] {
        let response = send(app(stub.clone()), request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_cors_headers(&response);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Not found");
    }
}

#[tokio::test]
async fn responses_are_pretty_printed_json_with_charset() {
    let stub = Arc::new(StubGateway::default());
    let response = send(app(stub), get("/lab5/api/v1/sql?query=SELECT%201%20x")).await;

    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );
    let text = body_text(response).await;
    assert!(text.contains("\n  \"ok\": true"));
}
