use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, header},
    middleware,
    middleware::Next,
    routing::{get, patch},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{health, records};

pub(crate) fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/db-test", get(health::db_test))
        .route("/records/{id}", patch(records::update_record))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(middleware::from_fn(security_headers))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ingest::tests::xlsx_with_header;
    use crate::core::records::RecordService;
    use crate::core::records::tests::{KNOWN_ID, ScriptedStore};
    use axum::http::{Method, StatusCode};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "sheetpatch-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, content) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(content);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn app_with(store: Arc<ScriptedStore>) -> Router {
        build_api_router(AppState {
            service: Arc::new(RecordService::new(store)),
            max_upload_bytes: 1024 * 1024,
        })
    }

    async fn patch_record(
        app: Router,
        id: &str,
        parts: &[Part<'_>],
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(Method::PATCH)
            .uri(format!("/records/{id}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        send(app, req).await
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_running() {
        let app = app_with(Arc::new(ScriptedStore::default()));
        let (status, json) = send(app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["message"], "Server is running");
    }

    #[tokio::test]
    async fn db_test_is_200_even_when_the_store_fails() {
        let app = app_with(Arc::new(ScriptedStore::default()));
        let (status, json) = send(app, get_request("/db-test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "connected");
        assert_eq!(json["database"], "scripted");

        let app = app_with(Arc::new(ScriptedStore {
            fail_ping: true,
            ..Default::default()
        }));
        let (status, json) = send(app, get_request("/db-test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "error");
        assert!(json.get("database").is_none());
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let app = app_with(Arc::new(ScriptedStore::default()));
        let resp = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn csv_upload_updates_the_record() {
        let store = Arc::new(ScriptedStore::with_record(KNOWN_ID).await);
        let app = app_with(store.clone());

        let (status, json) = patch_record(
            app,
            KNOWN_ID,
            &[
                Part::File("user_input", "sample.csv", b"VIN,Reg_No,Engine_No\nA1,B2,C3\n"),
                Part::Text("instruction_from_user", "Process vehicle data"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Record updated successfully");
        let data = &json["data"];
        assert_eq!(data["userInput"][0]["filename"], "sample.csv");
        assert_eq!(
            data["userInput"][0]["columns"],
            serde_json::json!(["VIN", "Reg_No", "Engine_No"])
        );
        assert_eq!(data["instructionFromUser"], "Process vehicle data");
        assert!(data.get("expectedOutput").is_none());
        assert_eq!(data["taskId"].as_str().unwrap().len(), 36);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn camel_case_parts_and_spreadsheets_are_accepted() {
        let store = Arc::new(ScriptedStore::with_record(KNOWN_ID).await);
        let app = app_with(store);
        let workbook = xlsx_with_header(&["Name", "Amount"]);

        let (status, json) = patch_record(
            app,
            KNOWN_ID,
            &[
                Part::File("userInput", "a.csv", b"x,y\n"),
                Part::File("userInput", "b.csv", b"z\n"),
                Part::File("expectedOutput", "target.xlsx", &workbook),
                Part::Text("clientEmailAddress", "ops@example.com"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{json}");
        let data = &json["data"];
        assert_eq!(data["userInput"][0]["filename"], "a.csv");
        assert_eq!(data["userInput"][1]["filename"], "b.csv");
        assert_eq!(data["expectedOutput"], serde_json::json!(["Name", "Amount"]));
        assert_eq!(data["clientEmailAddress"], "ops@example.com");
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let app = app_with(Arc::new(ScriptedStore::with_record(KNOWN_ID).await));
        let (status, json) =
            patch_record(app, "not-an-id", &[Part::Text("instruction_from_user", "x")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "Invalid record ID format");
    }

    #[tokio::test]
    async fn unknown_record_is_404() {
        let app = app_with(Arc::new(ScriptedStore::default()));
        let (status, json) = patch_record(
            app,
            "000000000000000000000000",
            &[Part::Text("instruction_from_user", "x")],
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "Record not found");
    }

    #[tokio::test]
    async fn empty_form_is_400() {
        let store = Arc::new(ScriptedStore::with_record(KNOWN_ID).await);
        let app = app_with(store.clone());
        let (status, json) = patch_record(app, KNOWN_ID, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "No data provided for update");
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_multipart_body_reads_as_empty_form() {
        let app = app_with(Arc::new(ScriptedStore::with_record(KNOWN_ID).await));
        let req = Request::builder()
            .method(Method::PATCH)
            .uri(format!("/records/{KNOWN_ID}"))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"instruction_from_user":"x"}"#))
            .unwrap();
        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "No data provided for update");
    }

    #[tokio::test]
    async fn malformed_email_never_reaches_the_store() {
        let store = Arc::new(ScriptedStore::with_record(KNOWN_ID).await);
        let app = app_with(store.clone());
        let (status, json) = patch_record(
            app,
            KNOWN_ID,
            &[Part::Text("client_email_address", "not-an-email")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap().contains("email"));
        assert_eq!(store.finds.load(Ordering::SeqCst), 0);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_workbook_is_400_with_filename() {
        let store = Arc::new(ScriptedStore::with_record(KNOWN_ID).await);
        let app = app_with(store.clone());
        let (status, json) = patch_record(
            app,
            KNOWN_ID,
            &[Part::File("user_input", "broken.xlsx", b"definitely not a zip")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["detail"]
                .as_str()
                .unwrap()
                .starts_with("Error processing file 'broken.xlsx'")
        );
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = build_api_router(AppState {
            service: Arc::new(RecordService::new(Arc::new(
                ScriptedStore::with_record(KNOWN_ID).await,
            ))),
            max_upload_bytes: 64,
        });
        let big = vec![b'a'; 4096];
        let (status, _) =
            patch_record(app, KNOWN_ID, &[Part::File("user_input", "big.csv", &big)]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
