pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::semantic::handlers as semantic;
use crate::state::AppState;

/// Largest accepted request body (résumé uploads included).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Résumé intake
        .route("/api/v1/resumes/upload", post(candidates::handle_upload))
        .route(
            "/api/v1/candidates/:id/resumes",
            get(candidates::handle_list_versions),
        )
        // Semantic index
        .route(
            "/api/v1/index/documents",
            post(semantic::handle_add_document),
        )
        .route("/api/v1/index/search", post(semantic::handle_search))
        .route("/api/v1/index/rebuild", post(semantic::handle_rebuild))
        .route("/api/v1/rag/ask", post(semantic::handle_ask))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::llm_client::LlmError;
    use crate::semantic::index::DOCUMENTS_FILE;
    use crate::testing::{test_state, InMemoryRepository, ScriptedChat};

    const BOUNDARY: &str = "X-RESUME-BOUNDARY";

    fn app(dir: &std::path::Path, repo: Arc<InMemoryRepository>) -> Router {
        let chat = Arc::new(ScriptedChat::error(|| LlmError::Disabled));
        build_router(test_state(dir, repo, chat))
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(candidate_id: &str, file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"candidate_id\"\r\n\r\n\
             {candidate_id}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post("/api/v1/resumes/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_reports_index_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["index"]["status"], "ready");
    }

    #[tokio::test]
    async fn test_upload_then_list_versions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryRepository::new());
        let candidate = repo.add_candidate("", 0);
        let app = app(dir.path(), repo.clone());

        let resume = "John Smith\nSkills\nGo | Kafka | Terraform";
        let (status, body) = send(
            &app,
            upload_request(&candidate.to_string(), "John Smith.txt", resume),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["parser"], "heuristic");
        assert_eq!(body["ai_failure"]["kind"], "disabled");
        assert_eq!(body["indexed"], true);
        assert_eq!(body["version"]["file_name"], "John Smith.txt");
        assert!(body["profile"]["skills"]
            .as_str()
            .unwrap()
            .contains("Kafka"));

        let uri = format!("/api/v1/candidates/{candidate}/resumes");
        let (status, body) = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_for_unknown_candidate_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        let (status, body) = send(
            &app,
            upload_request(&Uuid::new_v4().to_string(), "cv.txt", "Jane Doe"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_upload_with_bad_candidate_id_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        let (status, body) = send(&app, upload_request("not-a-uuid", "cv.txt", "x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_add_and_search_documents() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));

        let (status, body) = send(
            &app,
            json_request(
                "/api/v1/index/documents",
                json!({"id": "d1", "text": "machine learning engineer", "source": "resume"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexed"], true);

        let (status, body) = send(
            &app,
            json_request("/api/v1/index/search", json!({"query": "ml engineer", "k": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "d1");
    }

    #[tokio::test]
    async fn test_corrupted_index_blocks_search_until_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("vector_store");
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(
            store.join(DOCUMENTS_FILE),
            json!([{"id": "a", "text": "data engineer", "source": "note"}]).to_string(),
        )
        .unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));

        let (status, body) = send(
            &app,
            json_request("/api/v1/index/search", json!({"query": "data"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "INDEX_UNAVAILABLE");

        let (status, body) = send(
            &app,
            json_request("/api/v1/rag/ask", json!({"question": "who?"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");

        let (status, body) = send(
            &app,
            Request::post("/api/v1/index/rebuild").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents"], 1);

        let (status, body) = send(
            &app,
            json_request("/api/v1/index/search", json!({"query": "data engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["id"], "a");
    }

    #[tokio::test]
    async fn test_rebuild_rejects_malformed_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        send(
            &app,
            json_request("/api/v1/index/documents", json!({"id": "keep", "text": "rust"})),
        )
        .await;

        let (status, body) = send(
            &app,
            Request::post("/api/v1/index/rebuild")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"documents\": [oops"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            json_request(
                "/api/v1/index/rebuild",
                json!({"documents": [{"id": "new", "text": "go", "source": "note"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents"], 1);
    }

    #[tokio::test]
    async fn test_ask_without_model_returns_sources() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        send(
            &app,
            json_request(
                "/api/v1/index/documents",
                json!({"id": "jd", "text": "Backend role using Rust and Postgres"}),
            ),
        )
        .await;

        let (status, body) = send(
            &app,
            json_request("/api/v1/rag/ask", json!({"question": "Which role uses Rust?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].is_null());
        assert_eq!(body["sources"][0]["id"], "jd");
        assert_eq!(body["sources"][0]["source"], "document");
    }

    #[tokio::test]
    async fn test_search_rejects_oversized_k() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(InMemoryRepository::new()));
        let (status, _) = send(
            &app,
            json_request("/api/v1/index/search", json!({"query": "x", "k": 500})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
