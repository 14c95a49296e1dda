use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use mutu_core::{LocalFileStore, Storage};
use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use crate::actor::ACTOR_HEADER;
use crate::config::ServerConfig;
use crate::state::AppState;

struct TestApp {
    router: Router,
    actor: String,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open_memory().await.unwrap();
    let state = AppState::with_storage(storage, LocalFileStore::new(dir.path()));
    TestApp {
        router: crate::app(state, &ServerConfig::default()),
        actor: Uuid::new_v4().to_string(),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn call(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(ACTOR_HEADER, &self.actor)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn create_period(&self) -> Value {
        let (status, period) = self
            .call(
                "POST",
                "/api/periods",
                json!({
                    "name": "Akreditasi 2025",
                    "start_date": "2025-01-01",
                    "end_date": "2025-12-31"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        period
    }
}

#[tokio::test]
async fn test_mutation_requires_actor() {
    let app = test_app().await;
    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/periods")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"name": "x", "start_date": "2025-01-01", "end_date": "2025-01-02"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/periods/{}", Uuid::new_v4()))
                .header(ACTOR_HEADER, "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_period_lifecycle_over_http() {
    let app = test_app().await;
    let period = app.create_period().await;
    let id = period["id"].as_str().unwrap();
    assert_eq!(period["status"], "persiapan");

    let (status, body) = app
        .call("PUT", &format!("/api/periods/{id}/status"), json!({"status": "selesai"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, body) = app
        .call("PUT", &format!("/api/periods/{id}/status"), json!({"status": "pengisian"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pengisian");

    let (status, body) = app.get("/api/periods?status=pengisian").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.get(&format!("/api/periods/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_validation_errors_are_field_keyed() {
    let app = test_app().await;
    let (status, body) = app
        .call(
            "POST",
            "/api/periods",
            json!({"name": "Akreditasi", "start_date": "2025-06-01", "end_date": "2025-01-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");
    assert!(body["errors"]["end_date"].is_array());
}

#[tokio::test]
async fn test_submission_rows_and_documents() {
    let app = test_app().await;
    let period = app.create_period().await;

    let (status, criterion) = app
        .call(
            "POST",
            "/api/criteria",
            json!({"kode": "4.1", "name": "Profil dosen"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let criterion_id = criterion["id"].as_str().unwrap();

    let (status, mappings) = app
        .call(
            "POST",
            &format!("/api/criteria/{criterion_id}/mappings"),
            json!({"fields": [{"name": "nama_dosen", "type": "text"}, {"name": "jabatan", "type": "text"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mappings.as_array().unwrap().len(), 2);

    let (status, submission) = app
        .call(
            "POST",
            "/api/submissions",
            json!({"period_id": period["id"], "criterion_id": criterion_id, "content": "Tabel dosen"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let submission_id = submission["id"].as_str().unwrap();

    let (status, rows) = app
        .call(
            "POST",
            &format!("/api/submissions/{submission_id}/rows"),
            json!([{"nama_dosen": "Siti", "jabatan": "Lektor"}]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rows[0]["row_number"], 1);

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/submissions/{submission_id}/rows"),
            json!([{"gaji": 1}]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .get(&format!("/api/criteria/{criterion_id}/data?per_page=10"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, document) = app
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/api/submissions/{submission_id}/documents?name=sk.pdf"))
                .header(ACTOR_HEADER, &app.actor)
                .header(header::CONTENT_TYPE, "application/pdf")
                .body(Body::from("%PDF-1.7"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["size"], 8);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/documents/{}/content", document["id"].as_str().unwrap()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.7");
}

#[tokio::test]
async fn test_anonymous_survey_response() {
    let app = test_app().await;
    let (_, survey) = app
        .call("POST", "/api/surveys", json!({"title": "Kepuasan mahasiswa"}))
        .await;
    let survey_id = survey["id"].as_str().unwrap();

    let (status, question) = app
        .call(
            "POST",
            &format!("/api/surveys/{survey_id}/questions"),
            json!({"question": "Nilai layanan", "question_type": "rating", "required": true}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let question_id = question["id"].as_str().unwrap().to_string();

    let respond = |score: i64| {
        let mut answers = Map::new();
        answers.insert(question_id.clone(), json!(score));
        Request::builder()
            .method("POST")
            .uri(format!("/api/surveys/{survey_id}/responses"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "answers": answers }).to_string()))
            .unwrap()
    };

    let (status, _) = app.send(respond(4)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call("POST", &format!("/api/surveys/{survey_id}/publish"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(respond(9)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"][&question_id].is_array());

    let (status, response) = app.send(respond(4)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(response["respondent_id"].is_null());
    assert!(response["code"].as_str().unwrap().starts_with("RESP-"));
}
