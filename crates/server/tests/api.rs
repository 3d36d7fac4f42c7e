use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use db::DBService;
use http_body_util::BodyExt;
use local_deployment::LocalDeployment;
use serde_json::{Value, json};
use services::services::{
    ai_gateway::{AiGatewayError, ChatRequest, Completion, CompletionProvider},
    config::Config,
};
use tower::ServiceExt;
use utils::jwt::{Claims, encode_token};
use uuid::Uuid;

const SECRET: &str = "test-secret";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Answers requests from a fixed queue; an empty queue means an empty answer.
struct QueuedProvider {
    replies: Mutex<VecDeque<Result<String, AiGatewayError>>>,
    calls: Mutex<usize>,
}

impl QueuedProvider {
    fn new(replies: Vec<Result<String, AiGatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn next(&self) -> Result<String, AiGatewayError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AiGatewayError::EmptyResponse))
    }
}

#[async_trait]
impl CompletionProvider for QueuedProvider {
    async fn chat(&self, request: ChatRequest) -> Result<Completion, AiGatewayError> {
        self.next().map(|content| Completion {
            content,
            model: request.model,
            tokens_used: Some(42),
        })
    }

    async fn generate_image(&self, _model: &str, _prompt: &str) -> Result<String, AiGatewayError> {
        self.next()
    }
}

async fn app(provider: Arc<QueuedProvider>) -> Router {
    let db = DBService::new_in_memory().await.unwrap();
    let deployment = LocalDeployment::from_parts(Config::for_tests(SECRET), db, provider);
    server::routes::router(deployment)
}

fn token(user_id: Uuid) -> String {
    encode_token(&Claims::for_user(user_id, 3600), SECRET).unwrap()
}

/// Sends a request via `oneshot` and returns (status, parsed JSON body).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn create_project(app: &Router, token: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(token),
        Some(json!({"title": "O Pescador", "genre": "Drama", "format": "Short"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn store_beat_sheet(app: &Router, token: &str, project_id: &str) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/api/projects/{project_id}/content/beat_sheet"),
        Some(token),
        Some(json!({"scenes": [
            {"number": 1, "intExt": "EXT", "location": "PIER", "dayNight": "DAWN", "description": "João prepares the boat."},
            {"number": 2, "intExt": "INT", "location": "HOUSE", "dayNight": "DAY", "description": "Ana reads the letter."}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Auth and ownership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_needs_no_token() {
    let app = app(QueuedProvider::new(vec![])).await;
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!("OK"));
}

#[tokio::test]
async fn project_routes_require_a_valid_token() {
    let app = app(QueuedProvider::new(vec![])).await;

    let (status, body) = send(&app, "GET", "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(&app, "GET", "/api/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = encode_token(&Claims::for_user(Uuid::new_v4(), 3600), "other-secret").unwrap();
    let (status, _) = send(&app, "GET", "/api/projects", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn projects_of_other_users_are_not_found() {
    let app = app(QueuedProvider::new(vec![])).await;
    let owner = token(Uuid::new_v4());
    let intruder = token(Uuid::new_v4());
    let project_id = create_project(&app, &owner).await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}"),
        Some(&intruder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/projects/{project_id}"),
        Some(&intruder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/projects", Some(&intruder), None).await;
    assert_eq!(body["data"], json!([]));
}

// ---------------------------------------------------------------------------
// Projects and content
// ---------------------------------------------------------------------------

#[tokio::test]
async fn project_creation_validates_required_fields() {
    let app = app(QueuedProvider::new(vec![])).await;
    let token = token(Uuid::new_v4());

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(&token),
        Some(json!({"title": "Untitled", "genre": "Drama"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("format is required"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/projects",
        Some(&token),
        Some(json!({"title": "  ", "genre": "Drama", "format": "Feature"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn content_edits_show_up_in_the_overview() {
    let app = app(QueuedProvider::new(vec![])).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/projects/{project_id}/content/premise"),
        Some(&token),
        Some(json!({"text": "A fisherman leaves before dawn."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/projects/{project_id}/content/poster"),
        Some(&token),
        Some(json!({"text": "?"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed_stages"], json!(["premise"]));
    assert_eq!(
        body["data"]["content"]["premise"]["text"],
        json!("A fisherman leaves before dawn.")
    );

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/projects/{project_id}/content/argument"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stateless_generation_returns_the_raw_answer() {
    let provider = QueuedProvider::new(vec![Ok("A lighthouse keeper's last night.".to_string())]);
    let app = app(provider.clone()).await;
    let token = token(Uuid::new_v4());

    let (status, _) = send(
        &app,
        "POST",
        "/api/generate",
        Some(&token),
        Some(json!({"type": "poem", "context": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls(), 0);

    let (status, body) = send(
        &app,
        "POST",
        "/api/generate",
        Some(&token),
        Some(json!({"type": "premise", "context": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["data"]["content"],
        json!("A lighthouse keeper's last night.")
    );
}

#[tokio::test]
async fn stage_generation_respects_pipeline_order() {
    let provider = QueuedProvider::new(vec![Ok("A fisherman leaves before dawn.".to_string())]);
    let app = app(provider.clone()).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/generate/script"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(provider.calls(), 0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/generate/premise"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["content"]["content_type"], json!("premise"));

    let (_, log) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/generations"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(log["data"][0]["status"], json!("completed"));
    assert_eq!(log["data"][0]["tokens_used"], json!(42));
}

#[tokio::test]
async fn exhausted_credits_surface_as_payment_required() {
    let provider = QueuedProvider::new(vec![Err(AiGatewayError::CreditsExhausted)]);
    let app = app(provider).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/generate/premise"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["message"], json!("ai gateway error: AI credits exhausted"));
}

#[tokio::test]
async fn bulk_runs_need_scenes() {
    let app = app(QueuedProvider::new(vec![])).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;

    for uri in [
        format!("/api/projects/{project_id}/breakdown/generate"),
        format!("/api/projects/{project_id}/storyboards/generate"),
    ] {
        let (status, _) = send(&app, "POST", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{uri}");
    }
}

// ---------------------------------------------------------------------------
// Scenes, shots, budget
// ---------------------------------------------------------------------------

#[tokio::test]
async fn beat_sheet_sync_then_scene_breakdown() {
    let provider = QueuedProvider::new(vec![Ok(
        r#"[{"shot_type": "WS", "equipment": ["Tripod"]}, {"shot_type": "CU"}]"#.to_string(),
    )]);
    let app = app(provider).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/scenes/sync"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    store_beat_sheet(&app, &token, &project_id).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/scenes/sync"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["created"], json!(2));
    let scene_id = body["data"]["scenes"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/scenes/{scene_id}/shots/generate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][1]["shot_number"], json!("1.2"));

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/shots"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/scenes/{scene_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/shots"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn budget_items_roll_up_into_the_summary() {
    let app = app(QueuedProvider::new(vec![])).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;
    let uri = format!("/api/projects/{project_id}/budget");

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"item_name": "Camera package", "category": "equipment", "quantity": 4, "unit_price": 900})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, created) = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"item_name": "Gaffer", "category": "crew", "quantity": 4, "unit_price": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"item_name": "Drone", "quantity": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let item_id = created["data"]["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/budget-items/{item_id}"),
        Some(&token),
        Some(json!({"quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_price"], json!(2500.0));

    let (_, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["summary"]["total"], json!(6100.0));
    assert_eq!(body["data"]["summary"]["currency"], json!("BRL"));
}

#[tokio::test]
async fn script_import_status_is_reported() {
    let app = app(QueuedProvider::new(vec![])).await;
    let token = token(Uuid::new_v4());
    let project_id = create_project(&app, &token).await;
    let uri = format!("/api/projects/{project_id}/script-import");

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &uri, Some(&token), Some(json!({"content": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"content": "EXT. PIER - DAWN\nJOÃO prepares the boat.", "file_name": "pescador.txt"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], json!("pending"));

    let (_, scripts) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/scripts"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(scripts["data"][0]["version"], json!(1));
    assert_eq!(scripts["data"][0]["kind"], json!("uploaded"));
}
