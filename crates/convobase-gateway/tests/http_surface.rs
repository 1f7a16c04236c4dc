use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use convobase_admin::AdminService;
use convobase_auth::authn::{MemoryIdentityProvider, SubjectBearerResolver};
use convobase_chat::ChatService;
use convobase_files::FileService;
use convobase_gateway::{build_router, AppState};
use convobase_llm::chat::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};
use convobase_llm::errors::LlmError;
use convobase_llm::registry::{ModelRegistry, ProviderKind, ProviderRegistry};
use convobase_storage::kv::KvStore;
use convobase_storage::memory::{MemoryBlobStore, MemoryKvStore};
use convobase_storage::model::UserRecord;
use convobase_types::prelude::{Role, ScopeIds, Timestamp};

const SONNET: &str = "us.anthropic.claude-sonnet-4-5-20250929-v1:0";
const FLASH: &str = "gemini-3-flash-preview";
const BODY_LIMIT: usize = 1_048_576;

struct StubProvider {
    name: &'static str,
    reply: &'static str,
    usage: TokenUsage,
}

#[async_trait]
impl ChatProvider for StubProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            content: self.reply.to_string(),
            model_id: request.model_id,
            provider: self.name.to_string(),
            usage: Some(self.usage),
        })
    }
}

fn test_state() -> AppState {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let files = Arc::new(FileService::new(
        kv.clone(),
        Arc::new(MemoryBlobStore::new()),
    ));
    let mut providers = ProviderRegistry::new();
    providers.register(
        ProviderKind::Bedrock,
        Arc::new(StubProvider {
            name: "bedrock",
            reply: "Alice is 30.",
            usage: TokenUsage {
                input_tokens: 200,
                output_tokens: 50,
            },
        }),
    );
    providers.register(
        ProviderKind::Gemini,
        Arc::new(StubProvider {
            name: "gemini",
            reply: "Alice is 30 years old.",
            usage: TokenUsage {
                input_tokens: 150,
                output_tokens: 40,
            },
        }),
    );
    let models = Arc::new(ModelRegistry::builtin());
    let chat = Arc::new(ChatService::new(
        kv.clone(),
        files.clone(),
        Arc::new(providers),
        models.clone(),
    ));
    let admin = Arc::new(AdminService::new(
        kv.clone(),
        Arc::new(MemoryIdentityProvider::new()),
    ));
    AppState {
        chat,
        files,
        admin,
        models,
        kv,
        bearer: Arc::new(SubjectBearerResolver),
    }
}

fn test_app() -> (Router, AppState) {
    let state = test_state();
    (build_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("Authorization", format!("Bearer {bearer}"));
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("router call");
    let status = response.status();
    let value = json_body(response).await;
    (status, value)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("parse json")
}

async fn seed_user(state: &AppState, user_id: &str, role: Role, org: Option<&str>, company: Option<&str>) {
    let now = Timestamp::now();
    let user = UserRecord {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        name: user_id.to_string(),
        role,
        scopes: ScopeIds::new(
            org.map(str::to_string),
            company.map(str::to_string),
            None,
        ),
        created_at: now,
        updated_at: now,
    };
    state
        .kv
        .put(user.into_item().expect("encode user"))
        .await
        .expect("seed user");
}

#[tokio::test]
async fn options_preflight_and_cors_headers() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["Access-Control-Allow-Origin"],
        "*"
    );
    assert_eq!(
        response.headers()["Access-Control-Allow-Methods"],
        "GET,POST,PUT,DELETE,OPTIONS"
    );

    let health = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health
        .headers()
        .contains_key("Access-Control-Allow-Headers"));
}

#[tokio::test]
async fn sign_up_confirm_sign_in_path() {
    let (app, _) = test_app();

    let (status, signed_up) = send(
        &app,
        Method::POST,
        "/auth/signup",
        Some(json!({"email": "a@x.com", "password": "Password1!", "name": "A"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = signed_up["userId"].as_str().expect("userId").to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/confirm",
        Some(json!({"email": "a@x.com", "code": "123456"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, signed_in) = send(
        &app,
        Method::POST,
        "/auth/signin",
        Some(json!({"email": "a@x.com", "password": "Password1!"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signed_in["user"]["userId"], json!(user_id));
    assert_eq!(signed_in["user"]["role"], json!("user"));
    assert!(signed_in["accessToken"].as_str().is_some());

    let (status, wrong) = send(
        &app,
        Method::POST,
        "/auth/signin",
        Some(json!({"email": "a@x.com", "password": "nope"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(wrong["error"].as_str().is_some());

    let (status, profile) = send(
        &app,
        Method::GET,
        &format!("/auth/profile?userId={user_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["email"], json!("a@x.com"));
}

#[tokio::test]
async fn admin_role_matrix_over_http() {
    let (app, state) = test_app();
    seed_user(&state, "O1", Role::OrgAdmin, Some("org-1"), None).await;
    seed_user(&state, "P1", Role::User, Some("org-1"), Some("c-1")).await;

    let in_scope = json!({
        "email": "new@x.com", "name": "New", "role": "user",
        "organizationId": "org-1", "companyId": "c-1"
    });
    let (status, created) =
        send(&app, Method::POST, "/admin/users", Some(in_scope), Some("O1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["temporaryPassword"].as_str().unwrap().len() >= 12);
    assert_eq!(created["user"]["role"], json!("user"));

    let foreign = json!({
        "email": "other@x.com", "name": "Other", "role": "user",
        "organizationId": "org-2", "companyId": "c-1"
    });
    let (status, _) =
        send(&app, Method::POST, "/admin/users", Some(foreign), Some("O1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let escalate = json!({
        "email": "root@x.com", "name": "Root", "role": "system_admin",
        "organizationId": "org-1", "companyId": "c-1"
    });
    let (status, body) =
        send(&app, Method::POST, "/admin/users", Some(escalate), Some("O1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some());

    // Listing is forced to the admin's own organization.
    let (status, listed) = send(&app, Method::GET, "/admin/users", None, Some("O1")).await;
    assert_eq!(status, StatusCode::OK);
    let users = listed["users"].as_array().unwrap();
    assert!(users
        .iter()
        .all(|user| user["organizationId"] == json!("org-1")));

    let (status, _) = send(&app, Method::GET, "/admin/users", None, Some("P1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn company_visibility_over_http() {
    let (app, _) = test_app();

    let upload = |user: &str, role: &str| {
        json!({
            "fileName": "note.txt",
            "fileType": "txt",
            "mimeType": "text/plain",
            "fileDataBase64": BASE64.encode("shared note"),
            "userId": user,
            "userRole": role,
            "organizationId": "org-1",
            "companyId": "c-1",
            "visibility": "company"
        })
    };

    let (status, body) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(upload("U", "user")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some());

    let (status, uploaded) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(upload("CA", "company_admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let file_id = uploaded["fileId"].as_str().unwrap().to_string();
    assert_eq!(uploaded["status"], json!("ready"));

    let (status, visible) = send(
        &app,
        Method::GET,
        "/files?userId=V&userRole=user&organizationId=org-1&companyId=c-1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(visible["files"]
        .as_array()
        .unwrap()
        .iter()
        .any(|file| file["fileId"] == json!(file_id)));

    let (status, hidden) = send(
        &app,
        Method::GET,
        "/files?userId=W&userRole=user&organizationId=org-1&companyId=c-2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(hidden["files"]
        .as_array()
        .unwrap()
        .iter()
        .all(|file| file["fileId"] != json!(file_id)));
}

#[tokio::test]
async fn rag_turn_then_cascade_delete() {
    let (app, _) = test_app();

    let (status, uploaded) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(json!({
            "fileName": "facts.csv",
            "fileType": "csv",
            "mimeType": "text/csv",
            "fileDataBase64": BASE64.encode("name,age\nAlice,30\nBob,40"),
            "userId": "U1"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let file_id = uploaded["fileId"].as_str().unwrap().to_string();

    let (status, turn) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": SONNET,
            "messages": [{"role": "user", "content": "How old is Alice?"}],
            "fileIds": [file_id],
            "saveHistory": true,
            "userId": "U1"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["content"], json!("Alice is 30."));
    let conversation_id = turn["conversationId"].as_str().unwrap().to_string();
    assert_eq!(turn["usage"]["inputTokens"], json!(200));
    assert_eq!(turn["usage"]["outputTokens"], json!(50));

    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/conversations/{conversation_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversation = &fetched["conversation"];
    assert_eq!(conversation["messageCount"], json!(2));
    assert_eq!(conversation["totalInputTokens"], json!(200));
    assert_eq!(conversation["totalOutputTokens"], json!(50));
    let expected_cost = (200.0 * 3.0 + 50.0 * 15.0) / 1e6;
    let total_cost = conversation["totalCost"].as_f64().unwrap();
    assert!((total_cost - expected_cost).abs() < 1e-9);

    let messages = fetched["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], json!("user"));
    assert_eq!(messages[1]["role"], json!("assistant"));

    let (status, listed) = send(
        &app,
        Method::GET,
        "/conversations?userId=U1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["conversations"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/conversations/{conversation_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/conversations/{conversation_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(
        &app,
        Method::GET,
        "/conversations?userId=U1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed["conversations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn provider_switch_routes_to_gemini() {
    let (app, _) = test_app();
    let (status, turn) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": FLASH,
            "messages": [{"role": "user", "content": "How old is Alice?"}],
            "userId": "U1"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["provider"], json!("gemini"));

    let conversation_id = turn["conversationId"].as_str().unwrap();
    let (_, fetched) = send(
        &app,
        Method::GET,
        &format!("/conversations/{conversation_id}"),
        None,
        None,
    )
    .await;
    let expected_cost = (150.0 * 0.5 + 40.0 * 3.0) / 1e6;
    let total_cost = fetched["conversation"]["totalCost"].as_f64().unwrap();
    assert!((total_cost - expected_cost).abs() < 1e-9);
}

#[tokio::test]
async fn chat_validation_boundaries() {
    let (app, _) = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({"model": SONNET, "messages": []})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": "gpt-99",
            "messages": [{"role": "user", "content": "hi"}]
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Edge sampling parameters are forwarded, not rejected.
    let (status, _) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": SONNET,
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.0,
            "maxTokens": 1
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Guessed file ids are ignored, never an error.
    let (status, _) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": SONNET,
            "messages": [{"role": "user", "content": "hi"}],
            "fileIds": ["not-a-real-file"]
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/chat",
        Some(json!({
            "model": SONNET,
            "messages": [{"role": "user", "content": "x".repeat(1_100_000)}]
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn file_delete_is_pinned_to_200_then_404() {
    let (app, _) = test_app();
    let (_, uploaded) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(json!({
            "fileName": "note.txt",
            "fileType": "txt",
            "mimeType": "text/plain",
            "fileDataBase64": BASE64.encode("bye"),
            "userId": "U1"
        })),
        None,
    )
    .await;
    let file_id = uploaded["fileId"].as_str().unwrap().to_string();

    let uri = format!("/files/{file_id}?userId=U1&userRole=user");
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_upload_type_is_rejected() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(json!({
            "fileName": "movie.mp4",
            "fileType": "mp4",
            "fileDataBase64": BASE64.encode("data"),
            "userId": "U1"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mp4"));
}

#[tokio::test]
async fn models_endpoint_serves_the_registry() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/models", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let models = body["models"].as_array().unwrap();
    assert!(models.iter().any(|m| m["modelId"] == json!(SONNET)));
    let sonnet = models
        .iter()
        .find(|m| m["modelId"] == json!(SONNET))
        .unwrap();
    assert_eq!(sonnet["pricing"]["input"], json!(3.0));
    assert_eq!(sonnet["provider"], json!("bedrock"));
}

#[tokio::test]
async fn csv_query_endpoint_summarizes_schema() {
    let (app, _) = test_app();
    let (_, uploaded) = send(
        &app,
        Method::POST,
        "/files/upload",
        Some(json!({
            "fileName": "facts.csv",
            "fileType": "csv",
            "fileDataBase64": BASE64.encode("name,age\nAlice,30\nBob,40"),
            "userId": "U1"
        })),
        None,
    )
    .await;
    let file_id = uploaded["fileId"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/files/{file_id}/query"),
        Some(json!({"question": "schema?"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sourceData"]["rowCount"], json!(2));
    assert_eq!(body["sourceData"]["headers"][1], json!("age"));
}
