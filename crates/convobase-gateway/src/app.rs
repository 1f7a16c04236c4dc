use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use convobase_admin::AdminService;
use convobase_auth::authn::{
    BearerResolver, CognitoConfig, CognitoIdentityProvider, IdentityProvider,
    MemoryIdentityProvider, SubjectBearerResolver,
};
use convobase_chat::ChatService;
use convobase_files::FileService;
use convobase_llm::prelude::{
    ConverseConfig, ConverseProvider, GeminiConfig, GeminiProvider, ModelRegistry, ProviderKind,
    ProviderRegistry,
};
use convobase_storage::aws::{DynamoDbConfig, DynamoDbKvStore, S3BlobStore, S3Config};
use convobase_storage::blob::BlobStore;
use convobase_storage::kv::KvStore;
use convobase_storage::memory::{MemoryBlobStore, MemoryKvStore};

use crate::config::{BackendKind, GatewayConfig};
use crate::cors;
use crate::handlers;

const BODY_LIMIT_BYTES: usize = 1_048_576;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub files: Arc<FileService>,
    pub admin: Arc<AdminService>,
    pub models: Arc<ModelRegistry>,
    pub kv: Arc<dyn KvStore>,
    pub bearer: Arc<dyn BearerResolver>,
}

impl AppState {
    /// Wires the services over the configured backends. The memory backend
    /// is fully hermetic; the AWS backend requires the deployment
    /// variables from the environment.
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let (kv, blobs, identity): (
            Arc<dyn KvStore>,
            Arc<dyn BlobStore>,
            Arc<dyn IdentityProvider>,
        ) = match config.backend.kind {
            BackendKind::Memory => (
                Arc::new(MemoryKvStore::new()),
                Arc::new(MemoryBlobStore::new()),
                Arc::new(MemoryIdentityProvider::new()),
            ),
            BackendKind::Aws => {
                let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest())
                    .await;
                let table = config
                    .backend
                    .main_table
                    .clone()
                    .context("MAIN_TABLE is required for the aws backend")?;
                let bucket = config
                    .backend
                    .files_bucket
                    .clone()
                    .context("FILES_BUCKET is required for the aws backend")?;
                let user_pool_id = config
                    .backend
                    .user_pool_id
                    .clone()
                    .context("USER_POOL_ID is required for the aws backend")?;
                let client_id = config
                    .backend
                    .user_pool_client_id
                    .clone()
                    .context("USER_POOL_CLIENT_ID is required for the aws backend")?;

                let kv = DynamoDbKvStore::new(
                    &sdk_config,
                    DynamoDbConfig {
                        table_name: table,
                        region: config.backend.region.clone(),
                        endpoint: None,
                    },
                )
                .await
                .context("dynamodb store init failed")?;
                let blobs = S3BlobStore::new(
                    &sdk_config,
                    S3Config {
                        bucket,
                        region: config.backend.region.clone(),
                        endpoint: None,
                    },
                )
                .await
                .context("s3 store init failed")?;
                let identity = CognitoIdentityProvider::new(
                    &sdk_config,
                    CognitoConfig {
                        user_pool_id,
                        client_id,
                        region: config.backend.region.clone(),
                    },
                )
                .await
                .context("cognito provider init failed")?;
                (Arc::new(kv), Arc::new(blobs), Arc::new(identity))
            }
        };

        let mut providers = ProviderRegistry::new();
        providers.register(
            ProviderKind::Bedrock,
            Arc::new(
                ConverseProvider::new(ConverseConfig {
                    region: config.llm.bedrock_region.clone(),
                    endpoint: None,
                })
                .await,
            ),
        );
        match config.llm.gemini_api_key.as_deref() {
            Some(api_key) if !api_key.is_empty() => {
                let gemini = GeminiProvider::new(GeminiConfig::new(api_key)?)?;
                providers.register(ProviderKind::Gemini, Arc::new(gemini));
            }
            _ => warn!("GEMINI_API_KEY not set; gemini models are unavailable"),
        }

        let models = Arc::new(ModelRegistry::builtin());
        let files = Arc::new(FileService::new(kv.clone(), blobs));
        let chat = Arc::new(ChatService::new(
            kv.clone(),
            files.clone(),
            Arc::new(providers),
            models.clone(),
        ));
        let admin = Arc::new(AdminService::new(kv.clone(), identity));

        info!(backend = ?config.backend.kind, "convobase services ready");
        Ok(Self {
            chat,
            files,
            admin,
            models,
            kv,
            bearer: Arc::new(SubjectBearerResolver),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/models", get(handlers::models::list_models))
        .route("/files/upload", post(handlers::files::upload))
        .route("/files", get(handlers::files::list))
        .route(
            "/files/:id",
            get(handlers::files::get_file)
                .put(handlers::files::update_visibility)
                .delete(handlers::files::delete_file),
        )
        .route("/files/:id/query", post(handlers::files::query_file))
        .route("/conversations", get(handlers::conversations::list))
        .route(
            "/conversations/:id",
            get(handlers::conversations::get_conversation)
                .delete(handlers::conversations::delete_conversation),
        )
        .route("/auth/signup", post(handlers::auth::sign_up))
        .route("/auth/confirm", post(handlers::auth::confirm))
        .route("/auth/signin", post(handlers::auth::sign_in))
        .route(
            "/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route(
            "/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(cors::apply))
        .with_state(state)
}
