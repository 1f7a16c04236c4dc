use std::env;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_address")]
    pub address: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_address() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hermetic in-process stores; the default for local runs and tests.
    #[default]
    Memory,
    Aws,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub main_table: Option<String>,
    #[serde(default)]
    pub files_bucket: Option<String>,
    #[serde(default)]
    pub user_pool_id: Option<String>,
    #[serde(default)]
    pub user_pool_client_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Region hosting the `us.*` cross-region inference profiles.
    #[serde(default = "LlmConfig::default_bedrock_region")]
    pub bedrock_region: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

impl LlmConfig {
    fn default_bedrock_region() -> String {
        "us-east-1".to_string()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            bedrock_region: Self::default_bedrock_region(),
            gemini_api_key: None,
        }
    }
}

impl GatewayConfig {
    /// File under env, env under the well-known deployment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config_file = env::var("CONVOBASE_CONFIG_FILE")
            .unwrap_or_else(|_| "config/convobase.toml".to_string());

        let mut builder = config::Config::builder();
        if Path::new(&config_file).exists() {
            builder = builder.add_source(config::File::from(Path::new(&config_file)));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CONVOBASE").separator("__"),
        );

        let mut loaded: GatewayConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        let overlay = |slot: &mut Option<String>, var: &str| {
            if let Ok(value) = env::var(var) {
                if !value.is_empty() {
                    *slot = Some(value);
                }
            }
        };
        overlay(&mut loaded.backend.main_table, "MAIN_TABLE");
        overlay(&mut loaded.backend.files_bucket, "FILES_BUCKET");
        overlay(&mut loaded.backend.user_pool_id, "USER_POOL_ID");
        overlay(&mut loaded.backend.user_pool_client_id, "USER_POOL_CLIENT_ID");
        overlay(&mut loaded.backend.region, "AWS_REGION");
        overlay(&mut loaded.llm.gemini_api_key, "GEMINI_API_KEY");
        // A configured table implies the AWS backend.
        if loaded.backend.main_table.is_some() && loaded.backend.kind == BackendKind::Memory {
            loaded.backend.kind = BackendKind::Aws;
        }

        Ok(loaded)
    }
}
