use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, StatusCode, Url,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use convobase_types::prelude::ChatRole;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};
use crate::errors::LlmError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const DEFAULT_VERSION: &str = "v1beta";
const DEFAULT_MAX_TOKENS: u32 = 8192;

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub api_version: String,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|err| LlmError::unknown(&format!("gemini base url parse failed: {err}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            api_version: DEFAULT_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 8,
        })
    }

    pub fn with_base_url(mut self, base: impl AsRef<str>) -> Result<Self, LlmError> {
        self.base_url = Url::parse(base.as_ref())
            .map_err(|err| LlmError::unknown(&format!("gemini base url parse failed: {err}")))?;
        if !self.base_url.path().ends_with('/') {
            self.base_url
                .set_path(&format!("{}/", self.base_url.path().trim_end_matches('/')));
        }
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }
}

struct GeminiShared {
    client: Client,
    config: GeminiConfig,
    limiter: Arc<Semaphore>,
}

impl GeminiShared {
    fn endpoint(&self, model: &str) -> Result<Url, LlmError> {
        let version = self.config.api_version.trim_end_matches('/');
        let joined = format!("{version}/models/{model}:generateContent");
        let mut url = self
            .config
            .base_url
            .join(&joined)
            .map_err(|err| LlmError::unknown(&format!("gemini endpoint build failed: {err}")))?;
        url.query_pairs_mut()
            .append_pair("key", &self.config.api_key);
        Ok(url)
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, LlmError> {
        self.limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| LlmError::unknown(&format!("gemini limiter closed: {err}")))
    }
}

/// Adapter for the direct vendor API: `assistant` maps to `model`, the
/// system prompt to a system-instruction field, image attachments to
/// inline-data parts.
pub struct GeminiProvider {
    shared: Arc<GeminiShared>,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| LlmError::unknown(&format!("gemini client build failed: {err}")))?;

        let max_concurrency = config.max_concurrent_requests;
        Ok(Self {
            shared: Arc::new(GeminiShared {
                client,
                limiter: Arc::new(Semaphore::new(max_concurrency)),
                config,
            }),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GenerateContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GenerateContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerateContent {
    role: String,
    parts: Vec<ContentPart>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct GenerateCandidate {
    content: Option<GenerateContentBlock>,
}

#[derive(Deserialize)]
struct GenerateContentBlock {
    #[serde(default)]
    parts: Vec<GeneratePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeneratePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

fn build_generate_request(request: &ChatRequest) -> Result<GenerateContentRequest, LlmError> {
    let mut contents = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };
        let mut parts = vec![ContentPart {
            text: Some(message.content.clone()),
            ..ContentPart::default()
        }];
        for attachment in &message.attachments {
            // Non-image attachments are dropped from the provider payload.
            if !attachment.is_image() {
                continue;
            }
            parts.push(ContentPart {
                inline_data: Some(InlineData {
                    mime_type: attachment.media_type.clone(),
                    data: BASE64.encode(&attachment.bytes),
                }),
                ..ContentPart::default()
            });
        }
        contents.push(GenerateContent {
            role: role.to_string(),
            parts,
        });
    }

    if contents.is_empty() {
        return Err(LlmError::schema(
            "gemini request requires at least one message",
        ));
    }

    let system_instruction = request
        .system_prompt
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|text| GenerateContent {
            role: "system".to_string(),
            parts: vec![ContentPart {
                text: Some(text.to_string()),
                ..ContentPart::default()
            }],
        });

    Ok(GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        },
    })
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    match status {
        StatusCode::BAD_REQUEST => LlmError::schema(&format!("gemini rejected request: {body}")),
        _ => LlmError::provider(&format!("gemini returned {}: {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn invoke(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let payload = build_generate_request(&request)?;
        let _permit = self.shared.acquire().await?;
        let endpoint = self.shared.endpoint(&request.model_id)?;

        let response = self
            .shared
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| LlmError::provider(&format!("gemini request error: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".into());
            return Err(map_http_error(status, &body));
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| LlmError::provider(&format!("gemini response decode: {err}")))?;

        let mut candidates = payload.candidates;
        let candidate = candidates
            .pop()
            .ok_or_else(|| LlmError::provider("gemini returned no candidates"))?;
        let content = candidate
            .content
            .ok_or_else(|| LlmError::provider("gemini candidate missing content"))?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>();

        let usage = payload.usage_metadata.map(|usage| TokenUsage {
            input_tokens: usage.prompt_token_count.unwrap_or_default(),
            output_tokens: usage.candidates_token_count.unwrap_or_default(),
        });

        Ok(ChatResponse {
            content,
            model_id: request.model_id,
            provider: self.name().to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Attachment, ChatMessage};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GeminiProvider {
        let config = GeminiConfig::new("test-key")
            .unwrap()
            .with_base_url(server.uri())
            .unwrap();
        GeminiProvider::new(config).unwrap()
    }

    fn sample_response() -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello there!"}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 8,
                "candidatesTokenCount": 6
            }
        })
    }

    #[tokio::test]
    async fn chat_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(
                r"^/v1beta/models/gemini-3-flash-preview:generateContent$",
            ))
            .and(query_param("key", "test-key"))
            .and(header(CONTENT_TYPE.as_str(), "application/json"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Say hi"}]}],
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "generationConfig": {"maxOutputTokens": 8192}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let response = provider
            .invoke(ChatRequest {
                model_id: "gemini-3-flash-preview".into(),
                messages: vec![ChatMessage::user("Say hi")],
                system_prompt: Some("Be brief.".into()),
                max_tokens: None,
                temperature: None,
            })
            .await
            .expect("chat succeeds");

        assert_eq!(response.content, "Hello there!");
        assert_eq!(response.provider, "gemini");
        let usage = response.usage.expect("usage reported");
        assert_eq!(usage.input_tokens, 8);
        assert_eq!(usage.output_tokens, 6);
    }

    #[tokio::test]
    async fn assistant_turns_replay_as_model_role_with_inline_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [
                        {"text": "look"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]},
                    {"role": "model", "parts": [{"text": "I see."}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut first = ChatMessage::user("look");
        first.attachments = vec![
            Attachment {
                name: "pixel.png".into(),
                media_type: "image/png".into(),
                bytes: vec![1, 2, 3],
            },
            Attachment {
                name: "notes.csv".into(),
                media_type: "text/csv".into(),
                bytes: vec![9],
            },
        ];
        provider
            .invoke(ChatRequest {
                model_id: "gemini-3-flash-preview".into(),
                messages: vec![first, ChatMessage::assistant("I see.")],
                system_prompt: None,
                max_tokens: Some(64),
                temperature: Some(0.0),
            })
            .await
            .expect("chat succeeds");
    }

    #[tokio::test]
    async fn upstream_failure_preserves_vendor_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .invoke(ChatRequest {
                model_id: "gemini-3-flash-preview".into(),
                messages: vec![ChatMessage::user("hi")],
                system_prompt: None,
                max_tokens: None,
                temperature: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.0.code.0, "PROVIDER.UPSTREAM");
        assert!(err.0.message_user.contains("backend exploded"));
    }
}
