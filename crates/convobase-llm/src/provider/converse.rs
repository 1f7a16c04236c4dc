use async_trait::async_trait;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ImageBlock, ImageFormat, ImageSource,
    InferenceConfiguration, Message, SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;
use aws_smithy_types::error::display::DisplayErrorContext;

use convobase_types::prelude::ChatRole;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};
use crate::errors::LlmError;

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Clone, Debug)]
pub struct ConverseConfig {
    /// Must be the region hosting the cross-region inference profiles the
    /// `us.*` model ids target.
    pub region: String,
    pub endpoint: Option<String>,
}

impl Default for ConverseConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

/// Adapter for the unified converse API: every message becomes a
/// content-block list, the system prompt a system-content block.
pub struct ConverseProvider {
    client: Client,
}

impl ConverseProvider {
    pub async fn new(config: ConverseConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_bedrockruntime::config::Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn image_format(media_type: &str) -> Option<ImageFormat> {
    match media_type {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::Webp),
        _ => None,
    }
}

#[async_trait]
impl ChatProvider for ConverseProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn invoke(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut converse = self.client.converse().model_id(&request.model_id);

        for message in &request.messages {
            let role = match message.role {
                ChatRole::User => ConversationRole::User,
                ChatRole::Assistant => ConversationRole::Assistant,
            };
            let mut builder = Message::builder()
                .role(role)
                .content(ContentBlock::Text(message.content.clone()));
            for attachment in &message.attachments {
                // Unrecognized media types are dropped from the provider
                // payload; the saved message keeps them.
                let Some(format) = image_format(&attachment.media_type) else {
                    continue;
                };
                let image = ImageBlock::builder()
                    .format(format)
                    .source(ImageSource::Bytes(Blob::new(attachment.bytes.clone())))
                    .build()
                    .map_err(|e| LlmError::unknown(&format!("image block build: {e}")))?;
                builder = builder.content(ContentBlock::Image(image));
            }
            let message = builder
                .build()
                .map_err(|e| LlmError::unknown(&format!("message build: {e}")))?;
            converse = converse.messages(message);
        }

        if let Some(system) = request.system_prompt.as_deref() {
            if !system.is_empty() {
                converse = converse.system(SystemContentBlock::Text(system.to_string()));
            }
        }

        let inference = InferenceConfiguration::builder()
            .max_tokens(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS) as i32)
            .temperature(request.temperature.unwrap_or(DEFAULT_TEMPERATURE))
            .build();

        let response = converse
            .inference_config(inference)
            .send()
            .await
            .map_err(|e| LlmError::provider(&format!("{}", DisplayErrorContext(&e))))?;

        let output = response
            .output()
            .ok_or_else(|| LlmError::provider("converse response missing output"))?;
        let message = output
            .as_message()
            .map_err(|_| LlmError::provider("converse output was not a message"))?;

        let mut content = String::new();
        for block in message.content() {
            if let Ok(text) = block.as_text() {
                content.push_str(text);
            }
        }

        let usage = response.usage().map(|usage| TokenUsage {
            input_tokens: usage.input_tokens().max(0) as u64,
            output_tokens: usage.output_tokens().max(0) as u64,
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
    use aws_sdk_bedrockruntime::config::{BehaviorVersion, Credentials, Region};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(endpoint: &str) -> Client {
        let config = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url(endpoint)
            .build();
        Client::from_conf(config)
    }

    fn converse_body() -> serde_json::Value {
        json!({
            "output": {
                "message": {
                    "role": "assistant",
                    "content": [{"text": "Alice is 30."}]
                }
            },
            "stopReason": "end_turn",
            "usage": {"inputTokens": 8, "outputTokens": 6, "totalTokens": 14},
            "metrics": {"latencyMs": 42}
        })
    }

    #[tokio::test]
    async fn chat_happy_path_surfaces_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/model/.+/converse$"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": [{"text": "How old is Alice?"}]}],
                "system": [{"text": "context"}],
                "inferenceConfig": {"maxTokens": 4096}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(converse_body()))
            .mount(&server)
            .await;

        let provider = ConverseProvider::from_client(test_client(&server.uri()));
        let response = provider
            .invoke(ChatRequest {
                model_id: "us.anthropic.claude-sonnet-4-5-20250929-v1:0".into(),
                messages: vec![ChatMessage::user("How old is Alice?")],
                system_prompt: Some("context".into()),
                max_tokens: None,
                temperature: None,
            })
            .await
            .expect("chat succeeds");

        assert_eq!(response.content, "Alice is 30.");
        assert_eq!(response.provider, "bedrock");
        let usage = response.usage.expect("usage reported");
        assert_eq!(usage.input_tokens, 8);
        assert_eq!(usage.output_tokens, 6);
    }

    #[tokio::test]
    async fn unknown_attachment_types_are_dropped_from_payload() {
        let server = MockServer::start().await;
        // The PDF attachment must not appear; the PNG becomes an image block.
        Mock::given(method("POST"))
            .and(path_regex(r"^/model/.+/converse$"))
            .and(body_partial_json(json!({
                "messages": [{
                    "role": "user",
                    "content": [
                        {"text": "look"},
                        {"image": {"format": "png"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(converse_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ConverseProvider::from_client(test_client(&server.uri()));
        let mut message = ChatMessage::user("look");
        message.attachments = vec![
            Attachment {
                name: "doc.pdf".into(),
                media_type: "application/pdf".into(),
                bytes: vec![1, 2],
            },
            Attachment {
                name: "pixel.png".into(),
                media_type: "image/png".into(),
                bytes: vec![3, 4],
            },
        ];
        provider
            .invoke(ChatRequest {
                model_id: "us.anthropic.claude-haiku-4-5-20251001-v1:0".into(),
                messages: vec![message],
                system_prompt: None,
                max_tokens: Some(1),
                temperature: Some(0.0),
            })
            .await
            .expect("chat succeeds");
    }
}
