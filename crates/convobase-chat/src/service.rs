use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use convobase_files::{FileContext, FileService};
use convobase_llm::chat::{ChatMessage, ChatRequest, TokenUsage};
use convobase_llm::registry::{ModelRegistry, ProviderRegistry};
use convobase_storage::kv::{IndexName, KvKey, KvQuery, KvStore, KvUpdate};
use convobase_storage::model::keys;
use convobase_storage::model::{Conversation, ConversationMessage, UserRecord};
use convobase_types::prelude::{Actor, ChatRole, ScopeIds, Timestamp};

use crate::errors::ChatError;
use crate::rag;

const TITLE_CHARS: usize = 50;

#[derive(Clone, Debug)]
pub struct ChatTurnRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    pub file_ids: Vec<String>,
    pub save_history: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnOutcome {
    pub content: String,
    pub model: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

pub struct ChatService {
    kv: Arc<dyn KvStore>,
    files: Arc<FileService>,
    providers: Arc<ProviderRegistry>,
    models: Arc<ModelRegistry>,
}

impl ChatService {
    pub fn new(
        kv: Arc<dyn KvStore>,
        files: Arc<FileService>,
        providers: Arc<ProviderRegistry>,
        models: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            kv,
            files,
            providers,
            models,
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// One chat turn: validate, assemble file context, dispatch, price, and
    /// persist. Persistence failures after a successful provider call are
    /// tolerated: the content is returned without a conversation id.
    pub async fn handle(&self, request: ChatTurnRequest) -> Result<ChatTurnOutcome, ChatError> {
        if request.messages.is_empty() {
            return Err(ChatError::validation("At least one message is required."));
        }
        let info = self
            .models
            .get(&request.model)
            .ok_or_else(|| ChatError::unknown_model(&request.model))?
            .clone();

        let actor = self.resolve_actor(request.user_id.as_deref()).await?;
        let contexts = self.gather_contexts(&actor, &request.file_ids).await?;
        let system_prompt =
            rag::compose_system_prompt(request.system_prompt.as_deref(), &contexts);

        let provider = self.providers.get(info.provider).ok_or_else(|| {
            ChatError::provider(&format!(
                "provider {} is not configured",
                info.provider.as_str()
            ))
        })?;

        let response = provider
            .invoke(ChatRequest {
                model_id: request.model.clone(),
                messages: request.messages.clone(),
                system_prompt,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .await?;

        let usage = response.usage;
        let cost = usage.map(|u| info.pricing.cost(&u)).unwrap_or(0.0);

        let conversation_id = if request.save_history {
            let conversation_id = request
                .conversation_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            match self
                .persist_turn(&actor, &request, &conversation_id, &response.content, usage, cost)
                .await
            {
                Ok(()) => Some(conversation_id),
                Err(err) => {
                    warn!(
                        %conversation_id,
                        error = %err,
                        "chat history persistence failed; returning content without conversation id"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(ChatTurnOutcome {
            content: response.content,
            model: request.model,
            provider: response.provider,
            conversation_id,
            usage,
        })
    }

    pub async fn list_conversations(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Conversation>, ChatError> {
        let mut query = KvQuery::index(IndexName::Gsi1, keys::owner_partition(user_id))
            .with_sort_prefix(keys::CONV_PREFIX)
            .descending();
        if let Some(limit) = limit {
            query = query.with_limit(limit);
        }
        let items = self.kv.query(&query).await?;
        items
            .iter()
            .map(|item| Conversation::from_item(item).map_err(ChatError::from))
            .collect()
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<ConversationMessage>), ChatError> {
        let meta = self
            .kv
            .get(&keys::conversation_pk(conversation_id), keys::SK_META)
            .await?
            .ok_or_else(|| ChatError::not_found(&format!("conversation {conversation_id}")))?;
        let conversation = Conversation::from_item(&meta)?;

        let items = self
            .kv
            .query(
                &KvQuery::base(keys::conversation_pk(conversation_id))
                    .with_sort_prefix(keys::MSG_PREFIX),
            )
            .await?;
        let messages = items
            .iter()
            .map(|item| ConversationMessage::from_item(item).map_err(ChatError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((conversation, messages))
    }

    /// Removes the metadata item and every message sharing its partition.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ChatError> {
        let partition = keys::conversation_pk(conversation_id);
        let items = self.kv.query(&KvQuery::base(&partition)).await?;
        if items.is_empty() {
            return Err(ChatError::not_found(&format!(
                "conversation {conversation_id}"
            )));
        }
        let keys: Vec<KvKey> = items
            .iter()
            .map(|item| KvKey::new(item.pk(), item.sk()))
            .collect();
        self.kv.batch_delete(&keys).await?;
        Ok(())
    }

    async fn resolve_actor(&self, user_id: Option<&str>) -> Result<Actor, ChatError> {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return Ok(Actor::anonymous());
        };
        let item = self
            .kv
            .get(&keys::user_pk(user_id), keys::SK_META)
            .await?;
        match item {
            Some(item) => Ok(UserRecord::from_item(&item)?.actor()),
            // Unknown callers still own their id: their own uploads match.
            None => Ok(Actor::new(
                user_id,
                convobase_types::prelude::Role::User,
                ScopeIds::default(),
            )),
        }
    }

    /// File texts are fetched concurrently but concatenated in request
    /// order. Missing and inaccessible ids are skipped silently.
    async fn gather_contexts(
        &self,
        actor: &Actor,
        file_ids: &[String],
    ) -> Result<Vec<FileContext>, ChatError> {
        let fetched = futures_util::future::try_join_all(
            file_ids
                .iter()
                .map(|file_id| self.files.accessible_text(actor, file_id)),
        )
        .await?;
        Ok(fetched.into_iter().flatten().collect())
    }

    async fn persist_turn(
        &self,
        actor: &Actor,
        request: &ChatTurnRequest,
        conversation_id: &str,
        assistant_content: &str,
        usage: Option<TokenUsage>,
        cost: f64,
    ) -> Result<(), ChatError> {
        let user_ts = Timestamp::now();
        // The assistant message must sort after the user message even when
        // both land in the same millisecond.
        let assistant_ts = Timestamp(user_ts.0 + 1);

        let meta_pk = keys::conversation_pk(conversation_id);
        let existing = self.kv.get(&meta_pk, keys::SK_META).await?;
        if existing.is_none() {
            let conversation = Conversation {
                conversation_id: conversation_id.to_string(),
                title: title_from(&request.messages),
                user_id: actor.user_id.clone(),
                scopes: actor.scopes.clone(),
                model_id: request.model.clone(),
                created_at: user_ts,
                updated_at: user_ts,
                message_count: 0,
                total_input_tokens: 0,
                total_output_tokens: 0,
                total_cost: 0.0,
            };
            self.kv.put(conversation.into_item()?).await?;
        }

        let user_content = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        let user_message = ConversationMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::User,
            content: user_content,
            model_id: None,
            input_tokens: None,
            output_tokens: None,
            cost: None,
            created_at: user_ts,
        };
        self.kv.put(user_message.into_item(conversation_id)?).await?;

        let assistant_message = ConversationMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: assistant_content.to_string(),
            model_id: Some(request.model.clone()),
            input_tokens: usage.map(|u| u.input_tokens),
            output_tokens: usage.map(|u| u.output_tokens),
            cost: Some(cost),
            created_at: assistant_ts,
        };
        self.kv
            .put(assistant_message.into_item(conversation_id)?)
            .await?;

        // Single unconditional counter update: concurrent turns interleave
        // but the sums converge. Touching updatedAt also refreshes the
        // GSI1 sort key, so listings stay most-recent-first.
        let usage = usage.unwrap_or_default();
        let patch = KvUpdate::new()
            .add("messageCount", json!(2))
            .add("totalInputTokens", json!(usage.input_tokens))
            .add("totalOutputTokens", json!(usage.output_tokens))
            .add("totalCost", json!(cost))
            .set("updatedAt", json!(assistant_ts))
            .set(
                convobase_storage::kv::ATTR_GSI1SK,
                json!(keys::conversation_gsi1_sk(&assistant_ts)),
            );
        self.kv.update(&meta_pk, keys::SK_META, &patch).await?;
        Ok(())
    }
}

fn title_from(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .find(|message| message.role == ChatRole::User)
        .or_else(|| messages.first())
        .map(|message| message.content.chars().take(TITLE_CHARS).collect())
        .unwrap_or_default()
}
