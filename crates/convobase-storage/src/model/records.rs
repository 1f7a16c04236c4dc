use serde::{Deserialize, Serialize};
use serde_json::Value;

use convobase_types::prelude::{
    ChatRole, FileCategory, FileStatus, FileType, Role, ScopeIds, Timestamp, Visibility,
};

use crate::errors::StorageError;
use crate::kv::{
    KvItem, ATTR_GSI1PK, ATTR_GSI1SK, ATTR_GSI2PK, ATTR_GSI2SK, ATTR_PK, ATTR_SK,
};
use crate::model::keys;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(flatten)]
    pub scopes: ScopeIds,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_id: String,
    pub file_name: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub blob_key: String,
    pub user_id: String,
    pub created_by_role: Role,
    #[serde(flatten)]
    pub scopes: ScopeIds,
    pub uploaded_at: Timestamp,
    pub file_size: u64,
    pub status: FileStatus,
    pub visibility: Visibility,
    pub category: FileCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_blob_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: String,
    pub title: String,
    pub user_id: String,
    #[serde(flatten)]
    pub scopes: ScopeIds,
    pub model_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub message_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub message_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub created_at: Timestamp,
}

/// Tagged view over a decoded item, one arm per entity.
#[derive(Clone, Debug)]
pub enum Record {
    User(UserRecord),
    File(FileRecord),
    Conversation(Conversation),
    Message(ConversationMessage),
}

fn encode<T: Serialize>(record: &T) -> Result<KvItem, StorageError> {
    let value = serde_json::to_value(record)
        .map_err(|e| StorageError::codec(&format!("record encode: {e}")))?;
    KvItem::from_value(value)
}

fn decode<T: for<'de> Deserialize<'de>>(item: &KvItem) -> Result<T, StorageError> {
    serde_json::from_value(Value::Object(item.0.clone()))
        .map_err(|e| StorageError::codec(&format!("record decode: {e}")))
}

impl UserRecord {
    pub fn actor(&self) -> convobase_types::prelude::Actor {
        convobase_types::prelude::Actor::new(self.user_id.clone(), self.role, self.scopes.clone())
    }

    /// Base item plus the `USERS` listing projection, from one constructor
    /// so projection discipline stays mechanical.
    pub fn into_item(&self) -> Result<KvItem, StorageError> {
        let mut item = encode(self)?;
        item.set_str(ATTR_PK, keys::user_pk(&self.user_id));
        item.set_str(ATTR_SK, keys::SK_META);
        item.set_str(ATTR_GSI1PK, keys::USERS_PARTITION);
        item.set_str(ATTR_GSI1SK, keys::user_gsi1_sk(&self.created_at));
        item.set_str(keys::ATTR_ENTITY, keys::ENTITY_USER);
        Ok(item)
    }

    pub fn from_item(item: &KvItem) -> Result<Self, StorageError> {
        decode(item)
    }
}

impl FileRecord {
    pub fn into_item(&self) -> Result<KvItem, StorageError> {
        let mut item = encode(self)?;
        item.set_str(ATTR_PK, keys::file_pk(&self.file_id));
        item.set_str(ATTR_SK, keys::SK_META);
        item.set_str(ATTR_GSI1PK, keys::owner_partition(&self.user_id));
        item.set_str(ATTR_GSI1SK, keys::file_gsi1_sk(&self.uploaded_at));
        if let Some(partition) = keys::file_gsi2_partition(self.visibility, &self.scopes) {
            item.set_str(ATTR_GSI2PK, partition);
            item.set_str(ATTR_GSI2SK, keys::file_gsi1_sk(&self.uploaded_at));
        }
        item.set_str(keys::ATTR_ENTITY, keys::ENTITY_FILE);
        Ok(item)
    }

    pub fn from_item(item: &KvItem) -> Result<Self, StorageError> {
        decode(item)
    }
}

impl Conversation {
    pub fn into_item(&self) -> Result<KvItem, StorageError> {
        let mut item = encode(self)?;
        item.set_str(ATTR_PK, keys::conversation_pk(&self.conversation_id));
        item.set_str(ATTR_SK, keys::SK_META);
        item.set_str(ATTR_GSI1PK, keys::owner_partition(&self.user_id));
        item.set_str(ATTR_GSI1SK, keys::conversation_gsi1_sk(&self.updated_at));
        item.set_str(keys::ATTR_ENTITY, keys::ENTITY_CONVERSATION);
        Ok(item)
    }

    pub fn from_item(item: &KvItem) -> Result<Self, StorageError> {
        decode(item)
    }
}

impl ConversationMessage {
    /// Messages share their conversation's partition; the timestamp inside
    /// the sort key yields chronological scan order.
    pub fn into_item(&self, conversation_id: &str) -> Result<KvItem, StorageError> {
        let mut item = encode(self)?;
        item.set_str(ATTR_PK, keys::conversation_pk(conversation_id));
        item.set_str(ATTR_SK, keys::message_sk(&self.created_at, &self.message_id));
        item.set_str(keys::ATTR_ENTITY, keys::ENTITY_MESSAGE);
        Ok(item)
    }

    pub fn from_item(item: &KvItem) -> Result<Self, StorageError> {
        decode(item)
    }
}

impl Record {
    pub fn from_item(item: &KvItem) -> Result<Self, StorageError> {
        match item.str_attr(keys::ATTR_ENTITY) {
            Some(keys::ENTITY_USER) => Ok(Record::User(UserRecord::from_item(item)?)),
            Some(keys::ENTITY_FILE) => Ok(Record::File(FileRecord::from_item(item)?)),
            Some(keys::ENTITY_CONVERSATION) => {
                Ok(Record::Conversation(Conversation::from_item(item)?))
            }
            Some(keys::ENTITY_MESSAGE) => {
                Ok(Record::Message(ConversationMessage::from_item(item)?))
            }
            other => Err(StorageError::codec(&format!(
                "unknown entity tag: {other:?}"
            ))),
        }
    }
}
