pub use crate::blob::BlobStore;
pub use crate::errors::StorageError;
pub use crate::kv::{
    IndexName, KvItem, KvKey, KvQuery, KvStore, KvUpdate, ATTR_GSI1PK, ATTR_GSI1SK, ATTR_GSI2PK,
    ATTR_GSI2SK, ATTR_PK, ATTR_SK,
};
pub use crate::memory::{MemoryBlobStore, MemoryKvStore};
pub use crate::model::{keys, Conversation, ConversationMessage, FileRecord, Record, UserRecord};
