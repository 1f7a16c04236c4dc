pub mod keys;
mod records;

pub use records::{Conversation, ConversationMessage, FileRecord, Record, UserRecord};
