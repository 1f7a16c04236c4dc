pub mod errors;
pub mod rag;
pub mod service;

pub use errors::ChatError;
pub use service::{ChatService, ChatTurnOutcome, ChatTurnRequest};
