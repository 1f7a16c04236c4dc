mod converse;
mod gemini;

pub use converse::{ConverseConfig, ConverseProvider};
pub use gemini::{GeminiConfig, GeminiProvider};
