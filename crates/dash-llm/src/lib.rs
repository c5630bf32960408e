pub mod client;
pub mod openai;
pub mod title;

pub use client::{AiResponse, ChatClient, LlmError};
pub use openai::OpenAiCompatClient;
pub use title::{fallback_title, generate_title, TITLE_MAX_CHARS};
