//! Best-effort conversation titles.
//!
//! One auxiliary model call with minimal context, issued concurrently with
//! the main turn. Any failure falls back to a timestamp placeholder; the
//! caller's turn is never affected.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use dash_core::ModelMessage;

use crate::client::ChatClient;

pub const TITLE_MAX_CHARS: usize = 20;

const TITLE_PROMPT: &str = "Produce a title of at most 20 characters for a conversation that \
starts with the following message. Reply with the title only, no quotes.";

pub fn fallback_title() -> String {
    Utc::now().format("Chat %Y-%m-%d %H:%M").to_string()
}

/// Derives a short title from the first user message. The token here is the
/// title task's own; cancelling the main turn does not abort it.
pub async fn generate_title(client: &dyn ChatClient, first_message: &str) -> String {
    let messages = [
        ModelMessage::system(TITLE_PROMPT),
        ModelMessage::human(first_message, "title"),
    ];

    match client.invoke(&messages, &[], &CancellationToken::new()).await {
        Ok(response) => {
            let title = truncate_title(response.text.trim());
            if title.is_empty() {
                fallback_title()
            } else {
                title
            }
        }
        Err(error) => {
            log::debug!("title generation failed, using placeholder: {error}");
            fallback_title()
        }
    }
}

fn truncate_title(title: &str) -> String {
    title.chars().take(TITLE_MAX_CHARS).collect()
}
