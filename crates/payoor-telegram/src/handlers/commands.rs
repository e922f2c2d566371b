use std::sync::Arc;

use teloxide::types::Message;
use tracing::{debug, info, warn};

use payoor_core::{
    dispatch::Outcome,
    domain::{ChatId, ChatKind},
};

use crate::router::AppState;

pub(super) async fn handle_text(msg: &Message, text: &str, state: Arc<AppState>) {
    let chat_id = ChatId(msg.chat.id.0);
    let username = msg
        .from()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let cancel = state.shutdown.child_token();

    let kind = if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    };

    match state.commands.handle_update(chat_id, kind, text, &cancel).await {
        Outcome::Replied => {
            info!(chat_id = chat_id.0, %username, command = %command_label(text), "replied");
        }
        Outcome::Cancelled => {
            info!(chat_id = chat_id.0, %username, "dropped reply for cancelled message");
        }
        Outcome::Ignored => {
            debug!(chat_id = chat_id.0, %username, "message not addressed to us");
        }
        Outcome::Failed => {
            warn!(
                chat_id = chat_id.0,
                %username,
                message_id = msg.id.0,
                command = %command_label(text),
                "apologized for failed update"
            );
        }
    }
}

/// First word of the message, for logs. Never the arguments.
fn command_label(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}
