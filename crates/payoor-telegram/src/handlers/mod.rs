//! Telegram update handlers.
//!
//! Each inbound message runs under its own cancellation token (a child of the
//! process shutdown token) and never returns an error to the dispatcher:
//! faults are logged here and answered with an apology.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        // Stickers, photos, voice, ... have nothing to dispatch.
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    commands::handle_text(&msg, text, state).await;
    Ok(())
}
