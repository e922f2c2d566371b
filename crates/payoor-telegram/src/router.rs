use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*,
    types::BotCommand,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use payoor_core::{
    commands::COMMANDS, config::Config, dispatch::Dispatcher as CommandDispatcher,
    messaging::port::MessagingPort, model::client::CompletionClient,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Read-only state shared by every update handler.
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandDispatcher>,
    /// Parent of every per-message cancellation token.
    pub shutdown: CancellationToken,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    client: Arc<dyn CompletionClient>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!(username = %me.username(), "bot started");
            Some(me.username().to_string())
        }
        Err(e) => {
            warn!(error = %e, "getMe failed; accepting commands addressed to any bot");
            None
        }
    };
    info!(backend = %client.describe(), "completion backend");

    // Best-effort: the bot still works without a command menu.
    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!(error = %e, "failed to register command menu");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let mut commands = CommandDispatcher::new(client, messenger, cfg.telegram_safe_limit);
    if let Some(username) = bot_username {
        commands = commands.with_bot_username(username);
    }
    let commands = Arc::new(commands);

    let state = Arc::new(AppState {
        commands,
        shutdown: shutdown.clone(),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = ?upd.id, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "an error has occurred in the dispatcher",
        ))
        .build();

    info!("polling...");
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            info!("shutdown signal received, stopping polling");
        }
        _ = dispatcher.dispatch() => {
            warn!("telegram dispatcher exited");
        }
    }

    Ok(())
}

fn bot_commands() -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .map(|c| BotCommand::new(c.name, c.description))
        .collect()
}
