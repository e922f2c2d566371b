//! Per-message command dispatch: validate, call the completion service, reply.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    commands::{parse_command, plan, CompletionJob, DispatchError, Invocation, Plan, Reply},
    domain::{ChatId, ChatKind},
    formatting::split_text_chunks,
    messaging::{port::MessagingPort, types::ChatAction},
    model::{client::CompletionClient, types::render_completion},
};

/// Telegram clears the typing indicator after ~5s.
const TYPING_INTERVAL: Duration = Duration::from_secs(4);

/// Generic reply for faults that escape a handler.
pub const APOLOGY: &str = "Oops, something went wrong. Please try again.";

/// Reply for plain (non-command) text in a private chat.
pub const NOT_A_COMMAND: &str = "I only understand commands. Send /help to see what I can do.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    /// The message's cancellation token fired before the reply was sent.
    Cancelled,
    /// Not for us: another bot's command, or group chatter.
    Ignored,
    /// The handler faulted; the apology was attempted.
    Failed,
}

/// Stateless command handler shared by every inbound message.
pub struct Dispatcher {
    client: Arc<dyn CompletionClient>,
    messenger: Arc<dyn MessagingPort>,
    reply_limit: usize,
    bot_username: Option<String>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        messenger: Arc<dyn MessagingPort>,
        reply_limit: usize,
    ) -> Self {
        Self {
            client,
            messenger,
            reply_limit,
            bot_username: None,
        }
    }

    /// Our own username; `/cmd@other_bot` is ignored once this is set.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.bot_username = Some(username).filter(|u| !u.is_empty());
        self
    }

    /// Handle one inbound message, apologizing if the handler faults.
    pub async fn handle_update(
        &self,
        chat_id: ChatId,
        kind: ChatKind,
        text: &str,
        cancel: &CancellationToken,
    ) -> Outcome {
        match self.handle_text(chat_id, kind, text, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_fault(chat_id, &e).await;
                Outcome::Failed
            }
        }
    }

    /// Log a per-request fault and send the generic apology.
    pub async fn report_fault(&self, chat_id: ChatId, fault: &DispatchError) {
        error!(chat_id = chat_id.0, error = %fault, "update caused error");
        if let Err(e) = self.messenger.send_text(chat_id, APOLOGY).await {
            error!(chat_id = chat_id.0, error = %e, "failed to send apology");
        }
    }

    /// Handle one inbound text message end to end.
    pub async fn handle_text(
        &self,
        chat_id: ChatId,
        kind: ChatKind,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome, DispatchError> {
        match parse_command(text) {
            Some(inv) if inv.is_for(self.bot_username.as_deref()) => {
                self.handle_command(chat_id, &inv, cancel).await
            }
            Some(inv) => {
                debug!(command = %inv.name, chat_id = chat_id.0, "command for another bot");
                Ok(Outcome::Ignored)
            }
            None if kind == ChatKind::Private => {
                self.send(chat_id, Reply::Text(NOT_A_COMMAND.to_string()))
                    .await?;
                Ok(Outcome::Replied)
            }
            None => Ok(Outcome::Ignored),
        }
    }

    pub async fn handle_command(
        &self,
        chat_id: ChatId,
        inv: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<Outcome, DispatchError> {
        match plan(inv)? {
            Plan::Reply(reply) => {
                debug!(command = %inv.name, chat_id = chat_id.0, "immediate reply");
                self.send(chat_id, reply).await?;
                Ok(Outcome::Replied)
            }
            Plan::Complete(job) => {
                let Some(text) = self.run_job(chat_id, &job, cancel).await else {
                    info!(command = job.command.name(), chat_id = chat_id.0, "cancelled");
                    return Ok(Outcome::Cancelled);
                };
                self.send(chat_id, Reply::Text(text)).await?;
                Ok(Outcome::Replied)
            }
        }
    }

    /// Run the completion for `job`, keeping the typing indicator alive.
    ///
    /// Returns `None` if `cancel` fires first.
    async fn run_job(
        &self,
        chat_id: ChatId,
        job: &CompletionJob,
        cancel: &CancellationToken,
    ) -> Option<String> {
        info!(
            command = job.command.name(),
            chat_id = chat_id.0,
            backend = %self.client.describe(),
            prompt_len = job.prompt.user_prompt.len(),
            "requesting completion"
        );

        let completion = self.client.complete(&job.prompt);
        tokio::pin!(completion);

        let typing_enabled = self.messenger.capabilities().supports_chat_actions;
        if typing_enabled {
            self.send_typing(chat_id).await;
        }
        let mut typing = tokio::time::interval_at(
            tokio::time::Instant::now() + TYPING_INTERVAL,
            TYPING_INTERVAL,
        );

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                res = &mut completion => break res,
                _ = typing.tick(), if typing_enabled => self.send_typing(chat_id).await,
            }
        };

        if let Err(e) = &result {
            warn!(command = job.command.name(), chat_id = chat_id.0, error = %e, "completion failed");
        }
        if cancel.is_cancelled() {
            return None;
        }

        Some(job.framing.apply(render_completion(result)))
    }

    async fn send_typing(&self, chat_id: ChatId) {
        if let Err(e) = self
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
        {
            debug!(chat_id = chat_id.0, error = %e, "typing indicator failed");
        }
    }

    async fn send(&self, chat_id: ChatId, reply: Reply) -> crate::Result<()> {
        match reply {
            Reply::Html(html) if self.messenger.capabilities().supports_html => {
                self.messenger.send_html(chat_id, &html).await?;
            }
            Reply::Html(html) => {
                self.messenger.send_text(chat_id, &html).await?;
            }
            Reply::Text(text) => {
                let limit = self
                    .reply_limit
                    .min(self.messenger.capabilities().max_message_len);
                for chunk in split_text_chunks(&text, limit) {
                    self.messenger.send_text(chat_id, &chunk).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        messaging::types::MessagingCapabilities,
        model::types::{Completion, CompletionError, PromptPair},
    };

    enum Behavior {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct FakeClient {
        behavior: Behavior,
        calls: AtomicUsize,
        prompts: Mutex<Vec<PromptPair>>,
    }

    impl FakeClient {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for FakeClient {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn complete(&self, prompt: &PromptPair) -> Completion {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.clone());
            match self.behavior {
                Behavior::Answer(text) => Ok(text.to_string()),
                Behavior::Fail => Err(CompletionError::Transport(
                    "connection refused".to_string(),
                )),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Sent {
        Text(String),
        Html(String),
        Typing,
    }

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<Sent>>,
    }

    impl FakeMessenger {
        fn replies(&self) -> Vec<Sent> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|s| **s != Sent::Typing)
                .cloned()
                .collect()
        }

        fn record(&self, chat_id: ChatId, s: Sent) -> crate::Result<MessageRef> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(s);
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sent.len() as i32),
            })
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_html: true,
                supports_chat_actions: true,
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> crate::Result<MessageRef> {
            self.record(chat_id, Sent::Text(text.to_string()))
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> crate::Result<MessageRef> {
            self.record(chat_id, Sent::Html(html.to_string()))
        }

        async fn send_chat_action(&self, chat_id: ChatId, _action: ChatAction) -> crate::Result<()> {
            self.record(chat_id, Sent::Typing).map(|_| ())
        }
    }

    fn setup(behavior: Behavior) -> (Dispatcher, Arc<FakeClient>, Arc<FakeMessenger>) {
        let client = FakeClient::new(behavior);
        let messenger = Arc::new(FakeMessenger::default());
        let dispatcher = Dispatcher::new(client.clone(), messenger.clone(), 4000);
        (dispatcher, client, messenger)
    }

    const CHAT: ChatId = ChatId(42);

    #[tokio::test]
    async fn recipe_without_arguments_replies_usage_without_network() {
        let (d, client, messenger) = setup(Behavior::Answer("unused"));
        let out = d
            .handle_text(CHAT, ChatKind::Private, "/recipe", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, Outcome::Replied);
        assert_eq!(client.calls(), 0);
        assert_eq!(
            messenger.replies(),
            vec![Sent::Text(
                "Please specify a meal. Example: /recipe Jollof Rice".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn recipe_relays_completion_verbatim() {
        let (d, client, messenger) = setup(Behavior::Answer("Wash the rice..."));
        d.handle_text(CHAT, ChatKind::Private, "/recipe Jollof Rice", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(client.calls(), 1);
        let prompts = client.prompts.lock().unwrap().clone();
        assert!(prompts[0].user_prompt.contains("recipe for Jollof Rice"));
        assert_eq!(
            messenger.replies(),
            vec![Sent::Text("Wash the rice...".to_string())]
        );
    }

    #[tokio::test]
    async fn meal_plan_reply_is_framed() {
        let (d, client, messenger) = setup(Behavior::Answer("Day 1: Akara"));
        d.handle_text(CHAT, ChatKind::Private, "/mealplan Lagos 2000 none 7", &CancellationToken::new())
            .await
            .unwrap();

        let prompts = client.prompts.lock().unwrap().clone();
        assert!(prompts[0]
            .user_prompt
            .starts_with("Create a 7-day meal plan with 2000 calories per day for someone in Lagos."));
        assert!(prompts[0].user_prompt.contains("Avoid foods containing none."));
        assert_eq!(
            messenger.replies(),
            vec![Sent::Text(
                "Your 7-day Nigerian meal plan:\n\nDay 1: Akara".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn service_failure_is_reported_as_text() {
        let (d, _client, messenger) = setup(Behavior::Fail);
        let out = d
            .handle_text(CHAT, ChatKind::Private, "/ask What is ogbono?", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, Outcome::Replied);
        let replies = messenger.replies();
        assert_eq!(replies.len(), 1);
        let Sent::Text(text) = &replies[0] else {
            panic!("expected text reply");
        };
        assert!(text.starts_with("Error generating response:"));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn invalid_number_is_a_dispatch_error_without_network() {
        let (d, client, messenger) = setup(Behavior::Answer("unused"));
        let err = d
            .handle_text(CHAT, ChatKind::Private, "/mealplan Lagos lots none 7", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidArgument { .. }));
        assert_eq!(client.calls(), 0);
        assert!(messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn cancelled_message_sends_nothing() {
        let (d, _client, messenger) = setup(Behavior::Hang);
        let cancel = CancellationToken::new();
        let child = cancel.child_token();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let out = d
            .handle_text(CHAT, ChatKind::Private, "/nutritional_value Moi Moi", &child)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert_eq!(out, Outcome::Cancelled);
        assert!(messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn typing_indicator_precedes_reply() {
        let (d, _client, messenger) = setup(Behavior::Answer("ok"));
        d.handle_text(CHAT, ChatKind::Private, "/ask hi", &CancellationToken::new())
            .await
            .unwrap();

        let sent = messenger.sent.lock().unwrap().clone();
        assert_eq!(sent.last(), Some(&Sent::Text("ok".to_string())));
        assert_eq!(sent.first(), Some(&Sent::Typing));
    }

    #[tokio::test]
    async fn long_replies_are_split() {
        let long: &'static str = Box::leak("word ".repeat(2000).into_boxed_str());
        let (d, _client, messenger) = setup(Behavior::Answer(long));
        d.handle_text(CHAT, ChatKind::Private, "/ask long please", &CancellationToken::new())
            .await
            .unwrap();

        let replies = messenger.replies();
        assert!(replies.len() >= 3);
        let joined: String = replies
            .iter()
            .map(|s| match s {
                Sent::Text(t) => t.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(joined, long);
    }

    #[tokio::test]
    async fn help_and_plain_text() {
        let (d, client, messenger) = setup(Behavior::Answer("unused"));
        let token = CancellationToken::new();
        d.handle_text(CHAT, ChatKind::Private, "/help", &token).await.unwrap();
        d.handle_text(CHAT, ChatKind::Private, "hello there", &token).await.unwrap();

        assert_eq!(client.calls(), 0);
        let replies = messenger.replies();
        assert!(matches!(&replies[0], Sent::Html(h) if h.contains("/mealplan")));
        assert_eq!(replies[1], Sent::Text(NOT_A_COMMAND.to_string()));
    }

    #[tokio::test]
    async fn handler_fault_sends_the_apology() {
        let (d, client, messenger) = setup(Behavior::Answer("unused"));
        let out = d
            .handle_update(
                CHAT,
                ChatKind::Private,
                "/mealplan Lagos lots none 7",
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(out, Outcome::Failed);
        assert_eq!(client.calls(), 0);
        assert_eq!(
            messenger.replies(),
            vec![Sent::Text(
                "Oops, something went wrong. Please try again.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn commands_for_other_bots_are_ignored() {
        let (d, client, messenger) = setup(Behavior::Answer("Boil the rice"));
        let d = d.with_bot_username("payoor_bot");
        let token = CancellationToken::new();

        let out = d
            .handle_update(CHAT, ChatKind::Group, "/recipe@some_other_bot Jollof", &token)
            .await;
        assert_eq!(out, Outcome::Ignored);
        assert_eq!(client.calls(), 0);
        assert!(messenger.sent.lock().unwrap().is_empty());

        let out = d
            .handle_update(CHAT, ChatKind::Group, "/recipe@payoor_bot Jollof", &token)
            .await;
        assert_eq!(out, Outcome::Replied);
        assert_eq!(client.calls(), 1);
        assert_eq!(
            messenger.replies(),
            vec![Sent::Text("Boil the rice".to_string())]
        );
    }

    #[tokio::test]
    async fn group_chatter_gets_no_hint() {
        let (d, client, messenger) = setup(Behavior::Answer("unused"));
        let out = d
            .handle_update(CHAT, ChatKind::Group, "who's cooking tonight?", &CancellationToken::new())
            .await;

        assert_eq!(out, Outcome::Ignored);
        assert_eq!(client.calls(), 0);
        assert!(messenger.sent.lock().unwrap().is_empty());
    }
}
