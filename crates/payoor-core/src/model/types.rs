/// A role + prompt pair for a single completion call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPair {
    /// Persona/behavior instruction, sent as the system message.
    pub system_role: String,
    /// User-facing request, sent as the user message.
    pub user_prompt: String,
}

impl PromptPair {
    pub fn new(system_role: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_role: system_role.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Why a completion call produced no text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("response contained no completion text")]
    Empty,
}

pub type Completion = std::result::Result<String, CompletionError>;

/// Prefix of every reply produced from a failed completion.
pub const COMPLETION_ERROR_PREFIX: &str = "Error generating response:";

/// Render a completion as chat reply text.
///
/// Success text is returned verbatim; failures become
/// `Error generating response: <details>` so a reply is always sent.
pub fn render_completion(completion: Completion) -> String {
    match completion {
        Ok(text) => text,
        Err(e) => format!("{COMPLETION_ERROR_PREFIX} {e}"),
    }
}
