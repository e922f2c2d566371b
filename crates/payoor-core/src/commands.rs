//! Command table and argument validation.
//!
//! Every supported command is listed once in [`COMMANDS`]; routing, the
//! `/help` text and the Telegram command menu are all derived from it.

use crate::{
    formatting::escape_html,
    model::types::PromptPair,
    prompts::{self, MealPlanRequest, PromptError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Help,
    Recipe,
    MealPlan,
    Ask,
    NutritionalValue,
}

/// One row of the command table.
#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    /// Argument synopsis shown in `/help`.
    pub synopsis: &'static str,
    pub description: &'static str,
    /// Reply sent when the arguments are missing.
    pub usage: Option<&'static str>,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Start,
        name: "start",
        synopsis: "",
        description: "Show the welcome message",
        usage: None,
    },
    CommandSpec {
        kind: CommandKind::Help,
        name: "help",
        synopsis: "",
        description: "See available commands",
        usage: None,
    },
    CommandSpec {
        kind: CommandKind::Recipe,
        name: "recipe",
        synopsis: "[meal_name]",
        description: "Get a detailed Nigerian recipe",
        usage: Some("Please specify a meal. Example: /recipe Jollof Rice"),
    },
    CommandSpec {
        kind: CommandKind::MealPlan,
        name: "mealplan",
        synopsis: "[region] [calories] [allergies] [days] [prioritized_class (optional)] [budget (optional)]",
        description: "Get a Nigerian meal plan",
        usage: Some("Usage: /mealplan [region] [calories] [allergies] [days] [prioritized_class (optional)] [budget (optional)]"),
    },
    CommandSpec {
        kind: CommandKind::Ask,
        name: "ask",
        synopsis: "[question]",
        description: "Get answers to cooking-related questions",
        usage: Some("Please ask a cooking-related question. Example: /ask How do I make puff puff?"),
    },
    CommandSpec {
        kind: CommandKind::NutritionalValue,
        name: "nutritional_value",
        synopsis: "[meal_name]",
        description: "Get the nutritional breakdown of a Nigerian meal",
        usage: Some("Please specify a food item. Example: /nutritional_value Jollof Rice"),
    },
];

impl CommandKind {
    pub fn spec(self) -> &'static CommandSpec {
        COMMANDS
            .iter()
            .find(|c| c.kind == self)
            .unwrap_or(&COMMANDS[0])
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// A parsed `/command arg1 arg2 ...` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Lowercased command name without `/` or `@botname`.
    pub name: String,
    /// Bot named by a `/cmd@botname` suffix, if any.
    pub addressee: Option<String>,
    pub args: Vec<String>,
}

impl Invocation {
    /// Arguments joined back with single spaces (meal names, questions).
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }

    /// Whether this command is meant for the bot called `bot_username`.
    ///
    /// Unaddressed commands are for every bot. An addressed command is only
    /// accepted when our own username is unknown or matches (ignoring case).
    pub fn is_for(&self, bot_username: Option<&str>) -> bool {
        match (&self.addressee, bot_username) {
            (None, _) | (Some(_), None) => true,
            (Some(to), Some(me)) => to.eq_ignore_ascii_case(me.trim_start_matches('@')),
        }
    }
}

/// Parse a command message. Returns `None` for text that is not a command.
///
/// Telegram may send `/cmd@botname arg1 ...`.
pub fn parse_command(text: &str) -> Option<Invocation> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let first = parts.next().unwrap_or("");
    let (name, addressee) = match first.split_once('@') {
        Some((name, to)) => (name, Some(to).filter(|to| !to.is_empty())),
        None => (first, None),
    };
    if name.is_empty() {
        return None;
    }

    Some(Invocation {
        name: name.to_lowercase(),
        addressee: addressee.map(str::to_string),
        args: parts.map(|s| s.to_string()).collect(),
    })
}

/// How the completion text is wrapped before it is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Framing {
    Verbatim,
    MealPlan { days: u32 },
}

impl Framing {
    pub fn apply(&self, text: String) -> String {
        match self {
            Framing::Verbatim => text,
            Framing::MealPlan { days } => {
                format!("Your {days}-day Nigerian meal plan:\n\n{text}")
            }
        }
    }
}

/// Outgoing reply body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Html(String),
}

/// A validated completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionJob {
    pub command: CommandKind,
    pub prompt: PromptPair,
    pub framing: Framing,
}

/// What to do with an invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Reply immediately; no network call.
    Reply(Reply),
    Complete(CompletionJob),
}

/// Per-request fault. Never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("/{command}: {source}")]
    InvalidArgument {
        command: &'static str,
        #[source]
        source: PromptError,
    },

    #[error("reply failed: {0}")]
    Reply(#[from] crate::Error),
}

/// Validate an invocation and decide between an immediate reply and a completion call.
pub fn plan(inv: &Invocation) -> Result<Plan, DispatchError> {
    let Some(spec) = lookup(&inv.name) else {
        return Ok(Plan::Reply(Reply::Text(format!(
            "Unknown command: /{}. Use /help to see available commands.",
            inv.name
        ))));
    };

    let usage = || Plan::Reply(Reply::Text(spec.usage.unwrap_or_default().to_string()));
    let job = |prompt: PromptPair, framing: Framing| {
        Plan::Complete(CompletionJob {
            command: spec.kind,
            prompt,
            framing,
        })
    };

    let plan = match spec.kind {
        CommandKind::Start | CommandKind::Help => Plan::Reply(Reply::Html(help_html())),
        CommandKind::Recipe | CommandKind::Ask | CommandKind::NutritionalValue
            if inv.args.is_empty() =>
        {
            usage()
        }
        CommandKind::Recipe => job(prompts::recipe(&inv.joined_args()), Framing::Verbatim),
        CommandKind::Ask => job(prompts::ask(&inv.joined_args()), Framing::Verbatim),
        CommandKind::NutritionalValue => job(
            prompts::nutritional_value(&inv.joined_args()),
            Framing::Verbatim,
        ),
        CommandKind::MealPlan => match MealPlanRequest::from_args(&inv.args) {
            Ok(req) => job(
                prompts::meal_plan(&req),
                Framing::MealPlan { days: req.days },
            ),
            Err(PromptError::NotEnoughArguments { .. }) => usage(),
            Err(source) => {
                return Err(DispatchError::InvalidArgument {
                    command: spec.name,
                    source,
                })
            }
        },
    };
    Ok(plan)
}

/// Welcome/help text (Telegram HTML).
pub fn help_html() -> String {
    let mut lines = vec![
        "Hello! 🇳🇬🍲 Welcome to the Payoor bot. Here's what I can do:".to_string(),
        String::new(),
    ];

    let listed = COMMANDS
        .iter()
        .filter(|c| !matches!(c.kind, CommandKind::Start | CommandKind::Help));
    let help = CommandKind::Help.spec();
    for (idx, c) in listed.chain(std::iter::once(help)).enumerate() {
        let head = if c.synopsis.is_empty() {
            format!("/{}", c.name)
        } else {
            format!("/{} {}", c.name, escape_html(c.synopsis))
        };
        lines.push(format!("{}. <b>{head}</b> - {}", idx + 1, c.description));
    }

    lines.join("\n")
}
