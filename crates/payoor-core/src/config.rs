use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Typed configuration, loaded once at process start and shared read-only.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub bot_token: String,
    pub openai_api_key: String,

    // Completion service
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_timeout: Duration,

    // Telegram limits
    pub telegram_safe_limit: usize,
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing or blank credentials fail fast.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("BOT_TOKEN").and_then(non_empty);
        let openai_api_key = lookup("OPENAI_API_KEY").and_then(non_empty);

        let (Some(bot_token), Some(openai_api_key)) = (bot_token, openai_api_key) else {
            return Err(Error::Config(
                "Missing BOT_TOKEN or OPENAI_API_KEY. Please check your .env file.".to_string(),
            ));
        };

        let openai_model = lookup("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let openai_base_url = lookup("OPENAI_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let openai_timeout = Duration::from_secs(
            parse_u64(lookup("OPENAI_TIMEOUT_SECS"))
                .filter(|s| *s > 0)
                .unwrap_or(60),
        );

        // Telegram hard limit is 4096; leave headroom.
        let telegram_safe_limit = parse_usize(lookup("TELEGRAM_SAFE_LIMIT"))
            .unwrap_or(4000)
            .clamp(200, 4096);

        Ok(Self {
            bot_token: bot_token.trim().to_string(),
            openai_api_key: openai_api_key.trim().to_string(),
            openai_model,
            openai_base_url,
            openai_timeout,
            telegram_safe_limit,
        })
    }
}

/// Export `./.env` into the process environment without overriding existing
/// variables. Call before logging init so `RUST_LOG` from the file applies.
pub fn load_dotenv() {
    load_dotenv_if_present(Path::new(".env"));
}

pub fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_usize(v: Option<String>) -> Option<usize> {
    v.and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
