//! Core domain + application logic for the Payoor bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and OpenAI live
//! behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod prompts;

pub use errors::{Error, Result};
