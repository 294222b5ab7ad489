//! Interactive prompts.

use std::collections::VecDeque;
use std::sync::Mutex;

use dialoguer::{Confirm, Input};

use crate::error::{CliError, CliResult};

/// Asks the user for input.
pub trait Prompt: Send + Sync {
    /// Reads a line of text. An empty answer yields `default` when given.
    fn input(&self, message: &str, default: Option<&str>) -> CliResult<String>;

    /// Asks a yes/no question.
    fn confirm(&self, message: &str, default: bool) -> CliResult<bool>;
}

/// Prompts on the terminal via dialoguer.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn input(&self, message: &str, default: Option<&str>) -> CliResult<String> {
        let mut input = Input::<String>::new().with_prompt(message);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map(|s| s.trim().to_string())
            .map_err(|e| CliError::Prompt(e.to_string()))
    }

    fn confirm(&self, message: &str, default: bool) -> CliResult<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| CliError::Prompt(e.to_string()))
    }
}

/// Replays canned answers; used in tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next_answer(&self, message: &str) -> CliResult<Option<String>> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        let mut answers = self
            .answers
            .lock()
            .map_err(|_| CliError::Prompt("prompt state poisoned".to_string()))?;
        Ok(answers.pop_front())
    }
}

impl Prompt for ScriptedPrompt {
    fn input(&self, message: &str, default: Option<&str>) -> CliResult<String> {
        match self.next_answer(message)? {
            Some(answer) if !answer.trim().is_empty() => Ok(answer.trim().to_string()),
            _ => default
                .map(String::from)
                .ok_or_else(|| CliError::Prompt(format!("no answer for '{}'", message))),
        }
    }

    fn confirm(&self, message: &str, default: bool) -> CliResult<bool> {
        match self.next_answer(message)?.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(answer) => match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                other => Err(CliError::Prompt(format!("expected yes or no, got '{}'", other))),
            },
        }
    }
}
