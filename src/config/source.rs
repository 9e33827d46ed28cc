// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration collaborator
//!
//! Supplies the API key and prompt template to a run, asking the operator
//! when either is missing and remembering the answer in the settings file.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{QuillError, Result};

use super::Settings;

/// Credentials for the chat endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Where a run gets its credentials and prompt from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// API key, possibly after asking the operator.
    async fn credentials(&self) -> Result<Credentials>;

    /// Prompt template, possibly after asking the operator.
    async fn prompt_template(&self) -> Result<String>;
}

/// Asks the operator for a missing value.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// `None` means the operator declined.
    async fn ask(&self, question: &str) -> Result<Option<String>>;
}

/// Prompts on stderr and reads one line from stdin.
///
/// Cancelling the token abandons the read, which counts as declining.
#[derive(Debug, Default)]
pub struct StdinPrompter {
    cancel: CancellationToken,
}

impl StdinPrompter {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&self, question: &str) -> Result<Option<String>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let mut stderr = tokio::io::stderr();
        stderr.write_all(question.as_bytes()).await?;
        stderr.flush().await?;

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        let read = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                stderr.write_all(b"\n").await?;
                return Ok(None);
            }
            read = stdin.read_line(&mut line) => read?,
        };
        if read == 0 {
            return Ok(None);
        }

        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}

/// Settings-backed source that asks for, and persists, missing values.
pub struct SettingsSource {
    settings: Mutex<Settings>,
    path: PathBuf,
    prompter: Box<dyn Prompter>,
}

impl SettingsSource {
    pub fn new(settings: Settings, path: impl Into<PathBuf>, prompter: Box<dyn Prompter>) -> Self {
        Self {
            settings: Mutex::new(settings),
            path: path.into(),
            prompter,
        }
    }

    /// Current settings, including anything entered at a prompt.
    pub async fn settings(&self) -> Settings {
        self.settings.lock().await.clone()
    }

    fn persist(&self, settings: &Settings) {
        if let Err(e) = settings.save_to(&self.path) {
            tracing::warn!(
                target: "quill.config",
                path = %self.path.display(),
                error = %e,
                "could not save settings"
            );
        }
    }
}

#[async_trait]
impl ConfigSource for SettingsSource {
    async fn credentials(&self) -> Result<Credentials> {
        let mut settings = self.settings.lock().await;
        if let Some(key) = settings.get_api_key() {
            return Ok(Credentials::new(key));
        }

        let question = format!(
            "Enter your OpenAI API key (or set {}): ",
            settings.provider.api_key_env
        );
        match self.prompter.ask(&question).await? {
            Some(key) => {
                settings.provider.api_key = Some(key.clone());
                self.persist(&settings);
                Ok(Credentials::new(key))
            }
            None => Err(QuillError::MissingCredentials(
                "no API key provided".to_string(),
            )),
        }
    }

    async fn prompt_template(&self) -> Result<String> {
        let mut settings = self.settings.lock().await;
        if let Some(template) = settings.get_prompt_template() {
            return Ok(template);
        }

        match self
            .prompter
            .ask("Enter the prompt to send ahead of the diff: ")
            .await?
        {
            Some(template) => {
                settings.prompt.template = template.clone();
                self.persist(&settings);
                Ok(template)
            }
            None => Err(QuillError::MissingCredentials(
                "no prompt template provided".to_string(),
            )),
        }
    }
}

/// Fixed values, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    api_key: Option<String>,
    template: Option<String>,
}

impl StaticConfigSource {
    pub fn new(api_key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            template: Some(template.into()),
        }
    }

    /// A source with no API key.
    pub fn without_key(template: impl Into<String>) -> Self {
        Self {
            api_key: None,
            template: Some(template.into()),
        }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn credentials(&self) -> Result<Credentials> {
        self.api_key
            .clone()
            .map(Credentials::new)
            .ok_or_else(|| QuillError::MissingCredentials("no API key configured".to_string()))
    }

    async fn prompt_template(&self) -> Result<String> {
        self.template.clone().ok_or_else(|| {
            QuillError::MissingCredentials("no prompt template configured".to_string())
        })
    }
}
