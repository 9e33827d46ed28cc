// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{QuillError, Result};

use super::Settings;

/// Smallest accepted backoff base; the first retry then waits at least 2s.
pub const MIN_BASE_DELAY_MS: u64 = 1000;

impl Settings {
    /// Get the API key, checking env var first.
    pub fn get_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.provider.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    /// Get the prompt template, if one is set.
    pub fn get_prompt_template(&self) -> Option<String> {
        let template = self.prompt.template.trim();
        if template.is_empty() {
            None
        } else {
            Some(self.prompt.template.clone())
        }
    }

    /// Reject settings the generator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(QuillError::Config("provider.model must not be empty".into()));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(QuillError::Config(
                "provider.base_url must not be empty".into(),
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(QuillError::Config(
                "generation.max_tokens must be greater than zero".into(),
            ));
        }

        let resilience = &self.resilience;
        if resilience.base_delay_ms < MIN_BASE_DELAY_MS {
            return Err(QuillError::Config(format!(
                "resilience.base_delay_ms must be at least {}, got {}",
                MIN_BASE_DELAY_MS, resilience.base_delay_ms
            )));
        }
        if !(0.0..1.0).contains(&resilience.jitter) {
            return Err(QuillError::Config(format!(
                "resilience.jitter must be in [0, 1), got {}",
                resilience.jitter
            )));
        }
        if resilience.max_attempts == Some(0) {
            return Err(QuillError::Config(
                "resilience.max_attempts must be at least 1".into(),
            ));
        }
        if let Some(cap) = resilience.max_delay_ms {
            // First retry waits base * 2.
            if cap < resilience.base_delay_ms.saturating_mul(2) {
                return Err(QuillError::Config(format!(
                    "resilience.max_delay_ms ({}) is below the first retry delay ({})",
                    cap,
                    resilience.base_delay_ms.saturating_mul(2)
                )));
            }
        }

        Ok(())
    }
}
