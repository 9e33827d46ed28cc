// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Quill
//!
//! Handles loading and saving settings from ~/.quill/settings.json

use serde::{Deserialize, Serialize};

use crate::llm::client::OPENAI_API_URL;

mod io;
mod validation;

/// Main settings structure, stored in ~/.quill/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Chat endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Prompt sent ahead of the diff
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Admission and message shaping
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retry settings for rate-limited requests
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// OpenAI-compatible endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// API key (if stored directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat-completions URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature (endpoint default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: None,
        }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    /// Instruction text placed before the diff
    #[serde(default = "default_prompt_template")]
    pub template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: default_prompt_template(),
        }
    }
}

/// Generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Largest diff (in estimated tokens) that will be sent
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Start the message with "Auto-generated commit (<branch>)"
    #[serde(default)]
    pub branch_header: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            branch_header: false,
        }
    }
}

/// Retry configuration for rate-limited requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResilienceConfig {
    /// Base delay in milliseconds; attempt `n` waits `base * 2^n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on a single delay (none = uncapped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    /// Give up after this many attempts (none = retry until cancelled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Extra random delay as a fraction of each computed delay, in [0, 1)
    #[serde(default)]
    pub jitter: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: None,
            max_attempts: None,
            jitter: 0.0,
        }
    }
}

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Write a git commit message for the staged changes below. \
Start with a summary line of at most 72 characters, then a blank line, then a short bulleted \
list of the notable changes. Reply with the commit message only.";

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_base_url() -> String {
    OPENAI_API_URL.to_string()
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_base_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.base_url, OPENAI_API_URL);
    }

    #[test]
    fn test_generation_config_default() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_tokens, 4096);
        assert!(!config.branch_header);
    }

    #[test]
    fn test_resilience_config_default_is_unbounded() {
        let config = ResilienceConfig::default();
        assert_eq!(config.base_delay_ms, 1000);
        assert!(config.max_delay_ms.is_none());
        assert!(config.max_attempts.is_none());
        assert_eq!(config.jitter, 0.0);
    }

    #[test]
    fn test_deserialize_empty_object_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let settings: Settings =
            serde_json::from_str(r#"{"provider": {"model": "gpt-4o-mini"}}"#).unwrap();
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert_eq!(settings.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(settings.prompt.template, DEFAULT_PROMPT_TEMPLATE);
    }

    #[test]
    fn test_serialize_skips_unset_optionals() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json["provider"].get("api_key").is_none());
        assert!(json["resilience"].get("max_attempts").is_none());
    }
}
