// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use quill::config::Settings;
use quill::error::QuillError;
use quill::generate::{GenerationOptions, RetryConfig};
use tempfile::TempDir;

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.provider.model, "gpt-3.5-turbo");
    assert_eq!(settings.provider.api_key_env, "OPENAI_API_KEY");
    assert!(settings.provider.api_key.is_none());
    assert_eq!(settings.generation.max_tokens, 4096);
    assert!(!settings.generation.branch_header);
    assert_eq!(settings.resilience.base_delay_ms, 1000);
    assert!(settings.resilience.max_attempts.is_none());
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_api_key_priority() {
    let mut settings = Settings::default();
    settings.provider.api_key_env = "QUILL_TEST_API_KEY_12345".to_string();
    settings.provider.api_key = Some("config-key".to_string());

    std::env::remove_var("QUILL_TEST_API_KEY_12345");
    assert_eq!(settings.get_api_key(), Some("config-key".to_string()));

    std::env::set_var("QUILL_TEST_API_KEY_12345", "env-key");
    assert_eq!(settings.get_api_key(), Some("env-key".to_string()));

    std::env::remove_var("QUILL_TEST_API_KEY_12345");
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"provider": {"model": "gpt-4o-mini"}, "resilience": {"max_attempts": 5}}"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.provider.model, "gpt-4o-mini");
    assert_eq!(settings.provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(settings.resilience.max_attempts, Some(5));
    assert_eq!(settings.generation.max_tokens, 4096);
}

#[test]
fn test_save_round_trip_keeps_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"editor": {"theme": "dark"}}"#).unwrap();

    let mut settings = Settings::default();
    settings.generation.branch_header = true;
    settings.save_to(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["editor"]["theme"], "dark");
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}

#[test]
fn test_invalid_file_is_json_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Settings::load_from(&path),
        Err(QuillError::Json(_))
    ));
}

#[test]
fn test_validate_rejects_bad_resilience() {
    let mut settings = Settings::default();
    settings.resilience.jitter = 1.0;
    assert!(matches!(settings.validate(), Err(QuillError::Config(_))));

    let mut settings = Settings::default();
    settings.resilience.max_delay_ms = Some(1500);
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.generation.max_tokens = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_generation_options_follow_settings() {
    let mut settings = Settings::default();
    settings.resilience.base_delay_ms = 250;
    settings.resilience.max_delay_ms = Some(1000);

    let options = GenerationOptions::from(&settings);
    assert_eq!(options.max_tokens, 4096);
    assert_eq!(
        options.retry,
        RetryConfig {
            base_delay_ms: 250,
            max_delay_ms: Some(1000),
            max_attempts: None,
            jitter: 0.0,
        }
    );
}
