// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration module for Quill
//!
//! Handles loading, saving, and prompting for user settings.

pub mod settings;
pub mod source;

pub use settings::*;
pub use source::{ConfigSource, Credentials, Prompter, SettingsSource, StaticConfigSource, StdinPrompter};
