// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Quill - commit messages streamed from your staged changes
//!
//! Entry point for the Quill CLI application.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use quill::cli::Cli;
use quill::config::{Settings, SettingsSource, StdinPrompter};
use quill::error::Result;
use quill::generate::{GenerationOptions, RunCoordinator};
use quill::llm::OpenAiClient;
use quill::vcs::GitWorkspace;

#[path = "main/terminal.rs"]
mod terminal;

use terminal::TerminalObserver;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` turns on run diagnostics, `-vv` adds decoder and client detail.
    // `RUST_LOG` still takes precedence.
    let directives: &[&str] = match cli.verbose {
        0 => &[],
        1 => &["quill=info", "quill.run=debug", "quill.retry=debug"],
        _ => &["quill=debug", "quill.decoder=trace", "quill.client=trace"],
    };
    for directive in directives {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Load settings
    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_from(&settings_path)?;
    settings.validate()?;

    let args = cli.generate_args();
    let roots = args.roots(std::env::current_dir()?);
    let write_message_file = args.writes_message_file();

    let vcs = GitWorkspace::new(roots).with_message_file(write_message_file);
    let client = OpenAiClient::from_config(&settings.provider);
    let options = GenerationOptions::from(&settings);
    // Ctrl+C cancels the current run or prompt and skips the rest
    let cancel = CancellationToken::new();
    let config = SettingsSource::new(
        settings,
        settings_path,
        Box::new(StdinPrompter::new(cancel.clone())),
    );

    let coordinator = RunCoordinator::new(
        Arc::new(client),
        Arc::new(vcs),
        Arc::new(config),
        options,
    )
    .with_observer(Arc::new(TerminalObserver::new(write_message_file)));

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let interrupted = cancel.clone();
    let outcome = coordinator.generate(cancel).await;
    if outcome.has_failures() {
        std::process::exit(1);
    }
    if interrupted.is_cancelled() {
        // an abandoned stdin read would otherwise hold up runtime shutdown
        std::process::exit(0);
    }

    Ok(())
}
