// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Status lines on stderr

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use quill::error::QuillError;
use quill::generate::{Notice, NoticeLevel, RunObserver, RunOutcome};
use quill::vcs::{GitWorkspace, RepositoryHandle};

/// Prints run progress and outcomes with colour.
pub struct TerminalObserver {
    show_message_file: bool,
}

impl TerminalObserver {
    pub fn new(show_message_file: bool) -> Self {
        Self { show_message_file }
    }
}

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Error => Color::Red,
    }
}

pub fn print_notice(notice: &Notice) -> io::Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(level_color(notice.level)))?;
    write!(stderr, "{}", notice.message)?;
    stderr.execute(ResetColor)?;
    writeln!(stderr)?;
    Ok(())
}

fn print_dim(line: &str) -> io::Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(Color::DarkGrey))?;
    write!(stderr, "{}", line)?;
    stderr.execute(ResetColor)?;
    writeln!(stderr)?;
    Ok(())
}

impl RunObserver for TerminalObserver {
    fn on_run_started(&self, repo: &RepositoryHandle) {
        let _ = print_dim(&format!("Generating commit message for {}", repo));
    }

    fn on_rate_limited(&self, _repo: &RepositoryHandle, attempt: u32, delay: Duration) {
        let _ = print_dim(&format!(
            "Rate limited (attempt {}), retrying in {}s",
            attempt,
            delay.as_secs()
        ));
    }

    fn on_run_finished(&self, repo: &RepositoryHandle, outcome: &RunOutcome) {
        if matches!(outcome, RunOutcome::Succeeded { .. }) {
            // the streamed message has no trailing newline
            println!();
        }
        let Some(notice) = outcome.notice() else {
            return;
        };
        let _ = print_notice(&notice);

        if self.show_message_file && matches!(outcome, RunOutcome::Succeeded { .. }) {
            if let Ok(path) = GitWorkspace::message_file(repo) {
                let _ = print_dim(&format!("Saved to {} (git commit -F)", path.display()));
            }
        }
    }

    fn on_already_running(&self) {
        let _ = print_notice(&Notice::info("Commit message generation already in progress"));
    }

    fn on_discovery_failed(&self, error: &QuillError) {
        let _ = print_notice(&Notice::error(error.to_string()));
    }
}
