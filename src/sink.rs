// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Commit-message sinks
//!
//! A sink is the destination a run writes the generated message into. The
//! run clears it once the request is in flight and then appends fragments in
//! decode order; it never reads the sink back.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{QuillError, Result};

/// Mutable commit-message target for one repository.
pub trait CommitMessageSink: Send {
    /// Drop any previous content.
    fn clear(&mut self) -> Result<()>;

    /// Append one fragment.
    fn append(&mut self, fragment: &str) -> Result<()>;
}

/// Shared in-memory message; clones see the same text.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    inner: Arc<Mutex<String>>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current message text.
    pub fn contents(&self) -> String {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl CommitMessageSink for MessageBuffer {
    fn clear(&mut self) -> Result<()> {
        self.inner.lock().map_err(poisoned)?.clear();
        Ok(())
    }

    fn append(&mut self, fragment: &str) -> Result<()> {
        self.inner.lock().map_err(poisoned)?.push_str(fragment);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> QuillError {
    QuillError::Sink("message buffer lock poisoned".to_string())
}

/// Echoes fragments to a writer as they arrive.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    header: Option<String>,
}

impl TerminalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, header: None }
    }

    /// Line printed on every clear, ahead of the streamed text.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> CommitMessageSink for TerminalSink<W> {
    fn clear(&mut self) -> Result<()> {
        if let Some(header) = &self.header {
            writeln!(self.out, "{}", header)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn append(&mut self, fragment: &str) -> Result<()> {
        write!(self.out, "{}", fragment)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps the message in a file, rewritten on clear and appended on each fragment.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommitMessageSink for FileSink {
    fn clear(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file = Some(file);
        Ok(())
    }

    fn append(&mut self, fragment: &str) -> Result<()> {
        if self.file.is_none() {
            self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(fragment.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }
}

/// Fans every operation out to several sinks, in order.
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Box<dyn CommitMessageSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl CommitMessageSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl CommitMessageSink for TeeSink {
    fn clear(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.clear()?;
        }
        Ok(())
    }

    fn append(&mut self, fragment: &str) -> Result<()> {
        for sink in &mut self.sinks {
            sink.append(fragment)?;
        }
        Ok(())
    }
}
