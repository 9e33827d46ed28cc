// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines the command-line arguments and subcommands for Quill.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Quill - commit messages streamed from your staged changes
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(version, about = "Generate commit messages from staged changes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a commit message for every repository (default when no command given)
    #[command(alias = "gen")]
    Generate(GenerateArgs),
}

/// Arguments for the generate command
#[derive(Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    /// Workspace roots to search for repositories (defaults to current directory)
    pub paths: Vec<PathBuf>,

    /// Keep the message in <gitdir>/QUILL_EDITMSG (default)
    #[arg(long, overrides_with = "no_write")]
    pub write: bool,

    /// Only print the message, do not write the message file
    #[arg(long = "no-write", overrides_with = "write")]
    pub no_write: bool,
}

impl GenerateArgs {
    /// Whether the message file should be written.
    pub fn writes_message_file(&self) -> bool {
        !self.no_write
    }

    /// Workspace roots, falling back to `cwd`.
    pub fn roots(&self, cwd: PathBuf) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![cwd]
        } else {
            self.paths.clone()
        }
    }
}

impl Cli {
    /// Generate arguments, treating a bare invocation as `generate`.
    pub fn generate_args(&self) -> GenerateArgs {
        match &self.command {
            Some(Commands::Generate(args)) => args.clone(),
            None => GenerateArgs::default(),
        }
    }
}
