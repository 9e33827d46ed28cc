// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use clap::Parser;
use quill::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_parse_no_command() {
    let cli = Cli::try_parse_from(vec!["quill"]).expect("Valid command parsing");
    assert!(cli.command.is_none());
    assert_eq!(cli.verbose, 0);
    assert!(cli.config.is_none());
}

#[test]
fn test_parse_generate_command() {
    let cli = Cli::try_parse_from(vec!["quill", "generate"]).expect("Valid command parsing");
    assert!(matches!(cli.command, Some(Commands::Generate(_))));
}

#[test]
fn test_parse_generate_with_paths() {
    let args = vec!["quill", "generate", "../api", "../web"];
    let cli = Cli::try_parse_from(args).expect("Valid command parsing");
    if let Some(Commands::Generate(generate_args)) = cli.command {
        assert_eq!(
            generate_args.paths,
            vec![PathBuf::from("../api"), PathBuf::from("../web")]
        );
        assert!(generate_args.writes_message_file());
    } else {
        panic!("Expected Generate command");
    }
}

#[test]
fn test_parse_no_write() {
    let cli = Cli::try_parse_from(vec!["quill", "generate", "--no-write"])
        .expect("Valid command parsing");
    assert!(!cli.generate_args().writes_message_file());
}

#[test]
fn test_parse_verbose_and_config() {
    let cli = Cli::try_parse_from(vec!["quill", "-vvv", "--config", "custom.json"])
        .expect("Valid command parsing");
    assert_eq!(cli.verbose, 3);
    assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
}

#[test]
fn test_unknown_flag_is_rejected() {
    assert!(Cli::try_parse_from(vec!["quill", "generate", "--force"]).is_err());
}
