//! CLI tests module
//!
//! Tests for argument parsing, the `N:...` page parsers and error-to-exit-code
//! reporting.

use super::run::report_error;
use super::*;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::{DeckflowError, ExitCode, ServiceError, WorkflowError};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("deckflow").chain(args.iter().copied())).unwrap()
}

fn run_args(args: &[&str]) -> RunArgs {
    let mut full = vec!["run"];
    full.extend_from_slice(args);
    match parse(&full).command {
        Commands::Run(args) => args,
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn test_page_text_is_one_based() {
    let parsed = parse_page_text("3:Regional growth").unwrap();
    assert_eq!(
        parsed,
        PageText {
            index: 2,
            text: "Regional growth".to_string()
        }
    );
}

#[test]
fn test_page_text_keeps_colons_in_text() {
    let parsed = parse_page_text("1:Agenda: part one").unwrap();
    assert_eq!(parsed.index, 0);
    assert_eq!(parsed.text, "Agenda: part one");
}

#[test]
fn test_page_text_rejects_page_zero_and_garbage() {
    assert!(parse_page_text("0:Title").unwrap_err().contains("start at 1"));
    assert!(parse_page_text("two:Title").is_err());
    assert!(parse_page_text("no separator").is_err());
}

#[test]
fn test_page_file_with_and_without_description() {
    let with = parse_page_file("4:sales.xlsx:Q4 by region").unwrap();
    assert_eq!(with.index, 3);
    assert_eq!(with.path, PathBuf::from("sales.xlsx"));
    assert_eq!(with.description, "Q4 by region");

    let without = parse_page_file("1:chart.png").unwrap();
    assert_eq!(without.index, 0);
    assert_eq!(without.description, "");

    assert!(parse_page_file("2:").is_err());
}

#[test]
fn test_run_collects_repeatable_flags_in_order() {
    let args = run_args(&[
        "--input",
        "notes.md",
        "--pages",
        "5",
        "--outline-feedback",
        "add a risks page",
        "--outline-feedback",
        "shorter titles",
        "--edit-title",
        "3:Regional growth",
        "--regenerate",
        "2:use a bar chart",
        "--json",
    ]);

    assert_eq!(args.input, Some(PathBuf::from("notes.md")));
    assert_eq!(args.pages, Some(5));
    assert_eq!(args.outline_feedback, vec!["add a risks page", "shorter titles"]);
    assert_eq!(args.edit_titles[0].index, 2);
    assert_eq!(args.regenerate[0].index, 1);
    assert_eq!(args.regenerate[0].text, "use a bar chart");
    assert!(args.json);
}

#[test]
fn test_speakers_requires_audio() {
    let err = Cli::try_parse_from(["deckflow", "run", "--speakers", "2"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

    let args = run_args(&["--audio", "meeting.m4a", "--speakers", "2"]);
    assert_eq!(args.speakers, Some(2));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["config", "--json", "--profile", "production", "-v"]);
    assert_eq!(cli.profile.as_deref(), Some("production"));
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Config { json: true }));
}

#[test]
fn test_session_takes_positional_id() {
    let cli = parse(&["session", "session_1700000000000_abc123def"]);
    match cli.command {
        Commands::Session { id, json } => {
            assert_eq!(id, "session_1700000000000_abc123def");
            assert!(!json);
        }
        other => panic!("expected session, got {other:?}"),
    }
}

#[test]
fn test_report_error_maps_typed_errors() {
    let empty = anyhow::Error::from(DeckflowError::from(WorkflowError::EmptyInput));
    let (report, code) = report_error(&empty);
    assert_eq!(code, ExitCode::VALIDATION);
    assert!(report.starts_with("Error: "));

    let rejected = anyhow::Error::from(DeckflowError::from(WorkflowError::Service(
        ServiceError::Rejected {
            operation: "generate outline".to_string(),
            message: "quota exceeded".to_string(),
        },
    )));
    assert_eq!(report_error(&rejected).1, ExitCode::SERVICE_REJECTED);

    let timeout = anyhow::Error::from(DeckflowError::from(ServiceError::Timeout {
        duration: Duration::from_secs(30),
    }));
    assert_eq!(report_error(&timeout).1, ExitCode::TIMEOUT);
}

#[test]
fn test_report_error_finds_typed_error_under_context() {
    let result: Result<(), DeckflowError> = Err(WorkflowError::EmptyFeedback.into());
    let err = result.context("while regenerating page 2").unwrap_err();
    assert_eq!(report_error(&err).1, ExitCode::VALIDATION);
}

#[test]
fn test_report_error_untyped_is_internal() {
    let err = anyhow::anyhow!("something odd").context("reading input");
    let (report, code) = report_error(&err);
    assert_eq!(code, ExitCode::INTERNAL);
    assert!(report.contains("something odd"));
}

mod prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_page_text_shifts_to_zero_based(page in 1usize..10_000, text in ".*") {
            let parsed = parse_page_text(&format!("{page}:{text}")).unwrap();
            prop_assert_eq!(parsed.index, page - 1);
            prop_assert_eq!(parsed.text, text);
        }

        #[test]
        fn prop_page_file_keeps_description_colons(
            page in 1usize..10_000,
            file in "[a-z]{1,8}\\.(png|xlsx)",
            description in "[a-zA-Z0-9 :]*",
        ) {
            let parsed = parse_page_file(&format!("{page}:{file}:{description}")).unwrap();
            prop_assert_eq!(parsed.index, page - 1);
            prop_assert_eq!(parsed.path, PathBuf::from(&file));
            prop_assert_eq!(parsed.description, description);
        }
    }
}
