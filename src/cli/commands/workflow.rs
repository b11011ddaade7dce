//! Run command implementation
//!
//! Handles `deckflow run`: drives one session from raw input to rendered
//! pages, applying the refinements, edits and regenerations given on the
//! command line in stage order.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use deckflow_client::HttpGenerationService;
use deckflow_config::Config;
use deckflow_orchestrator::{
    GeneratedPage, GenerationOptions, PipelineEvent, PipelineSummary, SessionOrchestrator,
    TranscriptEntry,
};
use deckflow_utils::error::DeckflowError;
use deckflow_utils::exit_codes::ExitCode;
use deckflow_utils::types::{ReferenceKind, Role};

use super::common::{load_upload, read_raw_input, read_text_file};
use crate::cli::args::RunArgs;

/// Final state of a run, as printed by `--json`.
#[derive(Debug, Serialize)]
struct RunReport {
    session_id: String,
    stage: String,
    succeeded: usize,
    total: usize,
    pages: Vec<PageReport>,
    download_url: String,
    pdf_download_url: String,
}

#[derive(Debug, Serialize)]
struct PageReport {
    page: usize,
    #[serde(flatten)]
    state: GeneratedPage,
    image_url: Option<String>,
}

/// Execute a full generation session.
///
/// Returns `PARTIAL_GENERATION` when any page is still missing an image
/// after the requested regenerations.
pub async fn execute_run_command(args: &RunArgs, config: &Config) -> Result<ExitCode> {
    let service = HttpGenerationService::new_from_config(config).map_err(DeckflowError::from)?;
    let session = SessionOrchestrator::new(Arc::new(service), config);
    info!(session_id = %session.session_id(), "Starting generation session");

    run_session(&session, args, config).await?;
    report(&session, args.json)
}

async fn run_session(session: &SessionOrchestrator, args: &RunArgs, config: &Config) -> Result<()> {
    // Template settings are sent with the outline request, so these go first.
    if let Some(path) = &args.logo {
        let file = load_upload(path).await?;
        session.upload_logo(&file).await.map_err(DeckflowError::from)?;
        eprintln!("✓ Logo uploaded: {}", file.filename);
    }
    for (path, kind) in [
        (&args.reference, ReferenceKind::Reference),
        (&args.template, ReferenceKind::Template),
    ] {
        if let Some(path) = path {
            let file = load_upload(path).await?;
            session
                .upload_reference(&file, kind)
                .await
                .map_err(DeckflowError::from)?;
            eprintln!("✓ {kind} uploaded: {}", file.filename);
        }
    }

    if let Some(path) = &args.audio {
        let file = load_upload(path).await?;
        let transcript = session
            .upload_audio(&file, args.speakers)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!(
            "✓ Audio transcribed: {} ({} chars)",
            file.filename,
            transcript.chars().count()
        );
    }

    for path in &args.support_docs {
        let file = load_upload(path).await?;
        let document = session
            .upload_support_document(&file)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!(
            "✓ Support document: {} ({} chars)",
            document.filename, document.text_length
        );
    }

    let input = read_raw_input(args).await?;
    let options = generation_options(args, config);
    let outline = session
        .generate_outline(&input, &options)
        .await
        .map_err(DeckflowError::from)?;
    eprintln!("✓ Outline generated: {} pages", outline.len());

    for material in &args.page_materials {
        let file = load_upload(&material.path).await?;
        session
            .upload_page_material(material.index, &file, &material.description)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!("✓ Page {} material: {}", material.index + 1, file.filename);
    }
    for table in &args.page_tables {
        let text = read_text_file(&table.path, "table file").await?;
        session
            .add_table_text(table.index, &text, &table.description)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!("✓ Page {} table text: {}", table.index + 1, table.path.display());
    }

    for feedback in &args.outline_feedback {
        let outline = session
            .refine_outline(feedback)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!("✓ Outline refined: {} pages", outline.len());
    }

    for edit in &args.edit_titles {
        session
            .edit_title(edit.index, edit.text.as_str())
            .map_err(DeckflowError::from)?;
    }
    for edit in &args.edit_contents {
        session
            .edit_content(edit.index, edit.text.as_str())
            .map_err(DeckflowError::from)?;
    }

    let style = session.confirm_outline().await.map_err(DeckflowError::from)?;
    eprintln!("✓ Outline confirmed, style plan: {} pages", style.len());

    for feedback in &args.style_feedback {
        let style = session
            .refine_style(feedback)
            .await
            .map_err(DeckflowError::from)?;
        eprintln!("✓ Style refined: {} pages", style.len());
    }

    let summary = session
        .confirm_style_with_observer(&mut print_progress)
        .await
        .map_err(DeckflowError::from)?;
    debug!(succeeded = summary.succeeded, total = summary.total, "Pipeline finished");

    for request in &args.regenerate {
        let page = session
            .regenerate(request.index, &request.text)
            .await
            .map_err(DeckflowError::from)?;
        if let Some(filename) = page.filename() {
            eprintln!("✓ Page {} regenerated: {filename}", request.index + 1);
        }
    }

    Ok(())
}

fn generation_options(args: &RunArgs, config: &Config) -> GenerationOptions {
    let mut options = GenerationOptions::from_config(config);
    if args.pages.is_some() {
        options.page_count = args.pages;
    }
    if args.design_principles.is_some() {
        options.design_principles = args.design_principles.clone();
    }
    options.page_instructions = args
        .page_instructions
        .iter()
        .map(|instruction| (instruction.index, instruction.text.clone()))
        .collect();
    options
}

fn print_progress(event: &PipelineEvent) {
    match event {
        PipelineEvent::PageStarted { index, total } => {
            eprintln!("  Rendering page {}/{total}...", index + 1);
        }
        PipelineEvent::PageSucceeded { index, filename } => {
            eprintln!("  ✓ Page {}: {filename}", index + 1);
        }
        PipelineEvent::PageFailed { index, message } => {
            eprintln!("  ✗ Page {}: {message}", index + 1);
        }
        PipelineEvent::Finished(summary) => {
            eprintln!("✓ Generation finished: {}/{} pages", summary.succeeded, summary.total);
        }
    }
}

fn report(session: &SessionOrchestrator, json: bool) -> Result<ExitCode> {
    let pages = session.pages();
    let summary = PipelineSummary {
        succeeded: pages.iter().filter(|p| p.is_succeeded()).count(),
        total: pages.len(),
    };
    let exit = if summary.is_complete_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::PARTIAL_GENERATION
    };

    if json {
        let report = RunReport {
            session_id: session.session_id().to_string(),
            stage: session.stage().to_string(),
            succeeded: summary.succeeded,
            total: summary.total,
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, state)| PageReport {
                    page: i + 1,
                    image_url: session.image_url(i),
                    state,
                })
                .collect(),
            download_url: session.download_url(),
            pdf_download_url: session.pdf_download_url(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(exit);
    }

    println!("Session {}", session.session_id());
    println!();
    for entry in session.transcript() {
        print_entry(&entry);
    }
    println!();
    println!("Pages: {}/{} generated", summary.succeeded, summary.total);
    for (i, page) in pages.iter().enumerate() {
        match page {
            GeneratedPage::Succeeded { .. } => {
                let url = session.image_url(i).unwrap_or_default();
                println!("  {:>2}. {url}", i + 1);
            }
            GeneratedPage::Errored { message } => println!("  {:>2}. failed: {message}", i + 1),
            GeneratedPage::Empty => println!("  {:>2}. not generated", i + 1),
        }
    }
    println!();
    println!("Download: {}", session.download_url());
    println!("PDF:      {}", session.pdf_download_url());

    if summary.failed() > 0 {
        eprintln!(
            "⚠ {} of {} page(s) failed to render",
            summary.failed(),
            summary.total
        );
    }
    Ok(exit)
}

fn print_entry(entry: &TranscriptEntry) {
    let who = match entry.role {
        Role::User => "you",
        Role::Assistant => "service",
    };
    println!("[{}] {who}:", entry.timestamp.format("%H:%M:%S"));
    for line in entry.content.lines() {
        println!("    {line}");
    }
}
