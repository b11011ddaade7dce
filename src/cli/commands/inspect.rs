//! Remote inspection commands: `deckflow defaults` and `deckflow session <ID>`

use anyhow::Result;
use serde_json::json;

use deckflow_client::{GenerationService, HttpGenerationService};
use deckflow_config::Config;
use deckflow_utils::error::DeckflowError;
use deckflow_utils::exit_codes::ExitCode;
use deckflow_utils::types::SessionId;

pub async fn execute_defaults_command(config: &Config) -> Result<ExitCode> {
    let service = HttpGenerationService::new_from_config(config).map_err(DeckflowError::from)?;
    let defaults = service.defaults().await.map_err(DeckflowError::from)?;
    println!("{}", defaults.design_principles);
    Ok(ExitCode::SUCCESS)
}

pub async fn execute_session_command(id: &str, json: bool, config: &Config) -> Result<ExitCode> {
    let service = HttpGenerationService::new_from_config(config).map_err(DeckflowError::from)?;
    let session = SessionId::from_raw(id);
    let snapshot = service
        .session_snapshot(&session)
        .await
        .map_err(DeckflowError::from)?;

    let stage = snapshot
        .stage()
        .map_or_else(|| snapshot.stage.clone(), |s| s.to_string());

    if json {
        let out = json!({
            "session_id": snapshot.session_id,
            "stage": stage,
            "outline_pages": snapshot.outline.len(),
            "style_pages": snapshot.style.len(),
            "generated_images": snapshot.generated_image_count(),
            "messages": snapshot.messages.len(),
            "has_audio_transcript": !snapshot.audio_transcript.is_empty(),
            "download_url": service.download_url(&session),
            "pdf_download_url": service.pdf_download_url(&session),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Session: {}", snapshot.session_id);
    println!("  Stage: {stage}");
    println!("  Outline pages: {}", snapshot.outline.len());
    println!("  Style pages: {}", snapshot.style.len());
    println!(
        "  Generated images: {}/{}",
        snapshot.generated_image_count(),
        snapshot.images.len()
    );
    for (i, page) in snapshot.outline.iter().enumerate() {
        println!("    {}. {}", i + 1, page.display_title());
    }
    println!("  Download: {}", service.download_url(&session));
    println!("  PDF: {}", service.pdf_download_url(&session));
    Ok(ExitCode::SUCCESS)
}
