//! Raw input assembly and outline generation options

use std::collections::BTreeMap;

use deckflow_config::Config;

/// Separator placed between typed text and an audio transcript.
pub const TRANSCRIPT_MARKER: &str = "\n\n【录音内容】\n";

/// What the user typed plus an optional transcribed recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub text: String,
    pub transcript: Option<String>,
}

impl RawInput {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            transcript: None,
        }
    }

    #[must_use]
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Combined content sent to outline generation.
    ///
    /// Returns `None` when both parts are blank. A transcript on its own is
    /// valid input.
    #[must_use]
    pub fn combined(&self) -> Option<String> {
        let text = self.text.trim();
        let transcript = self
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match (text.is_empty(), transcript) {
            (true, None) => None,
            (true, Some(transcript)) => Some(transcript.to_string()),
            (false, None) => Some(text.to_string()),
            (false, Some(transcript)) => Some(format!("{text}{TRANSCRIPT_MARKER}{transcript}")),
        }
    }
}

/// Knobs for outline generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub page_count: Option<u32>,
    /// Free-text instruction per zero-based page index
    pub page_instructions: BTreeMap<usize, String>,
    pub design_principles: Option<String>,
}

impl GenerationOptions {
    /// Options seeded from `[generation]`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_count: config.generation.page_count,
            page_instructions: BTreeMap::new(),
            design_principles: config.generation.design_principles.clone(),
        }
    }

    /// Render per-page instructions as `第{n}页: {text}` lines, in page order.
    ///
    /// Blank instructions are skipped; `None` when nothing remains.
    #[must_use]
    pub fn page_instructions_text(&self) -> Option<String> {
        let lines: Vec<String> = self
            .page_instructions
            .iter()
            .filter_map(|(index, text)| {
                let text = text.trim();
                (!text.is_empty()).then(|| format!("第{}页: {}", index + 1, text))
            })
            .collect();

        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}
