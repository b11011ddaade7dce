//! Append-only conversation log of a session

use chrono::{DateTime, Utc};
use serde::Serialize;

use deckflow_client::{OutlinePage, StylePage};
use deckflow_utils::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        self.entries.push(TranscriptEntry {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}

/// `【第n页】title` followed by the content, one block per page.
#[must_use]
pub fn render_outline(outline: &[OutlinePage]) -> String {
    outline
        .iter()
        .enumerate()
        .map(|(i, page)| format!("【第{}页】{}\n{}", i + 1, page.display_title(), page.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_style(style: &[StylePage]) -> String {
    style
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let mut block = format!("【第{}页】{}\n{}", i + 1, page.display_title(), page.design_concept);
            if !page.layout.is_empty() {
                block.push('\n');
                block.push_str(&page.layout);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
