//! Explicit request/result state per upload target

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use deckflow_utils::error::WorkflowError;

/// Where an upload lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "target", content = "page_index")]
pub enum UploadTarget {
    SupportDocument,
    PageMaterial(usize),
    Audio,
    Logo,
    Reference,
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SupportDocument => f.write_str("support document"),
            Self::PageMaterial(index) => write!(f, "page {} material", index + 1),
            Self::Audio => f.write_str("audio"),
            Self::Logo => f.write_str("logo"),
            Self::Reference => f.write_str("reference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTicket {
    pub id: u64,
    pub target: UploadTarget,
    pub filename: String,
    pub state: UploadState,
}

/// Latest ticket per target.
#[derive(Debug, Default)]
pub struct UploadTracker {
    next_id: u64,
    tickets: BTreeMap<UploadTarget, UploadTicket>,
}

impl UploadTracker {
    /// Open a ticket; refused while the same target has one pending.
    pub fn begin(
        &mut self,
        target: UploadTarget,
        filename: impl Into<String>,
        operation: &'static str,
    ) -> Result<u64, WorkflowError> {
        if self
            .tickets
            .get(&target)
            .is_some_and(|t| t.state == UploadState::Pending)
        {
            return Err(WorkflowError::Busy { operation });
        }

        self.next_id += 1;
        let id = self.next_id;
        self.tickets.insert(
            target,
            UploadTicket {
                id,
                target,
                filename: filename.into(),
                state: UploadState::Pending,
            },
        );
        Ok(id)
    }

    /// Resolve a ticket. Tickets that are no longer current for their
    /// target are ignored.
    pub fn complete(&mut self, id: u64, outcome: Result<(), String>) {
        if let Some(ticket) = self.tickets.values_mut().find(|t| t.id == id) {
            ticket.state = match outcome {
                Ok(()) => UploadState::Succeeded,
                Err(message) => UploadState::Failed { message },
            };
        }
    }

    #[must_use]
    pub fn state(&self, target: UploadTarget) -> Option<&UploadState> {
        self.tickets.get(&target).map(|t| &t.state)
    }

    pub fn tickets(&self) -> impl Iterator<Item = &UploadTicket> {
        self.tickets.values()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.tickets.values().any(|t| t.state == UploadState::Pending)
    }
}
