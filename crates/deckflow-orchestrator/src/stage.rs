//! Stage state machine owning the authoritative outline, style plan and
//! generated-page table
//!
//! The machine performs no I/O. Every transition is one method call that
//! either succeeds and logs the move, or fails and leaves all state as it was.

use serde::Serialize;

use deckflow_client::{OutlinePage, StylePage};
use deckflow_utils::error::WorkflowError;
use deckflow_utils::logging::log_stage_transition;
use deckflow_utils::types::{SessionId, Stage};

use crate::pipeline::GeneratedPage;

/// Snapshot of what a late response must still match to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    pub stage: Stage,
    pub outline_revision: u64,
    pub style_revision: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageMachine {
    #[serde(skip)]
    session: SessionId,
    stage: Stage,
    outline: Vec<OutlinePage>,
    style: Vec<StylePage>,
    pages: Vec<GeneratedPage>,
    outline_revision: u64,
    style_revision: u64,
}

impl StageMachine {
    #[must_use]
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            stage: Stage::Input,
            outline: Vec::new(),
            style: Vec::new(),
            pages: Vec::new(),
            outline_revision: 0,
            style_revision: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn outline(&self) -> &[OutlinePage] {
        &self.outline
    }

    #[must_use]
    pub fn style(&self) -> &[StylePage] {
        &self.style
    }

    #[must_use]
    pub fn pages(&self) -> &[GeneratedPage] {
        &self.pages
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch {
            stage: self.stage,
            outline_revision: self.outline_revision,
            style_revision: self.style_revision,
        }
    }

    #[must_use]
    pub fn outline_revision(&self) -> u64 {
        self.outline_revision
    }

    /// Number of pages to render; always the outline length.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.outline.len()
    }

    pub fn require(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), WorkflowError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidStage {
                operation,
                stage: self.stage,
            })
        }
    }

    fn advance(&mut self, operation: &'static str, to: Stage) -> Result<(), WorkflowError> {
        if !self.stage.can_transition_to(to) {
            return Err(WorkflowError::InvalidStage {
                operation,
                stage: self.stage,
            });
        }
        log_stage_transition(self.session.as_str(), self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Replace the outline with a fresh one from generation or refinement.
    ///
    /// `Input` passes through the transient `Outline` stage to
    /// `OutlineRefine`; in `OutlineRefine` this is a self-loop. An outline
    /// without pages is refused, so the page slots can never outnumber it.
    pub fn accept_outline(&mut self, outline: Vec<OutlinePage>) -> Result<(), WorkflowError> {
        self.require("accept outline", &[Stage::Input, Stage::OutlineRefine])?;
        if outline.is_empty() {
            return Err(WorkflowError::EmptyOutline);
        }
        self.advance("accept outline", Stage::OutlineRefine)?;
        self.outline = outline;
        self.outline_revision += 1;
        Ok(())
    }

    /// Make a locally merged outline authoritative after the service stored it.
    pub fn commit_outline(&mut self, outline: Vec<OutlinePage>) -> Result<(), WorkflowError> {
        self.require("apply outline edits", &[Stage::OutlineRefine])?;
        self.outline = outline;
        Ok(())
    }

    /// Replace the style plan; moves `OutlineRefine` to `StyleRefine` or
    /// self-loops in `StyleRefine`.
    pub fn accept_style(&mut self, style: Vec<StylePage>) -> Result<(), WorkflowError> {
        self.require("accept style", &[Stage::OutlineRefine, Stage::StyleRefine])?;
        if style.len() != self.outline.len() {
            return Err(WorkflowError::StyleLengthMismatch {
                outline: self.outline.len(),
                style: style.len(),
            });
        }
        self.advance("accept style", Stage::StyleRefine)?;
        self.style = style;
        self.style_revision += 1;
        Ok(())
    }

    /// Enter `Generate` with one empty slot per page; returns the page count.
    pub fn begin_generation(&mut self) -> Result<usize, WorkflowError> {
        self.require("confirm style", &[Stage::StyleRefine])?;
        self.advance("confirm style", Stage::Generate)?;
        let count = self.page_count();
        self.pages = vec![GeneratedPage::Empty; count];
        Ok(count)
    }

    /// Overwrite one generated-page slot.
    pub fn record_page(&mut self, index: usize, page: GeneratedPage) -> Result<(), WorkflowError> {
        let page_count = self.pages.len();
        let slot = self
            .pages
            .get_mut(index)
            .ok_or(WorkflowError::PageOutOfRange { index, page_count })?;
        *slot = page;
        Ok(())
    }

    /// Leave `Generate` once every page was attempted.
    pub fn complete(&mut self) -> Result<(), WorkflowError> {
        self.require("complete generation", &[Stage::Generate])?;
        self.advance("complete generation", Stage::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_outline, sample_style};
    use proptest::prelude::*;

    fn machine() -> StageMachine {
        StageMachine::new(SessionId::from_raw("session_1_abc"))
    }

    fn stable_rank(stage: Stage) -> usize {
        Stage::STABLE
            .iter()
            .position(|s| *s == stage)
            .expect("machine only rests in stable stages")
    }

    #[test]
    fn test_happy_path_visits_every_stable_stage() {
        let mut m = machine();
        m.accept_outline(sample_outline(3)).unwrap();
        assert_eq!(m.stage(), Stage::OutlineRefine);
        m.accept_style(sample_style(3)).unwrap();
        assert_eq!(m.stage(), Stage::StyleRefine);
        assert_eq!(m.begin_generation().unwrap(), 3);
        assert_eq!(m.stage(), Stage::Generate);
        assert_eq!(m.pages(), &[GeneratedPage::Empty, GeneratedPage::Empty, GeneratedPage::Empty]);
        m.complete().unwrap();
        assert_eq!(m.stage(), Stage::Complete);
    }

    #[test]
    fn test_refine_self_loops_keep_stage_and_bump_revision() {
        let mut m = machine();
        m.accept_outline(sample_outline(2)).unwrap();
        let before = m.epoch();
        m.accept_outline(sample_outline(4)).unwrap();
        assert_eq!(m.stage(), Stage::OutlineRefine);
        assert_eq!(m.outline().len(), 4);
        assert_ne!(m.epoch(), before, "replacement changes the epoch");
    }

    #[test]
    fn test_style_length_mismatch_does_not_advance() {
        let mut m = machine();
        m.accept_outline(sample_outline(5)).unwrap();
        let err = m.accept_style(sample_style(4)).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StyleLengthMismatch {
                outline: 5,
                style: 4
            }
        ));
        assert_eq!(m.stage(), Stage::OutlineRefine);
        assert!(m.style().is_empty());
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut m = machine();
        assert!(matches!(
            m.accept_style(sample_style(1)),
            Err(WorkflowError::InvalidStage {
                stage: Stage::Input,
                ..
            })
        ));
        assert!(m.begin_generation().is_err());
        assert!(m.complete().is_err());
        assert_eq!(m.stage(), Stage::Input);
    }

    #[test]
    fn test_outline_cannot_be_replaced_after_confirm() {
        let mut m = machine();
        m.accept_outline(sample_outline(1)).unwrap();
        m.accept_style(sample_style(1)).unwrap();
        assert!(m.accept_outline(sample_outline(1)).is_err());
        assert!(m.commit_outline(sample_outline(1)).is_err());
    }

    #[test]
    fn test_commit_outline_keeps_revision() {
        let mut m = machine();
        m.accept_outline(sample_outline(2)).unwrap();
        let revision = m.outline_revision();
        let mut edited = sample_outline(2);
        edited[1].title = "Edited".to_string();
        m.commit_outline(edited).unwrap();
        assert_eq!(m.outline()[1].title, "Edited");
        assert_eq!(m.outline_revision(), revision);
    }

    #[test]
    fn test_record_page_bounds() {
        let mut m = machine();
        m.accept_outline(sample_outline(2)).unwrap();
        m.accept_style(sample_style(2)).unwrap();
        m.begin_generation().unwrap();
        assert!(matches!(
            m.record_page(2, GeneratedPage::Empty),
            Err(WorkflowError::PageOutOfRange {
                index: 2,
                page_count: 2
            })
        ));
    }

    #[test]
    fn test_empty_outline_is_refused() {
        let mut m = machine();
        assert!(matches!(
            m.accept_outline(Vec::new()),
            Err(WorkflowError::EmptyOutline)
        ));
        assert_eq!(m.stage(), Stage::Input);
        assert_eq!(m.outline_revision(), 0);

        m.accept_outline(sample_outline(2)).unwrap();
        assert!(matches!(
            m.accept_outline(Vec::new()),
            Err(WorkflowError::EmptyOutline)
        ));
        assert_eq!(m.outline().len(), 2, "previous outline kept");

        assert!(matches!(
            m.accept_style(sample_style(5)),
            Err(WorkflowError::StyleLengthMismatch { outline: 2, style: 5 })
        ));
        m.accept_style(sample_style(2)).unwrap();
        assert_eq!(m.begin_generation().unwrap(), 2);
        assert!(m.pages().len() <= m.outline().len());
    }

    #[derive(Debug, Clone)]
    enum Event {
        Outline(usize),
        Style(usize),
        Generate,
        Complete,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (0usize..6).prop_map(Event::Outline),
            (1usize..6).prop_map(Event::Style),
            Just(Event::Generate),
            Just(Event::Complete),
        ]
    }

    proptest! {
        #[test]
        fn prop_stage_only_moves_forward_one_step(events in prop::collection::vec(event(), 0..30)) {
            let mut m = machine();
            for event in events {
                let before = m.stage();
                let result = match event {
                    Event::Outline(n) => m.accept_outline(sample_outline(n)),
                    Event::Style(n) => m.accept_style(sample_style(n)),
                    Event::Generate => m.begin_generation().map(|_| ()),
                    Event::Complete => m.complete(),
                };
                let after = m.stage();

                prop_assert!(!after.is_transient());
                if result.is_err() {
                    prop_assert_eq!(before, after, "failed transition must not move");
                } else {
                    let (b, a) = (stable_rank(before), stable_rank(after));
                    prop_assert!(a == b || a == b + 1, "{before} -> {after}");
                    if a == b {
                        prop_assert!(matches!(after, Stage::OutlineRefine | Stage::StyleRefine));
                    }
                }
                if !m.style().is_empty() {
                    prop_assert_eq!(m.style().len(), m.outline().len());
                }
                prop_assert!(m.pages().len() <= m.outline().len());
            }
        }
    }
}
