//! Locally editable shadow copy of the outline
//!
//! Reconciliation is one-directional and total:
//! - a fresh outline from generation or refinement replaces the buffer
//!   wholesale, discarding unapplied edits;
//! - apply/confirm copies every buffer entry over the authoritative outline.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use deckflow_client::OutlinePage;
use deckflow_utils::error::WorkflowError;

/// Editable title/content of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditableOutlineEntry {
    pub title: String,
    pub content: String,
}

impl From<&OutlinePage> for EditableOutlineEntry {
    fn from(page: &OutlinePage) -> Self {
        Self {
            title: page.display_title().to_string(),
            content: page.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutlineEditBuffer {
    entries: Vec<EditableOutlineEntry>,
    dirty: BTreeSet<usize>,
}

impl OutlineEditBuffer {
    #[must_use]
    pub fn from_outline(outline: &[OutlinePage]) -> Self {
        Self {
            entries: outline.iter().map(EditableOutlineEntry::from).collect(),
            dirty: BTreeSet::new(),
        }
    }

    /// Rebuild from a freshly received outline.
    ///
    /// Returns how many edited entries were discarded.
    pub fn reinitialize(&mut self, outline: &[OutlinePage]) -> usize {
        let discarded = self.dirty.len();
        if discarded > 0 {
            warn!(
                discarded,
                "Unapplied outline edits replaced by a new outline from the service"
            );
        }
        *self = Self::from_outline(outline);
        discarded
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
    pub fn get(&self, index: usize) -> Option<&EditableOutlineEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn entries(&self) -> &[EditableOutlineEntry] {
        &self.entries
    }

    /// True when any entry was edited since the last apply.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn set_title(&mut self, index: usize, title: impl Into<String>) -> Result<(), WorkflowError> {
        let page_count = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(WorkflowError::PageOutOfRange { index, page_count })?;
        entry.title = title.into();
        self.dirty.insert(index);
        Ok(())
    }

    pub fn set_content(
        &mut self,
        index: usize,
        content: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let page_count = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(WorkflowError::PageOutOfRange { index, page_count })?;
        entry.content = content.into();
        self.dirty.insert(index);
        Ok(())
    }

    /// The outline with every buffer entry written over it.
    ///
    /// Title and content are overwritten; a `theme` field, when present, is
    /// kept equal to the title. Pages beyond the buffer are left as they are.
    #[must_use]
    pub fn merged(&self, outline: &[OutlinePage]) -> Vec<OutlinePage> {
        outline
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let mut page = page.clone();
                if let Some(entry) = self.entries.get(index) {
                    page.title.clone_from(&entry.title);
                    page.content.clone_from(&entry.content);
                    if page.theme.is_some() {
                        page.theme = Some(entry.title.clone());
                    }
                }
                page
            })
            .collect()
    }

    /// Indices edited since the last apply.
    #[must_use]
    pub fn dirty_indices(&self) -> BTreeSet<usize> {
        self.dirty.clone()
    }

    /// Forget edit markers once the merged outline became authoritative.
    ///
    /// Only the indices that were pushed are cleared; edits made since the
    /// snapshot stay dirty.
    pub fn mark_applied(&mut self, applied: &BTreeSet<usize>) {
        self.dirty.retain(|index| !applied.contains(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline() -> Vec<OutlinePage> {
        let mut themed = OutlinePage::new("", "growth by region");
        themed.theme = Some("Regions".to_string());
        vec![
            OutlinePage::new("Cover", "Q4 sales report"),
            themed,
            OutlinePage::new("Outlook", "2025 targets"),
        ]
    }

    #[test]
    fn test_entries_use_theme_when_title_missing() {
        let buffer = OutlineEditBuffer::from_outline(&outline());
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get(1).unwrap().title, "Regions");
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_merge_overwrites_edited_and_keeps_theme_in_sync() {
        let outline = outline();
        let mut buffer = OutlineEditBuffer::from_outline(&outline);
        buffer.set_title(1, "Regional growth").unwrap();
        buffer.set_content(2, "2025 targets and risks").unwrap();

        let merged = buffer.merged(&outline);
        assert_eq!(merged[0], outline[0], "unedited page unchanged");
        assert_eq!(merged[1].title, "Regional growth");
        assert_eq!(merged[1].theme.as_deref(), Some("Regional growth"));
        assert_eq!(merged[2].content, "2025 targets and risks");
        assert_eq!(merged[2].theme, None, "theme is not invented");
    }

    #[test]
    fn test_reinitialize_discards_unapplied_edits() {
        let mut buffer = OutlineEditBuffer::from_outline(&outline());
        buffer.set_title(0, "My cover").unwrap();

        let fresh = vec![OutlinePage::new("New cover", "")];
        assert_eq!(buffer.reinitialize(&fresh), 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get(0).unwrap().title, "New cover");
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut buffer = OutlineEditBuffer::from_outline(&outline());
        let err = buffer.set_title(3, "nope").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PageOutOfRange {
                index: 3,
                page_count: 3
            }
        ));
    }

    #[test]
    fn test_mark_applied_clears_dirty() {
        let mut buffer = OutlineEditBuffer::from_outline(&outline());
        buffer.set_content(0, "x").unwrap();
        assert!(buffer.is_dirty());
        let applied = buffer.dirty_indices();
        buffer.mark_applied(&applied);
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.get(0).unwrap().content, "x", "values survive apply");
    }

    #[test]
    fn test_mark_applied_keeps_later_edits_dirty() {
        let mut buffer = OutlineEditBuffer::from_outline(&outline());
        buffer.set_title(0, "Opening").unwrap();
        let applied = buffer.dirty_indices();

        buffer.set_title(2, "Next year").unwrap();
        buffer.mark_applied(&applied);

        assert!(buffer.is_dirty(), "edit made after the snapshot is still pending");
        assert_eq!(buffer.dirty_indices(), BTreeSet::from([2]));
    }
}
