//! Per-page and document-level attachments
//!
//! Page materials live in a map from page index to an ordered list;
//! insertion order is display order. Removing an entry shifts the rest of
//! that page's list down by one and leaves other pages alone.

use std::collections::BTreeMap;

use serde::Serialize;

use deckflow_client::{RemoteMaterial, SupportDocumentListing};
use deckflow_utils::error::WorkflowError;
use deckflow_utils::types::MaterialKind;

/// One material attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Material {
    pub filename: String,
    pub kind: MaterialKind,
    pub description: String,
}

impl From<RemoteMaterial> for Material {
    fn from(remote: RemoteMaterial) -> Self {
        Self {
            filename: remote.filename,
            kind: remote.kind,
            description: remote.description,
        }
    }
}

/// A document-level support file the service extracted text from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportDocumentRecord {
    pub filename: String,
    pub text_length: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterialStore {
    support_documents: Vec<SupportDocumentRecord>,
    pages: BTreeMap<usize, Vec<Material>>,
}

impl MaterialStore {
    /// Reject a file over `limit` bytes before anything is sent.
    pub fn check_size(limit: u64, actual: u64) -> Result<(), WorkflowError> {
        if actual > limit {
            return Err(WorkflowError::FileTooLarge { limit, actual });
        }
        Ok(())
    }

    pub fn add_support_document(&mut self, record: SupportDocumentRecord) {
        self.support_documents.push(record);
    }

    pub fn clear_support_documents(&mut self) {
        self.support_documents.clear();
    }

    #[must_use]
    pub fn support_documents(&self) -> &[SupportDocumentRecord] {
        &self.support_documents
    }

    #[must_use]
    pub fn total_text_length(&self) -> usize {
        self.support_documents.iter().map(|d| d.text_length).sum()
    }

    /// Append to a page's list; returns the new material's position.
    pub fn add(&mut self, page_index: usize, material: Material) -> usize {
        let list = self.pages.entry(page_index).or_default();
        list.push(material);
        list.len() - 1
    }

    /// Check that `material_index` exists on `page_index`.
    pub fn ensure_exists(&self, page_index: usize, material_index: usize) -> Result<(), WorkflowError> {
        let exists = self
            .pages
            .get(&page_index)
            .is_some_and(|list| material_index < list.len());
        if exists {
            Ok(())
        } else {
            Err(WorkflowError::MaterialOutOfRange {
                page_index,
                material_index,
            })
        }
    }

    /// Remove by position, shifting later materials on the same page down.
    pub fn remove(
        &mut self,
        page_index: usize,
        material_index: usize,
    ) -> Result<Material, WorkflowError> {
        self.ensure_exists(page_index, material_index)?;
        let Some(list) = self.pages.get_mut(&page_index) else {
            return Err(WorkflowError::MaterialOutOfRange {
                page_index,
                material_index,
            });
        };
        let removed = list.remove(material_index);
        if list.is_empty() {
            self.pages.remove(&page_index);
        }
        Ok(removed)
    }

    #[must_use]
    pub fn page(&self, page_index: usize) -> &[Material] {
        self.pages.get(&page_index).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn pages(&self) -> &BTreeMap<usize, Vec<Material>> {
        &self.pages
    }

    /// Replace page materials with the service's authoritative listing.
    pub fn replace_pages(&mut self, listing: BTreeMap<usize, Vec<RemoteMaterial>>) {
        self.pages = listing
            .into_iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(page, list)| (page, list.into_iter().map(Material::from).collect()))
            .collect();
    }

    /// Replace support documents with the service's authoritative listing.
    pub fn replace_support_documents(&mut self, listing: SupportDocumentListing) {
        self.support_documents = listing
            .files
            .into_iter()
            .map(|entry| SupportDocumentRecord {
                filename: entry.filename,
                text_length: entry.text_length,
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckflow_client::SupportDocumentEntry;
    use proptest::prelude::*;

    fn material(name: &str) -> Material {
        Material {
            filename: name.to_string(),
            kind: MaterialKind::Image,
            description: String::new(),
        }
    }

    fn names(store: &MaterialStore, page: usize) -> Vec<&str> {
        store.page(page).iter().map(|m| m.filename.as_str()).collect()
    }

    #[test]
    fn test_remove_reindexes_and_leaves_other_pages() {
        let mut store = MaterialStore::default();
        for name in ["a.png", "b.png", "c.csv"] {
            store.add(1, material(name));
        }
        store.add(2, material("z.png"));

        let removed = store.remove(1, 0).unwrap();
        assert_eq!(removed.filename, "a.png");
        assert_eq!(names(&store, 1), vec!["b.png", "c.csv"]);
        assert_eq!(names(&store, 2), vec!["z.png"], "other page untouched");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut store = MaterialStore::default();
        store.add(0, material("a.png"));

        assert!(matches!(
            store.remove(0, 1),
            Err(WorkflowError::MaterialOutOfRange {
                page_index: 0,
                material_index: 1
            })
        ));
        assert!(store.remove(5, 0).is_err());
        assert_eq!(store.page(0).len(), 1, "failed remove has no side effect");
    }

    #[test]
    fn test_removing_last_material_drops_page_entry() {
        let mut store = MaterialStore::default();
        store.add(3, material("only.png"));
        store.remove(3, 0).unwrap();
        assert!(store.pages().is_empty());
    }

    #[test]
    fn test_size_check() {
        assert!(MaterialStore::check_size(10, 10).is_ok());
        assert!(matches!(
            MaterialStore::check_size(10, 11),
            Err(WorkflowError::FileTooLarge {
                limit: 10,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_support_documents_and_total_length() {
        let mut store = MaterialStore::default();
        store.add_support_document(SupportDocumentRecord {
            filename: "brief.pdf".to_string(),
            text_length: 1200,
        });
        store.add_support_document(SupportDocumentRecord {
            filename: "notes.docx".to_string(),
            text_length: 300,
        });
        assert_eq!(store.total_text_length(), 1500);

        store.clear_support_documents();
        assert!(store.support_documents().is_empty());
        assert_eq!(store.total_text_length(), 0);
    }

    #[test]
    fn test_replace_from_listings() {
        let mut store = MaterialStore::default();
        store.add(0, material("stale.png"));

        let mut listing = BTreeMap::new();
        listing.insert(
            1,
            vec![RemoteMaterial {
                filename: "sales.xlsx".to_string(),
                kind: MaterialKind::TableFile,
                description: "by region".to_string(),
            }],
        );
        listing.insert(4, Vec::new());
        store.replace_pages(listing);

        assert!(store.page(0).is_empty());
        assert_eq!(store.page(1)[0].kind, MaterialKind::TableFile);
        assert!(!store.pages().contains_key(&4), "empty lists are not kept");

        store.replace_support_documents(SupportDocumentListing {
            files: vec![SupportDocumentEntry {
                filename: "brief.pdf".to_string(),
                text_length: 42,
            }],
            total_text_length: 42,
        });
        assert_eq!(store.support_documents().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_remove_shifts_later_materials_down(
            len in 1usize..12,
            other_len in 0usize..5,
            k in 0usize..12,
        ) {
            prop_assume!(k < len);
            let mut store = MaterialStore::default();
            for i in 0..len {
                store.add(0, material(&format!("m{i}")));
            }
            for i in 0..other_len {
                store.add(1, material(&format!("o{i}")));
            }
            let before: Vec<String> =
                store.page(0).iter().map(|m| m.filename.clone()).collect();

            store.remove(0, k).unwrap();

            let after: Vec<String> =
                store.page(0).iter().map(|m| m.filename.clone()).collect();
            prop_assert_eq!(after.len(), len - 1);
            prop_assert_eq!(&after[..k], &before[..k]);
            prop_assert_eq!(&after[k..], &before[k + 1..]);
            prop_assert_eq!(store.page(1).len(), other_len);
        }
    }
}
