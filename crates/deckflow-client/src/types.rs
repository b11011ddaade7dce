//! Request/response types and the service trait the orchestrator talks to

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use deckflow_utils::error::ServiceError;
use deckflow_utils::types::{MaterialKind, ReferenceKind, SessionId, Stage, TemplateSettings};

/// One page of the outline.
///
/// Pages carry whatever extra fields the service emits (page number, key
/// points, ...). They are preserved so that pushing an edited outline back
/// through `update_outline` does not strip them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlinePage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Denormalised copy of the title some prompts emit instead of `title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OutlinePage {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Title as shown to the user: `title`, falling back to `theme`.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.theme.as_deref().unwrap_or_default()
        } else {
            &self.title
        }
    }
}

/// One page of the style plan, index-aligned with the outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePage {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub design_concept: String,
    #[serde(default)]
    pub layout: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StylePage {
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.theme.as_deref().unwrap_or_default()
        } else {
            &self.title
        }
    }
}

/// Parameters of an outline generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutlineRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_principles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_settings: Option<TemplateSettings>,
}

/// A binary payload plus the name it is uploaded under.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FileUpload {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming the upload after its final path component.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { filename, bytes })
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase extension without the dot, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// Result of a support-document upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupportDocument {
    pub filename: String,
    #[serde(default)]
    pub text_length: usize,
    #[serde(default)]
    pub text_preview: String,
}

/// Support documents the remote session holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportDocumentListing {
    pub files: Vec<SupportDocumentEntry>,
    pub total_text_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupportDocumentEntry {
    pub filename: String,
    #[serde(default)]
    pub text_length: usize,
}

/// A page material as acknowledged or listed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMaterial {
    pub filename: String,
    pub kind: MaterialKind,
    pub description: String,
}

/// Page materials keyed by zero-based page index.
pub type PageMaterialListing = BTreeMap<usize, Vec<RemoteMaterial>>;

/// Result of a reference or template upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceUpload {
    pub kind: ReferenceKind,
    /// Colour/font/layout analysis; only produced for templates.
    pub template_analysis: Option<serde_json::Value>,
}

/// Server-side defaults exposed by `GET /defaults`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceDefaults {
    #[serde(default)]
    pub design_principles: String,
}

/// Authoritative remote view of a session (`GET /session/{id}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub outline: Vec<OutlinePage>,
    #[serde(default)]
    pub style: Vec<StylePage>,
    #[serde(default)]
    pub images: Vec<Option<serde_json::Value>>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub audio_transcript: String,
}

impl SessionSnapshot {
    /// Remote stage, if it is one this client knows.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        Stage::from_str(&self.stage).ok()
    }

    #[must_use]
    pub fn generated_image_count(&self) -> usize {
        self.images.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Request/response boundary to the remote generation service.
///
/// Every operation is keyed by the session identifier. Implementations map
/// `success: false` answers to [`ServiceError::Rejected`] with the service's
/// message, and anything that prevents a well-formed answer to one of the
/// transport variants.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_outline(
        &self,
        session: &SessionId,
        request: &OutlineRequest,
    ) -> Result<Vec<OutlinePage>, ServiceError>;

    async fn refine_outline(
        &self,
        session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<OutlinePage>, ServiceError>;

    /// Replace the remote outline with a locally edited copy.
    async fn update_outline(
        &self,
        session: &SessionId,
        outline: &[OutlinePage],
    ) -> Result<(), ServiceError>;

    async fn confirm_outline(&self, session: &SessionId) -> Result<(), ServiceError>;

    async fn generate_style(&self, session: &SessionId) -> Result<Vec<StylePage>, ServiceError>;

    async fn refine_style(
        &self,
        session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<StylePage>, ServiceError>;

    async fn confirm_style(&self, session: &SessionId) -> Result<(), ServiceError>;

    /// Render one page; returns the image filename.
    async fn generate_image(
        &self,
        session: &SessionId,
        page_index: usize,
    ) -> Result<String, ServiceError>;

    /// Re-render one page with feedback; returns the new image filename.
    async fn refine_page(
        &self,
        session: &SessionId,
        page_index: usize,
        feedback: &str,
    ) -> Result<String, ServiceError>;

    async fn upload_support_document(
        &self,
        session: &SessionId,
        file: &FileUpload,
    ) -> Result<SupportDocument, ServiceError>;

    async fn clear_support_documents(&self, session: &SessionId) -> Result<(), ServiceError>;

    async fn list_support_documents(
        &self,
        session: &SessionId,
    ) -> Result<SupportDocumentListing, ServiceError>;

    async fn upload_page_material(
        &self,
        session: &SessionId,
        page_index: usize,
        file: &FileUpload,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError>;

    async fn add_table_text(
        &self,
        session: &SessionId,
        page_index: usize,
        text: &str,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError>;

    async fn remove_page_material(
        &self,
        session: &SessionId,
        page_index: usize,
        material_index: usize,
    ) -> Result<(), ServiceError>;

    async fn list_page_materials(
        &self,
        session: &SessionId,
    ) -> Result<PageMaterialListing, ServiceError>;

    /// Transcribe an audio recording; returns the transcript text.
    async fn upload_audio(
        &self,
        session: &SessionId,
        file: &FileUpload,
        speakers: Option<u32>,
    ) -> Result<String, ServiceError>;

    async fn upload_logo(&self, session: &SessionId, file: &FileUpload) -> Result<(), ServiceError>;

    async fn upload_reference(
        &self,
        session: &SessionId,
        file: &FileUpload,
        kind: ReferenceKind,
    ) -> Result<ReferenceUpload, ServiceError>;

    async fn defaults(&self) -> Result<ServiceDefaults, ServiceError>;

    async fn session_snapshot(&self, session: &SessionId) -> Result<SessionSnapshot, ServiceError>;

    /// URL of a rendered image; `timestamp` (unix millis) busts caches keyed on filename.
    fn image_url(&self, filename: &str, timestamp: Option<i64>) -> String;

    /// URL of the bulk (zip) download.
    fn download_url(&self, session: &SessionId) -> String;

    fn pdf_download_url(&self, session: &SessionId) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outline_page_keeps_unknown_fields() {
        let page: OutlinePage = serde_json::from_value(json!({
            "page": 3,
            "title": "Pipeline",
            "content": "- q1\n- q2",
            "key_points": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(page.extra.get("page"), Some(&json!(3)));
        let back = serde_json::to_value(&page).unwrap();
        assert_eq!(back["key_points"], json!(["a", "b"]));
        assert!(back.get("theme").is_none(), "absent theme is not invented");
    }

    #[test]
    fn test_display_title_falls_back_to_theme() {
        let page: OutlinePage =
            serde_json::from_value(json!({"theme": "Opening", "content": "hi"})).unwrap();
        assert_eq!(page.display_title(), "Opening");

        let page = OutlinePage::new("Agenda", "");
        assert_eq!(page.display_title(), "Agenda");
    }

    #[test]
    fn test_style_page_from_service_shape() {
        let page: StylePage = serde_json::from_value(json!({
            "page": 1,
            "theme": "Cover",
            "design_concept": "Bold navy"
        }))
        .unwrap();
        assert_eq!(page.display_title(), "Cover");
        assert_eq!(page.design_concept, "Bold navy");
        assert!(page.layout.is_empty());
    }

    #[test]
    fn test_outline_request_omits_unset_options() {
        let request = OutlineRequest {
            content: "Q4 sales report".to_string(),
            page_count: Some(5),
            ..OutlineRequest::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"content": "Q4 sales report", "page_count": 5}));
    }

    #[test]
    fn test_file_upload_extension_and_debug() {
        let upload = FileUpload::new("Budget.XLSX", vec![0; 16]);
        assert_eq!(upload.extension().as_deref(), Some("xlsx"));
        assert_eq!(upload.len(), 16);
        let debug = format!("{upload:?}");
        assert!(debug.contains("len: 16"), "bytes are summarised: {debug}");

        assert_eq!(FileUpload::new("README", vec![]).extension(), None);
    }

    #[tokio::test]
    async fn test_file_upload_from_path_uses_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"quarterly").unwrap();

        let upload = FileUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.filename, "notes.txt");
        assert_eq!(upload.bytes, b"quarterly");
    }

    #[test]
    fn test_snapshot_stage_parsing() {
        let snapshot: SessionSnapshot = serde_json::from_value(json!({
            "session_id": "session_1_abc",
            "stage": "style_refine",
            "images": [null, {"filename": "p2.jpg"}]
        }))
        .unwrap();
        assert_eq!(snapshot.stage(), Some(Stage::StyleRefine));
        assert_eq!(snapshot.generated_image_count(), 1);
    }
}
