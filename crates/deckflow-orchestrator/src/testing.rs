//! Scripted in-memory [`GenerationService`] for tests
//!
//! Every call is recorded in order. Responses come from per-operation
//! queues; when a queue is empty a plausible default answer is produced,
//! except for outline generation and refinement which must be scripted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use deckflow_client::{
    FileUpload, GenerationService, OutlinePage, OutlineRequest, PageMaterialListing,
    ReferenceUpload, RemoteMaterial, ServiceDefaults, SessionSnapshot, StylePage,
    SupportDocument, SupportDocumentListing,
};
use deckflow_utils::error::ServiceError;
use deckflow_utils::types::{MaterialKind, ReferenceKind, SessionId};

/// One recorded service call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GenerateOutline { request: OutlineRequest },
    RefineOutline { feedback: String },
    UpdateOutline { outline: Vec<OutlinePage> },
    ConfirmOutline,
    GenerateStyle,
    RefineStyle { feedback: String },
    ConfirmStyle,
    GenerateImage { page_index: usize },
    RefinePage { page_index: usize, feedback: String },
    UploadSupportDocument { filename: String },
    ClearSupportDocuments,
    ListSupportDocuments,
    UploadPageMaterial { page_index: usize, filename: String, description: String },
    AddTableText { page_index: usize, text: String, description: String },
    RemovePageMaterial { page_index: usize, material_index: usize },
    ListPageMaterials,
    UploadAudio { filename: String, speakers: Option<u32> },
    UploadLogo { filename: String },
    UploadReference { filename: String, kind: ReferenceKind },
    Defaults,
    SessionSnapshot,
}

impl Call {
    /// Operation name used by [`ScriptedService::hold`].
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::GenerateOutline { .. } => "generate_outline",
            Self::RefineOutline { .. } => "refine_outline",
            Self::UpdateOutline { .. } => "update_outline",
            Self::ConfirmOutline => "confirm_outline",
            Self::GenerateStyle => "generate_style",
            Self::RefineStyle { .. } => "refine_style",
            Self::ConfirmStyle => "confirm_style",
            Self::GenerateImage { .. } => "generate_image",
            Self::RefinePage { .. } => "refine_page",
            Self::UploadSupportDocument { .. } => "upload_support_document",
            Self::ClearSupportDocuments => "clear_support_documents",
            Self::ListSupportDocuments => "list_support_documents",
            Self::UploadPageMaterial { .. } => "upload_page_material",
            Self::AddTableText { .. } => "add_table_text",
            Self::RemovePageMaterial { .. } => "remove_page_material",
            Self::ListPageMaterials => "list_page_materials",
            Self::UploadAudio { .. } => "upload_audio",
            Self::UploadLogo { .. } => "upload_logo",
            Self::UploadReference { .. } => "upload_reference",
            Self::Defaults => "defaults",
            Self::SessionSnapshot => "session_snapshot",
        }
    }
}

/// Suspends one call until released.
///
/// `entered` is signalled once the call has been recorded; the call then
/// waits for `release`.
#[derive(Debug, Clone)]
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Scripted outcome of one call.
pub type Reply<T> = Result<T, ServiceError>;

#[derive(Default)]
struct Script {
    outlines: VecDeque<Reply<Vec<OutlinePage>>>,
    styles: VecDeque<Reply<Vec<StylePage>>>,
    images: VecDeque<Reply<String>>,
    refined_pages: VecDeque<Reply<String>>,
    acks: HashMap<&'static str, VecDeque<Reply<()>>>,
    support_documents: VecDeque<Reply<SupportDocument>>,
    materials: VecDeque<Reply<RemoteMaterial>>,
    material_listings: VecDeque<Reply<PageMaterialListing>>,
    transcripts: VecDeque<Reply<String>>,
    last_outline_len: usize,
}

#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
    holds: Mutex<HashMap<&'static str, Hold>>,
}

fn scripted_rejection(operation: &str) -> ServiceError {
    ServiceError::Rejected {
        operation: operation.to_string(),
        message: "no scripted response".to_string(),
    }
}

/// `n` outline pages titled `Page 1..=n`.
#[must_use]
pub fn sample_outline(n: usize) -> Vec<OutlinePage> {
    (1..=n)
        .map(|i| OutlinePage::new(format!("Page {i}"), format!("Content of page {i}")))
        .collect()
}

/// `n` style pages aligned with [`sample_outline`].
#[must_use]
pub fn sample_style(n: usize) -> Vec<StylePage> {
    (1..=n)
        .map(|i| StylePage {
            title: format!("Page {i}"),
            design_concept: format!("Concept {i}"),
            layout: "centered".to_string(),
            ..StylePage::default()
        })
        .collect()
}

impl ScriptedService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_outline(&self, reply: Reply<Vec<OutlinePage>>) {
        self.script().outlines.push_back(reply);
    }

    pub fn push_style(&self, reply: Reply<Vec<StylePage>>) {
        self.script().styles.push_back(reply);
    }

    pub fn push_image(&self, reply: Reply<String>) {
        self.script().images.push_back(reply);
    }

    pub fn push_refined_page(&self, reply: Reply<String>) {
        self.script().refined_pages.push_back(reply);
    }

    /// Queue the reply of a unit-returning operation such as
    /// `"update_outline"`, `"confirm_outline"` or `"confirm_style"`.
    pub fn push_ack(&self, operation: &'static str, reply: Reply<()>) {
        self.script().acks.entry(operation).or_default().push_back(reply);
    }

    pub fn push_support_document(&self, reply: Reply<SupportDocument>) {
        self.script().support_documents.push_back(reply);
    }

    pub fn push_material(&self, reply: Reply<RemoteMaterial>) {
        self.script().materials.push_back(reply);
    }

    pub fn push_material_listing(&self, reply: Reply<PageMaterialListing>) {
        self.script().material_listings.push_back(reply);
    }

    pub fn push_transcript(&self, reply: Reply<String>) {
        self.script().transcripts.push_back(reply);
    }

    /// Suspend the next call to `operation` until the returned hold is released.
    pub fn hold(&self, operation: &'static str) -> Hold {
        let hold = Hold {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        self.holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, hold.clone());
        hold
    }

    /// Calls in the order they were received.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded calls to `operation`.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    async fn record(&self, call: Call) {
        let operation = call.operation();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        let hold = self
            .holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation);
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
    }

    fn ack(&self, operation: &'static str) -> Reply<()> {
        self.script()
            .acks
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }

    fn outline_reply(&self, operation: &str) -> Reply<Vec<OutlinePage>> {
        let mut script = self.script();
        let reply = script
            .outlines
            .pop_front()
            .unwrap_or_else(|| Err(scripted_rejection(operation)));
        if let Ok(outline) = &reply {
            script.last_outline_len = outline.len();
        }
        reply
    }

    fn style_reply(&self) -> Reply<Vec<StylePage>> {
        let mut script = self.script();
        let len = script.last_outline_len;
        script
            .styles
            .pop_front()
            .unwrap_or_else(|| Ok(sample_style(len)))
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate_outline(
        &self,
        _session: &SessionId,
        request: &OutlineRequest,
    ) -> Result<Vec<OutlinePage>, ServiceError> {
        self.record(Call::GenerateOutline {
            request: request.clone(),
        })
        .await;
        self.outline_reply("generate outline")
    }

    async fn refine_outline(
        &self,
        _session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<OutlinePage>, ServiceError> {
        self.record(Call::RefineOutline {
            feedback: feedback.to_string(),
        })
        .await;
        self.outline_reply("refine outline")
    }

    async fn update_outline(
        &self,
        _session: &SessionId,
        outline: &[OutlinePage],
    ) -> Result<(), ServiceError> {
        self.record(Call::UpdateOutline {
            outline: outline.to_vec(),
        })
        .await;
        let reply = self.ack("update_outline");
        if reply.is_ok() {
            self.script().last_outline_len = outline.len();
        }
        reply
    }

    async fn confirm_outline(&self, _session: &SessionId) -> Result<(), ServiceError> {
        self.record(Call::ConfirmOutline).await;
        self.ack("confirm_outline")
    }

    async fn generate_style(&self, _session: &SessionId) -> Result<Vec<StylePage>, ServiceError> {
        self.record(Call::GenerateStyle).await;
        self.style_reply()
    }

    async fn refine_style(
        &self,
        _session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<StylePage>, ServiceError> {
        self.record(Call::RefineStyle {
            feedback: feedback.to_string(),
        })
        .await;
        self.style_reply()
    }

    async fn confirm_style(&self, _session: &SessionId) -> Result<(), ServiceError> {
        self.record(Call::ConfirmStyle).await;
        self.ack("confirm_style")
    }

    async fn generate_image(
        &self,
        session: &SessionId,
        page_index: usize,
    ) -> Result<String, ServiceError> {
        self.record(Call::GenerateImage { page_index }).await;
        self.script()
            .images
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{session}_第{}页.jpg", page_index + 1)))
    }

    async fn refine_page(
        &self,
        session: &SessionId,
        page_index: usize,
        feedback: &str,
    ) -> Result<String, ServiceError> {
        self.record(Call::RefinePage {
            page_index,
            feedback: feedback.to_string(),
        })
        .await;
        self.script()
            .refined_pages
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{session}_第{}页_refined.jpg", page_index + 1)))
    }

    async fn upload_support_document(
        &self,
        _session: &SessionId,
        file: &FileUpload,
    ) -> Result<SupportDocument, ServiceError> {
        self.record(Call::UploadSupportDocument {
            filename: file.filename.clone(),
        })
        .await;
        self.script().support_documents.pop_front().unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&file.bytes).into_owned();
            Ok(SupportDocument {
                filename: file.filename.clone(),
                text_length: text.chars().count(),
                text_preview: text,
            })
        })
    }

    async fn clear_support_documents(&self, _session: &SessionId) -> Result<(), ServiceError> {
        self.record(Call::ClearSupportDocuments).await;
        self.ack("clear_support_documents")
    }

    async fn list_support_documents(
        &self,
        _session: &SessionId,
    ) -> Result<SupportDocumentListing, ServiceError> {
        self.record(Call::ListSupportDocuments).await;
        Ok(SupportDocumentListing::default())
    }

    async fn upload_page_material(
        &self,
        _session: &SessionId,
        page_index: usize,
        file: &FileUpload,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError> {
        self.record(Call::UploadPageMaterial {
            page_index,
            filename: file.filename.clone(),
            description: description.to_string(),
        })
        .await;
        self.script().materials.pop_front().unwrap_or_else(|| {
            let kind = file
                .extension()
                .and_then(|ext| MaterialKind::from_extension(&ext))
                .unwrap_or(MaterialKind::Image);
            Ok(RemoteMaterial {
                filename: file.filename.clone(),
                kind,
                description: description.to_string(),
            })
        })
    }

    async fn add_table_text(
        &self,
        _session: &SessionId,
        page_index: usize,
        text: &str,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError> {
        self.record(Call::AddTableText {
            page_index,
            text: text.to_string(),
            description: description.to_string(),
        })
        .await;
        self.script().materials.pop_front().unwrap_or_else(|| {
            Ok(RemoteMaterial {
                filename: format!("table_text_{}.txt", page_index + 1),
                kind: MaterialKind::TableText,
                description: description.to_string(),
            })
        })
    }

    async fn remove_page_material(
        &self,
        _session: &SessionId,
        page_index: usize,
        material_index: usize,
    ) -> Result<(), ServiceError> {
        self.record(Call::RemovePageMaterial {
            page_index,
            material_index,
        })
        .await;
        self.ack("remove_page_material")
    }

    async fn list_page_materials(
        &self,
        _session: &SessionId,
    ) -> Result<PageMaterialListing, ServiceError> {
        self.record(Call::ListPageMaterials).await;
        self.script()
            .material_listings
            .pop_front()
            .unwrap_or_else(|| Ok(PageMaterialListing::new()))
    }

    async fn upload_audio(
        &self,
        _session: &SessionId,
        file: &FileUpload,
        speakers: Option<u32>,
    ) -> Result<String, ServiceError> {
        self.record(Call::UploadAudio {
            filename: file.filename.clone(),
            speakers,
        })
        .await;
        self.script()
            .transcripts
            .pop_front()
            .unwrap_or_else(|| Ok(format!("transcript of {}", file.filename)))
    }

    async fn upload_logo(&self, _session: &SessionId, file: &FileUpload) -> Result<(), ServiceError> {
        self.record(Call::UploadLogo {
            filename: file.filename.clone(),
        })
        .await;
        self.ack("upload_logo")
    }

    async fn upload_reference(
        &self,
        _session: &SessionId,
        file: &FileUpload,
        kind: ReferenceKind,
    ) -> Result<ReferenceUpload, ServiceError> {
        self.record(Call::UploadReference {
            filename: file.filename.clone(),
            kind,
        })
        .await;
        self.ack("upload_reference")?;
        let template_analysis = (kind == ReferenceKind::Template)
            .then(|| serde_json::json!({ "primary_color": "#1C2662" }));
        Ok(ReferenceUpload {
            kind,
            template_analysis,
        })
    }

    async fn defaults(&self) -> Result<ServiceDefaults, ServiceError> {
        self.record(Call::Defaults).await;
        Ok(ServiceDefaults {
            design_principles: "One idea per page".to_string(),
        })
    }

    async fn session_snapshot(&self, session: &SessionId) -> Result<SessionSnapshot, ServiceError> {
        self.record(Call::SessionSnapshot).await;
        Ok(SessionSnapshot {
            session_id: session.to_string(),
            stage: "input".to_string(),
            outline: Vec::new(),
            style: Vec::new(),
            images: Vec::new(),
            messages: Vec::new(),
            audio_transcript: String::new(),
        })
    }

    fn image_url(&self, filename: &str, timestamp: Option<i64>) -> String {
        match timestamp {
            Some(t) => format!("http://scripted/images/{filename}?t={t}"),
            None => format!("http://scripted/images/{filename}"),
        }
    }

    fn download_url(&self, session: &SessionId) -> String {
        format!("http://scripted/download/{session}")
    }

    fn pdf_download_url(&self, session: &SessionId) -> String {
        format!("http://scripted/download/{session}/pdf")
    }
}
