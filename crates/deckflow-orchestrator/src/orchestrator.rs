//! Session workflow facade.
//!
//! [`SessionOrchestrator`] owns every piece of session state behind one
//! mutex and exposes the workflow only through its methods. The lock is
//! never held across a remote call.
//!
//! Two guards keep asynchronous responses honest:
//! - an in-flight marker admits one workflow operation at a time (outline,
//!   style, generation, regeneration); a second one is refused with `Busy`;
//! - every response is checked against the epoch captured before the call
//!   and discarded with `StaleResponse` when the session moved on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{Instrument, Span, info, warn};

use deckflow_client::{
    FileUpload, GenerationService, OutlinePage, OutlineRequest, ServiceDefaults, SessionSnapshot,
    StylePage, SupportDocument,
};
use deckflow_config::Config;
use deckflow_utils::error::{ServiceError, WorkflowError};
use deckflow_utils::logging::stage_span;
use deckflow_utils::types::{MaterialKind, ReferenceKind, SessionId, Stage, TemplateSettings};

use crate::input::{GenerationOptions, RawInput};
use crate::materials::{Material, MaterialStore, SupportDocumentRecord};
use crate::outline_buffer::{EditableOutlineEntry, OutlineEditBuffer};
use crate::pipeline::{GeneratedPage, GenerationPipeline, PageState, PipelineEvent, PipelineSummary};
use crate::regeneration::RegenerationController;
use crate::stage::{Epoch, StageMachine};
use crate::transcript::{Transcript, TranscriptEntry, render_outline, render_style};
use crate::uploads::{UploadState, UploadTarget, UploadTracker};

#[derive(Debug, Clone, Copy)]
struct Limits {
    support_document_max_bytes: u64,
    page_material_max_bytes: u64,
    text_preview_chars: usize,
}

struct SessionState {
    machine: StageMachine,
    buffer: OutlineEditBuffer,
    materials: MaterialStore,
    uploads: UploadTracker,
    transcript: Transcript,
    template: TemplateSettings,
    template_analysis: Option<Value>,
    /// Transcript of the last audio upload, consumed by the next outline generation
    pending_transcript: Option<String>,
    last_input: Option<String>,
    in_flight: Option<&'static str>,
    busy_page: Option<usize>,
}

impl SessionState {
    /// Local edits are refused while a request is outstanding; a confirm in
    /// flight has already taken its snapshot of the buffer.
    fn ensure_idle(&self, operation: &'static str) -> Result<(), WorkflowError> {
        match self.in_flight {
            Some(running) => {
                warn!(operation, running, "Refusing edit while a request is in flight");
                Err(WorkflowError::Busy { operation })
            }
            None => Ok(()),
        }
    }

    fn ensure_current(&self, epoch: Epoch, operation: &'static str) -> Result<(), WorkflowError> {
        if self.machine.epoch() == epoch {
            return Ok(());
        }
        warn!(
            operation,
            expected_stage = %epoch.stage,
            stage = %self.machine.stage(),
            "Discarding response that arrived after the session moved on"
        );
        Err(WorkflowError::StaleResponse { operation })
    }

    /// Log a failed outcome to the transcript and lift it into a workflow error.
    fn settle<T>(&mut self, result: Result<T, ServiceError>, failure: &str) -> Result<T, WorkflowError> {
        result.map_err(|err| {
            self.transcript.assistant(format!("{failure}: {err}"));
            WorkflowError::from(err)
        })
    }

    fn finish_upload<T>(&mut self, ticket: u64, result: &Result<T, ServiceError>) {
        self.uploads
            .complete(ticket, result.as_ref().map(|_| ()).map_err(ToString::to_string));
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight marker when the owning operation ends, however it ends.
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.in_flight = None;
        state.busy_page = None;
    }
}

/// Drives one session from raw input to rendered pages.
pub struct SessionOrchestrator {
    session: SessionId,
    service: Arc<dyn GenerationService>,
    limits: Limits,
    state: Mutex<SessionState>,
}

impl SessionOrchestrator {
    /// Start a new session with a freshly generated identifier.
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>, config: &Config) -> Self {
        Self::with_session(service, config, SessionId::generate())
    }

    #[must_use]
    pub fn with_session(
        service: Arc<dyn GenerationService>,
        config: &Config,
        session: SessionId,
    ) -> Self {
        info!(session_id = %session, "Session created");
        let state = SessionState {
            machine: StageMachine::new(session.clone()),
            buffer: OutlineEditBuffer::default(),
            materials: MaterialStore::default(),
            uploads: UploadTracker::default(),
            transcript: Transcript::default(),
            template: config.template_settings(),
            template_analysis: None,
            pending_transcript: None,
            last_input: None,
            in_flight: None,
            busy_page: None,
        };
        Self {
            session,
            service,
            limits: Limits {
                support_document_max_bytes: config.support_document_max_bytes(),
                page_material_max_bytes: config.page_material_max_bytes(),
                text_preview_chars: config.text_preview_chars(),
            },
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn span(&self, operation: &'static str) -> Span {
        stage_span(self.session.as_str(), self.stage(), operation)
    }

    /// Claim the in-flight marker for a workflow operation.
    fn begin(
        &self,
        operation: &'static str,
        allowed: &[Stage],
    ) -> Result<(InFlightGuard<'_>, Epoch), WorkflowError> {
        let mut state = self.lock();
        if let Some(running) = state.in_flight {
            warn!(operation, running, "Refusing re-entry while a request is in flight");
            return Err(WorkflowError::Busy { operation });
        }
        state.machine.require(operation, allowed)?;
        state.in_flight = Some(operation);
        Ok((InFlightGuard { state: &self.state }, state.machine.epoch()))
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.lock().machine.stage()
    }

    /// Name of the workflow operation currently in flight, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<&'static str> {
        self.lock().in_flight
    }

    #[must_use]
    pub fn outline(&self) -> Vec<OutlinePage> {
        self.lock().machine.outline().to_vec()
    }

    #[must_use]
    pub fn style(&self) -> Vec<StylePage> {
        self.lock().machine.style().to_vec()
    }

    #[must_use]
    pub fn pages(&self) -> Vec<GeneratedPage> {
        self.lock().machine.pages().to_vec()
    }

    /// Presented state of one page slot; `Busy` while it is being regenerated.
    #[must_use]
    pub fn page_state(&self, index: usize) -> Option<PageState> {
        let state = self.lock();
        let page = state.machine.pages().get(index)?;
        if state.busy_page == Some(index) {
            Some(PageState::Busy)
        } else {
            Some(PageState::from(page))
        }
    }

    #[must_use]
    pub fn editable_outline(&self) -> Vec<EditableOutlineEntry> {
        self.lock().buffer.entries().to_vec()
    }

    #[must_use]
    pub fn has_unapplied_edits(&self) -> bool {
        self.lock().buffer.is_dirty()
    }

    #[must_use]
    pub fn materials(&self) -> MaterialStore {
        self.lock().materials.clone()
    }

    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.lock().transcript.entries().to_vec()
    }

    #[must_use]
    pub fn upload_state(&self, target: UploadTarget) -> Option<UploadState> {
        self.lock().uploads.state(target).cloned()
    }

    #[must_use]
    pub fn template_settings(&self) -> TemplateSettings {
        self.lock().template.clone()
    }

    #[must_use]
    pub fn template_analysis(&self) -> Option<Value> {
        self.lock().template_analysis.clone()
    }

    #[must_use]
    pub fn pending_transcript(&self) -> Option<String> {
        self.lock().pending_transcript.clone()
    }

    /// Image URL for a rendered page, cache-busted after regeneration.
    #[must_use]
    pub fn image_url(&self, index: usize) -> Option<String> {
        let state = self.lock();
        match state.machine.pages().get(index)? {
            GeneratedPage::Succeeded {
                filename,
                timestamp,
            } => Some(self.service.image_url(filename, *timestamp)),
            _ => None,
        }
    }

    #[must_use]
    pub fn download_url(&self) -> String {
        self.service.download_url(&self.session)
    }

    #[must_use]
    pub fn pdf_download_url(&self) -> String {
        self.service.pdf_download_url(&self.session)
    }

    // ---------------------------------------------------------------------
    // Local outline edits
    // ---------------------------------------------------------------------

    pub fn edit_title(&self, index: usize, title: impl Into<String>) -> Result<(), WorkflowError> {
        let mut state = self.lock();
        state.machine.require("edit outline", &[Stage::OutlineRefine])?;
        state.ensure_idle("edit outline")?;
        state.buffer.set_title(index, title)
    }

    pub fn edit_content(&self, index: usize, content: impl Into<String>) -> Result<(), WorkflowError> {
        let mut state = self.lock();
        state.machine.require("edit outline", &[Stage::OutlineRefine])?;
        state.ensure_idle("edit outline")?;
        state.buffer.set_content(index, content)
    }

    // ---------------------------------------------------------------------
    // Outline
    // ---------------------------------------------------------------------

    /// Generate a fresh outline.
    ///
    /// In `Input` the combined input must be non-empty. In `OutlineRefine`
    /// blank input regenerates from the previous input. A transcript from an
    /// earlier audio upload is used when `input` carries none.
    pub async fn generate_outline(
        &self,
        input: &RawInput,
        options: &GenerationOptions,
    ) -> Result<Vec<OutlinePage>, WorkflowError> {
        const OP: &str = "generate outline";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::Input, Stage::OutlineRefine])?;

            let (request, used_pending) = {
                let mut state = self.lock();
                let used_pending = input.transcript.is_none() && state.pending_transcript.is_some();
                let raw = RawInput {
                    text: input.text.clone(),
                    transcript: input
                        .transcript
                        .clone()
                        .or_else(|| state.pending_transcript.clone()),
                };
                let content = match (raw.combined(), &state.last_input) {
                    (Some(content), _) => content,
                    (None, Some(last)) if epoch.stage == Stage::OutlineRefine => last.clone(),
                    (None, _) => return Err(WorkflowError::EmptyInput),
                };
                state.transcript.user(content.clone());
                let request = OutlineRequest {
                    content,
                    page_count: options.page_count,
                    page_instructions: options.page_instructions_text(),
                    design_principles: options.design_principles.clone(),
                    template_settings: Some(state.template.clone()),
                };
                (request, used_pending)
            };

            let result = self.service.generate_outline(&self.session, &request).await;

            let mut state = self.lock();
            state.ensure_current(epoch, OP)?;
            let outline = state.settle(result, "Outline generation failed")?;
            state.machine.accept_outline(outline.clone())?;
            state.buffer.reinitialize(&outline);
            state.last_input = Some(request.content);
            if used_pending {
                state.pending_transcript = None;
            }
            state.transcript.assistant(render_outline(&outline));
            info!(pages = outline.len(), "Outline generated");
            Ok(outline)
        }
        .instrument(self.span(OP))
        .await
    }

    /// Ask the service to rework the outline; stays in `OutlineRefine`.
    pub async fn refine_outline(&self, feedback: &str) -> Result<Vec<OutlinePage>, WorkflowError> {
        const OP: &str = "refine outline";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::OutlineRefine])?;
            let feedback = feedback.trim();
            if feedback.is_empty() {
                return Err(WorkflowError::EmptyFeedback);
            }
            self.lock().transcript.user(feedback);

            let result = self.service.refine_outline(&self.session, feedback).await;

            let mut state = self.lock();
            state.ensure_current(epoch, OP)?;
            let outline = state.settle(result, "Outline refinement failed")?;
            state.machine.accept_outline(outline.clone())?;
            state.buffer.reinitialize(&outline);
            state.transcript.assistant(render_outline(&outline));
            Ok(outline)
        }
        .instrument(self.span(OP))
        .await
    }

    /// Push the merged edit buffer to the service and make it authoritative.
    async fn sync_edits(&self, operation: &'static str, epoch: Epoch) -> Result<(), WorkflowError> {
        let (merged, synced) = {
            let state = self.lock();
            (
                state.buffer.merged(state.machine.outline()),
                state.buffer.dirty_indices(),
            )
        };

        let result = self.service.update_outline(&self.session, &merged).await;

        let mut state = self.lock();
        state.ensure_current(epoch, operation)?;
        state.settle(result, "Saving outline edits failed")?;
        state.machine.commit_outline(merged)?;
        state.buffer.mark_applied(&synced);
        Ok(())
    }

    /// Merge local edits into the outline and store them remotely.
    ///
    /// Safe to call any number of times before [`Self::confirm_outline`].
    pub async fn apply_outline_edits(&self) -> Result<(), WorkflowError> {
        const OP: &str = "apply outline edits";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::OutlineRefine])?;
            self.sync_edits(OP, epoch).await?;
            self.lock().transcript.assistant("Outline edits saved");
            Ok(())
        }
        .instrument(self.span(OP))
        .await
    }

    /// Sync edits, confirm the outline and generate the style plan.
    ///
    /// Local edits are always synced first, so confirming without an
    /// explicit apply yields the same authoritative outline as applying
    /// and then confirming. Any failure leaves the stage at `OutlineRefine`.
    pub async fn confirm_outline(&self) -> Result<Vec<StylePage>, WorkflowError> {
        const OP: &str = "confirm outline";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::OutlineRefine])?;
            self.sync_edits(OP, epoch).await?;
            self.lock().transcript.user("Outline confirmed");

            let confirmed = self.service.confirm_outline(&self.session).await;
            {
                let mut state = self.lock();
                state.ensure_current(epoch, OP)?;
                state.settle(confirmed, "Confirming the outline failed")?;
            }

            let result = self.service.generate_style(&self.session).await;

            let mut state = self.lock();
            state.ensure_current(epoch, OP)?;
            let style = state.settle(result, "Style generation failed")?;
            state.machine.accept_style(style.clone())?;
            state.transcript.assistant(render_style(&style));
            info!(pages = style.len(), "Style plan generated");
            Ok(style)
        }
        .instrument(self.span(OP))
        .await
    }

    // ---------------------------------------------------------------------
    // Style
    // ---------------------------------------------------------------------

    /// Ask the service to rework the style plan; stays in `StyleRefine`.
    pub async fn refine_style(&self, feedback: &str) -> Result<Vec<StylePage>, WorkflowError> {
        const OP: &str = "refine style";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::StyleRefine])?;
            let feedback = feedback.trim();
            if feedback.is_empty() {
                return Err(WorkflowError::EmptyFeedback);
            }
            self.lock().transcript.user(feedback);

            let result = self.service.refine_style(&self.session, feedback).await;

            let mut state = self.lock();
            state.ensure_current(epoch, OP)?;
            let style = state.settle(result, "Style refinement failed")?;
            state.machine.accept_style(style.clone())?;
            state.transcript.assistant(render_style(&style));
            Ok(style)
        }
        .instrument(self.span(OP))
        .await
    }

    /// Confirm the style plan and render every page.
    pub async fn confirm_style(&self) -> Result<PipelineSummary, WorkflowError> {
        self.confirm_style_with_observer(&mut |_| {}).await
    }

    /// [`Self::confirm_style`] with a progress observer.
    ///
    /// When the confirm call fails the stage stays at `StyleRefine`. Once
    /// it succeeds the pipeline always runs to `Complete`, whatever the
    /// per-page outcomes.
    pub async fn confirm_style_with_observer(
        &self,
        observer: &mut (dyn FnMut(&PipelineEvent) + Send),
    ) -> Result<PipelineSummary, WorkflowError> {
        const OP: &str = "confirm style";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::StyleRefine])?;
            self.lock().transcript.user("Style confirmed");

            let confirmed = self.service.confirm_style(&self.session).await;

            let page_count = {
                let mut state = self.lock();
                state.ensure_current(epoch, OP)?;
                state.settle(confirmed, "Confirming the style failed")?;
                state.machine.begin_generation()?
            };

            let pipeline = GenerationPipeline::new(Arc::clone(&self.service), self.session.clone());
            let mut record = |event: &PipelineEvent| {
                self.record_pipeline_event(event);
                observer(event);
            };
            let (_, summary) = pipeline.run(page_count, &mut record).await;

            let mut state = self.lock();
            state.machine.complete()?;
            state
                .transcript
                .assistant(format!("Generated {}/{} pages", summary.succeeded, summary.total));
            Ok(summary)
        }
        .instrument(self.span(OP))
        .await
    }

    fn record_pipeline_event(&self, event: &PipelineEvent) {
        let mut state = self.lock();
        let (index, page) = match event {
            PipelineEvent::PageStarted { index, total } => {
                state
                    .transcript
                    .assistant(format!("Generating page {}/{}", index + 1, total));
                return;
            }
            PipelineEvent::PageSucceeded { index, filename } => (
                *index,
                GeneratedPage::Succeeded {
                    filename: filename.clone(),
                    timestamp: None,
                },
            ),
            PipelineEvent::PageFailed { index, message } => {
                state
                    .transcript
                    .assistant(format!("Page {} failed: {message}", index + 1));
                (
                    *index,
                    GeneratedPage::Errored {
                        message: message.clone(),
                    },
                )
            }
            PipelineEvent::Finished(_) => return,
        };
        if let Err(err) = state.machine.record_page(index, page) {
            warn!(page_index = index, error = %err, "Dropping pipeline result");
        }
    }

    // ---------------------------------------------------------------------
    // Regeneration
    // ---------------------------------------------------------------------

    /// Re-render one page with feedback. Only valid in `Complete`.
    ///
    /// Other slots are never touched. On failure the slot keeps its
    /// previous value.
    pub async fn regenerate(&self, page_index: usize, feedback: &str) -> Result<GeneratedPage, WorkflowError> {
        const OP: &str = "regenerate page";
        async {
            let (_guard, epoch) = self.begin(OP, &[Stage::Complete])?;
            {
                let mut state = self.lock();
                RegenerationController::validate(page_index, state.machine.pages().len(), feedback)?;
                state.busy_page = Some(page_index);
                state
                    .transcript
                    .user(format!("Regenerate page {}: {}", page_index + 1, feedback.trim()));
            }

            let controller =
                RegenerationController::new(Arc::clone(&self.service), self.session.clone());
            let result = controller.regenerate(page_index, feedback).await;

            let mut state = self.lock();
            state.ensure_current(epoch, OP)?;
            let page = state.settle(result, &format!("Regenerating page {} failed", page_index + 1))?;
            state.machine.record_page(page_index, page.clone())?;
            state
                .transcript
                .assistant(format!("Page {} regenerated", page_index + 1));
            Ok(page)
        }
        .instrument(self.span(OP))
        .await
    }

    // ---------------------------------------------------------------------
    // Materials
    // ---------------------------------------------------------------------

    /// Upload a document whose text feeds outline generation.
    ///
    /// The returned preview is cut to the configured number of characters.
    pub async fn upload_support_document(&self, file: &FileUpload) -> Result<SupportDocument, WorkflowError> {
        const OP: &str = "upload support document";
        MaterialStore::check_size(self.limits.support_document_max_bytes, file.len())?;
        let ticket = self
            .lock()
            .uploads
            .begin(UploadTarget::SupportDocument, &file.filename, OP)?;

        let result = self.service.upload_support_document(&self.session, file).await;

        let mut state = self.lock();
        state.finish_upload(ticket, &result);
        let mut document = result?;
        state.materials.add_support_document(SupportDocumentRecord {
            filename: document.filename.clone(),
            text_length: document.text_length,
        });
        document.text_preview = document
            .text_preview
            .chars()
            .take(self.limits.text_preview_chars)
            .collect();
        info!(
            session_id = %self.session,
            filename = %document.filename,
            text_length = document.text_length,
            "Support document uploaded"
        );
        Ok(document)
    }

    /// Remove every support document. Irreversible, so the caller must pass
    /// `confirmed = true`.
    pub async fn clear_support_documents(&self, confirmed: bool) -> Result<(), WorkflowError> {
        const OP: &str = "clear support documents";
        if !confirmed {
            return Err(WorkflowError::ConfirmationRequired { operation: OP });
        }
        self.service.clear_support_documents(&self.session).await?;
        self.lock().materials.clear_support_documents();
        Ok(())
    }

    fn check_page_target(&self, operation: &'static str, page_index: usize) -> Result<Epoch, WorkflowError> {
        let state = self.lock();
        state
            .machine
            .require(operation, &[Stage::Input, Stage::OutlineRefine])?;
        let page_count = state.machine.outline().len();
        if page_index >= page_count {
            return Err(WorkflowError::PageOutOfRange {
                index: page_index,
                page_count,
            });
        }
        Ok(state.machine.epoch())
    }

    async fn attach_material(
        &self,
        operation: &'static str,
        page_index: usize,
        label: &str,
        epoch: Epoch,
        request: impl Future<Output = Result<deckflow_client::RemoteMaterial, ServiceError>>,
    ) -> Result<Material, WorkflowError> {
        let ticket = self
            .lock()
            .uploads
            .begin(UploadTarget::PageMaterial(page_index), label, operation)?;

        let result = request.await;

        let mut state = self.lock();
        if state.machine.outline_revision() != epoch.outline_revision {
            let stale = WorkflowError::StaleResponse { operation };
            state.uploads.complete(ticket, Err(stale.to_string()));
            warn!(page_index, "Material arrived after the outline was replaced; discarded");
            return Err(stale);
        }
        state.finish_upload(ticket, &result);
        let material = Material::from(result?);
        state.materials.add(page_index, material.clone());
        Ok(material)
    }

    /// Attach an image or spreadsheet to one outline page.
    pub async fn upload_page_material(
        &self,
        page_index: usize,
        file: &FileUpload,
        description: &str,
    ) -> Result<Material, WorkflowError> {
        const OP: &str = "upload page material";
        let epoch = self.check_page_target(OP, page_index)?;
        let extension = file.extension().unwrap_or_default();
        if MaterialKind::from_extension(&extension).is_none() {
            return Err(WorkflowError::UnsupportedFileType { extension });
        }
        MaterialStore::check_size(self.limits.page_material_max_bytes, file.len())?;

        let request = self
            .service
            .upload_page_material(&self.session, page_index, file, description);
        self.attach_material(OP, page_index, &file.filename, epoch, request)
            .await
    }

    /// Attach pasted table text to one outline page.
    pub async fn add_table_text(
        &self,
        page_index: usize,
        text: &str,
        description: &str,
    ) -> Result<Material, WorkflowError> {
        const OP: &str = "add table text";
        if text.trim().is_empty() {
            return Err(WorkflowError::EmptyTableText);
        }
        let epoch = self.check_page_target(OP, page_index)?;

        let request = self
            .service
            .add_table_text(&self.session, page_index, text, description);
        self.attach_material(OP, page_index, "table text", epoch, request)
            .await
    }

    /// Remove one material; later materials on the page move down by one.
    pub async fn remove_page_material(
        &self,
        page_index: usize,
        material_index: usize,
    ) -> Result<Material, WorkflowError> {
        self.lock().materials.ensure_exists(page_index, material_index)?;
        self.service
            .remove_page_material(&self.session, page_index, material_index)
            .await?;
        self.lock().materials.remove(page_index, material_index)
    }

    /// Resynchronise the local material store from the service's listings.
    pub async fn refresh_materials(&self) -> Result<(), WorkflowError> {
        let documents = self.service.list_support_documents(&self.session).await?;
        let pages = self.service.list_page_materials(&self.session).await?;

        let mut state = self.lock();
        state.materials.replace_support_documents(documents);
        state.materials.replace_pages(pages);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Audio, logo and template
    // ---------------------------------------------------------------------

    /// Transcribe a recording; the transcript is held for the next outline
    /// generation.
    pub async fn upload_audio(&self, file: &FileUpload, speakers: Option<u32>) -> Result<String, WorkflowError> {
        const OP: &str = "upload audio";
        let ticket = self.lock().uploads.begin(UploadTarget::Audio, &file.filename, OP)?;

        let result = self.service.upload_audio(&self.session, file, speakers).await;

        let mut state = self.lock();
        state.finish_upload(ticket, &result);
        let transcript = result?;
        state.pending_transcript = Some(transcript.clone());
        Ok(transcript)
    }

    pub async fn upload_logo(&self, file: &FileUpload) -> Result<(), WorkflowError> {
        const OP: &str = "upload logo";
        let ticket = self.lock().uploads.begin(UploadTarget::Logo, &file.filename, OP)?;

        let result = self.service.upload_logo(&self.session, file).await;

        let mut state = self.lock();
        state.finish_upload(ticket, &result);
        result?;
        state.template.has_logo = true;
        Ok(())
    }

    /// Upload a reference image. A template upload also records the
    /// service's analysis and marks the template as present.
    pub async fn upload_reference(&self, file: &FileUpload, kind: ReferenceKind) -> Result<(), WorkflowError> {
        const OP: &str = "upload reference";
        let ticket = self
            .lock()
            .uploads
            .begin(UploadTarget::Reference, &file.filename, OP)?;

        let result = self.service.upload_reference(&self.session, file, kind).await;

        let mut state = self.lock();
        state.finish_upload(ticket, &result);
        let upload = result?;
        if kind == ReferenceKind::Template {
            state.template.has_template = true;
            state.template_analysis = upload.template_analysis;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Remote inspection
    // ---------------------------------------------------------------------

    pub async fn defaults(&self) -> Result<ServiceDefaults, WorkflowError> {
        Ok(self.service.defaults().await?)
    }

    pub async fn session_snapshot(&self) -> Result<SessionSnapshot, WorkflowError> {
        Ok(self.service.session_snapshot(&self.session).await?)
    }
}
