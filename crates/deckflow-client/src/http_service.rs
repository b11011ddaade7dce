//! reqwest-backed implementation of [`GenerationService`]

use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, instrument};

use deckflow_config::Config;
use deckflow_utils::error::ServiceError;
use deckflow_utils::types::{MaterialKind, ReferenceKind, SessionId};

use crate::http_client::{HttpClient, Idempotency};
use crate::types::{
    FileUpload, GenerationService, OutlinePage, OutlineRequest, PageMaterialListing,
    ReferenceUpload, RemoteMaterial, ServiceDefaults, SessionSnapshot, StylePage,
    SupportDocument, SupportDocumentListing,
};
use crate::wire::{
    Empty, Envelope, FeedbackRequest, GenerateOutlineRequest, GenerateStyleRequest, ImageBody,
    MaterialBody, MaterialListBody, OutlineBody, PageRequest, ReferenceBody, RefinePageRequest,
    RefinedImageBody, SessionRequest, StyleBody, SupportDocumentListBody, TranscriptBody,
    UpdateOutlineRequest,
};

/// HTTP client for the generation service.
///
/// All endpoints are addressed relative to one base URL (for example
/// `http://localhost:8004/api`).
#[derive(Clone)]
pub struct HttpGenerationService {
    http: HttpClient,
    base_url: Url,
}

impl HttpGenerationService {
    /// Create a service handle for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Misconfiguration` if the URL is not an absolute
    /// http(s) URL or the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ServiceError::Misconfiguration(format!("Invalid service URL '{base_url}': {e}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ServiceError::Misconfiguration(format!(
                "Service URL '{base_url}' must be an absolute http(s) URL"
            )));
        }

        Ok(Self {
            http: HttpClient::new(request_timeout, connect_timeout, max_retries)?,
            base_url,
        })
    }

    /// Create a service handle from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Misconfiguration` if the configured URL is unusable.
    pub fn new_from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(
            &config.service_base_url(),
            config.request_timeout(),
            config.connect_timeout(),
            config.max_retries(),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn endpoint_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint(segments);
        url.query_pairs_mut().extend_pairs(query);
        url
    }

    async fn post_json<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        operation: &str,
    ) -> Result<T, ServiceError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let request = self.http.inner().post(self.endpoint(segments)).json(body);
        let envelope: Envelope<T> = self
            .http
            .send_json(request, operation, Idempotency::Once)
            .await?;
        envelope.into_result(operation)
    }

    async fn post_multipart<T>(&self, url: Url, form: Form, operation: &str) -> Result<T, ServiceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = self.http.inner().post(url).multipart(form);
        let envelope: Envelope<T> = self
            .http
            .send_json(request, operation, Idempotency::Once)
            .await?;
        envelope.into_result(operation)
    }

    async fn get<T>(&self, url: Url, operation: &str) -> Result<T, ServiceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = self.http.inner().get(url);
        let envelope: Envelope<T> = self
            .http
            .send_json(request, operation, Idempotency::Retryable)
            .await?;
        envelope.into_result(operation)
    }

    async fn delete(&self, url: Url, operation: &str) -> Result<(), ServiceError> {
        let request = self.http.inner().delete(url);
        let envelope: Envelope<Empty> = self
            .http
            .send_json(request, operation, Idempotency::Retryable)
            .await?;
        envelope.into_result(operation).map(|_| ())
    }
}

fn file_part(file: &FileUpload) -> Part {
    Part::bytes(file.bytes.clone()).file_name(file.filename.clone())
}

fn require_outline(body: OutlineBody, operation: &str) -> Result<Vec<OutlinePage>, ServiceError> {
    match body.outline_json {
        Some(outline) => Ok(outline),
        None if body.confirmed => Err(ServiceError::Rejected {
            operation: operation.to_string(),
            message: "feedback was taken as an approval; confirm the outline instead".to_string(),
        }),
        None => Err(ServiceError::Decode(format!("{operation}: response has no outline_json"))),
    }
}

fn require_style(body: StyleBody, operation: &str) -> Result<Vec<StylePage>, ServiceError> {
    match body.style_json {
        Some(style) => Ok(style),
        None if body.confirmed => Err(ServiceError::Rejected {
            operation: operation.to_string(),
            message: "feedback was taken as an approval; confirm the style instead".to_string(),
        }),
        None => Err(ServiceError::Decode(format!("{operation}: response has no style_json"))),
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    #[instrument(skip_all, fields(session_id = %session, operation = "generate_outline"))]
    async fn generate_outline(
        &self,
        session: &SessionId,
        request: &OutlineRequest,
    ) -> Result<Vec<OutlinePage>, ServiceError> {
        let body = GenerateOutlineRequest {
            session_id: session.as_str(),
            request,
        };
        let response: OutlineBody = self
            .post_json(&["outline", "generate"], &body, "generate_outline")
            .await?;
        require_outline(response, "generate_outline")
    }

    #[instrument(skip_all, fields(session_id = %session, operation = "refine_outline"))]
    async fn refine_outline(
        &self,
        session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<OutlinePage>, ServiceError> {
        let body = FeedbackRequest {
            session_id: session.as_str(),
            feedback,
        };
        let response: OutlineBody = self
            .post_json(&["outline", "refine"], &body, "refine_outline")
            .await?;
        require_outline(response, "refine_outline")
    }

    #[instrument(skip_all, fields(session_id = %session, pages = outline.len()))]
    async fn update_outline(
        &self,
        session: &SessionId,
        outline: &[OutlinePage],
    ) -> Result<(), ServiceError> {
        let body = UpdateOutlineRequest {
            session_id: session.as_str(),
            outline_json: outline,
        };
        let _: Empty = self
            .post_json(&["outline", "update"], &body, "update_outline")
            .await?;
        Ok(())
    }

    async fn confirm_outline(&self, session: &SessionId) -> Result<(), ServiceError> {
        let body = SessionRequest {
            session_id: session.as_str(),
        };
        let _: Empty = self
            .post_json(&["outline", "confirm"], &body, "confirm_outline")
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(session_id = %session, operation = "generate_style"))]
    async fn generate_style(&self, session: &SessionId) -> Result<Vec<StylePage>, ServiceError> {
        let body = GenerateStyleRequest {
            session_id: session.as_str(),
            content: "",
        };
        let response: StyleBody = self
            .post_json(&["style", "generate"], &body, "generate_style")
            .await?;
        require_style(response, "generate_style")
    }

    #[instrument(skip_all, fields(session_id = %session, operation = "refine_style"))]
    async fn refine_style(
        &self,
        session: &SessionId,
        feedback: &str,
    ) -> Result<Vec<StylePage>, ServiceError> {
        let body = FeedbackRequest {
            session_id: session.as_str(),
            feedback,
        };
        let response: StyleBody = self
            .post_json(&["style", "refine"], &body, "refine_style")
            .await?;
        require_style(response, "refine_style")
    }

    async fn confirm_style(&self, session: &SessionId) -> Result<(), ServiceError> {
        let body = SessionRequest {
            session_id: session.as_str(),
        };
        let _: Empty = self
            .post_json(&["style", "confirm"], &body, "confirm_style")
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(session_id = %session, page_index = page_index))]
    async fn generate_image(
        &self,
        session: &SessionId,
        page_index: usize,
    ) -> Result<String, ServiceError> {
        let body = PageRequest {
            session_id: session.as_str(),
            page_index,
        };
        let response: ImageBody = self
            .post_json(&["image", "generate"], &body, "generate_image")
            .await?;
        Ok(response.filename)
    }

    #[instrument(skip_all, fields(session_id = %session, page_index = page_index))]
    async fn refine_page(
        &self,
        session: &SessionId,
        page_index: usize,
        feedback: &str,
    ) -> Result<String, ServiceError> {
        let body = RefinePageRequest {
            session_id: session.as_str(),
            page_index,
            feedback,
        };
        let response: RefinedImageBody = self
            .post_json(&["page", "refine-and-regenerate"], &body, "refine_page")
            .await?;
        Ok(response.image_filename)
    }

    #[instrument(skip_all, fields(session_id = %session, filename = %file.filename))]
    async fn upload_support_document(
        &self,
        session: &SessionId,
        file: &FileUpload,
    ) -> Result<SupportDocument, ServiceError> {
        let form = Form::new()
            .text("session_id", session.as_str().to_string())
            .part("file", file_part(file));
        self.post_multipart(
            self.endpoint(&["support-doc", "upload"]),
            form,
            "upload_support_document",
        )
        .await
    }

    async fn clear_support_documents(&self, session: &SessionId) -> Result<(), ServiceError> {
        let url =
            self.endpoint_with_query(&["support-doc", "clear"], &[("session_id", session.as_str())]);
        self.delete(url, "clear_support_documents").await
    }

    async fn list_support_documents(
        &self,
        session: &SessionId,
    ) -> Result<SupportDocumentListing, ServiceError> {
        let url = self.endpoint(&["support-doc", "list", session.as_str()]);
        let body: SupportDocumentListBody = self.get(url, "list_support_documents").await?;
        Ok(SupportDocumentListing {
            files: body.files,
            total_text_length: body.total_text_length,
        })
    }

    #[instrument(skip_all, fields(session_id = %session, page_index = page_index, filename = %file.filename))]
    async fn upload_page_material(
        &self,
        session: &SessionId,
        page_index: usize,
        file: &FileUpload,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError> {
        let form = Form::new()
            .text("session_id", session.as_str().to_string())
            .text("page_index", page_index.to_string())
            .part("file", file_part(file))
            .text("description", description.to_string());
        let body: MaterialBody = self
            .post_multipart(
                self.endpoint(&["page-material", "upload"]),
                form,
                "upload_page_material",
            )
            .await?;
        Ok(RemoteMaterial::from(body))
    }

    #[instrument(skip_all, fields(session_id = %session, page_index = page_index))]
    async fn add_table_text(
        &self,
        session: &SessionId,
        page_index: usize,
        text: &str,
        description: &str,
    ) -> Result<RemoteMaterial, ServiceError> {
        let form = Form::new()
            .text("session_id", session.as_str().to_string())
            .text("page_index", page_index.to_string())
            .text("table_text", text.to_string())
            .text("description", description.to_string());
        let body: MaterialBody = self
            .post_multipart(
                self.endpoint(&["page-material", "add-table-text"]),
                form,
                "add_table_text",
            )
            .await?;
        let mut material = RemoteMaterial::from(body);
        material.kind = MaterialKind::TableText;
        Ok(material)
    }

    async fn remove_page_material(
        &self,
        session: &SessionId,
        page_index: usize,
        material_index: usize,
    ) -> Result<(), ServiceError> {
        let page = page_index.to_string();
        let material = material_index.to_string();
        let url = self.endpoint_with_query(
            &["page-material", "remove"],
            &[
                ("session_id", session.as_str()),
                ("page_index", &page),
                ("material_index", &material),
            ],
        );
        self.delete(url, "remove_page_material").await
    }

    async fn list_page_materials(
        &self,
        session: &SessionId,
    ) -> Result<PageMaterialListing, ServiceError> {
        let url = self.endpoint(&["page-material", "list", session.as_str()]);
        let body: MaterialListBody = self.get(url, "list_page_materials").await?;

        let mut listing = PageMaterialListing::new();
        for (key, materials) in body.materials {
            let Ok(page_index) = key.parse::<usize>() else {
                debug!(key = %key, "Ignoring material group with non-numeric page key");
                continue;
            };
            listing.insert(
                page_index,
                materials.into_iter().map(RemoteMaterial::from).collect(),
            );
        }
        Ok(listing)
    }

    #[instrument(skip_all, fields(session_id = %session, filename = %file.filename, speakers = ?speakers))]
    async fn upload_audio(
        &self,
        session: &SessionId,
        file: &FileUpload,
        speakers: Option<u32>,
    ) -> Result<String, ServiceError> {
        let mut form = Form::new()
            .text("session_id", session.as_str().to_string())
            .part("file", file_part(file));
        if let Some(speakers) = speakers {
            form = form.text("num_speaker", speakers.to_string());
        }
        let body: TranscriptBody = self
            .post_multipart(self.endpoint(&["audio", "upload"]), form, "upload_audio")
            .await?;
        Ok(body.transcript)
    }

    async fn upload_logo(&self, session: &SessionId, file: &FileUpload) -> Result<(), ServiceError> {
        let form = Form::new().part("file", file_part(file));
        let url = self.endpoint_with_query(&["logo", "upload"], &[("session_id", session.as_str())]);
        let _: Empty = self.post_multipart(url, form, "upload_logo").await?;
        Ok(())
    }

    async fn upload_reference(
        &self,
        session: &SessionId,
        file: &FileUpload,
        kind: ReferenceKind,
    ) -> Result<ReferenceUpload, ServiceError> {
        let form = Form::new().part("file", file_part(file));
        let kind_label = kind.to_string();
        let url = self.endpoint_with_query(
            &["reference", "upload"],
            &[("session_id", session.as_str()), ("type", &kind_label)],
        );
        let body: ReferenceBody = self.post_multipart(url, form, "upload_reference").await?;
        Ok(ReferenceUpload {
            kind,
            template_analysis: body.template_analysis.filter(|value| !value.is_null()),
        })
    }

    async fn defaults(&self) -> Result<ServiceDefaults, ServiceError> {
        self.get(self.endpoint(&["defaults"]), "defaults").await
    }

    async fn session_snapshot(&self, session: &SessionId) -> Result<SessionSnapshot, ServiceError> {
        self.get(self.endpoint(&["session", session.as_str()]), "session_snapshot")
            .await
    }

    fn image_url(&self, filename: &str, timestamp: Option<i64>) -> String {
        let mut url = self.endpoint(&["image", filename]);
        if let Some(timestamp) = timestamp {
            url.query_pairs_mut()
                .append_pair("t", &timestamp.to_string());
        }
        url.to_string()
    }

    fn download_url(&self, session: &SessionId) -> String {
        self.endpoint(&["download", session.as_str()]).to_string()
    }

    fn pdf_download_url(&self, session: &SessionId) -> String {
        self.endpoint(&["download", session.as_str(), "pdf"])
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpGenerationService {
        HttpGenerationService::new(base, Duration::from_secs(5), Duration::from_secs(1), 0)
            .unwrap()
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let err = HttpGenerationService::new(
            "/api",
            Duration::from_secs(5),
            Duration::from_secs(1),
            0,
        )
        .err()
        .expect("relative URL must be rejected");
        assert!(matches!(err, ServiceError::Misconfiguration(_)));

        assert!(
            HttpGenerationService::new(
                "ftp://files.example.com/api",
                Duration::from_secs(5),
                Duration::from_secs(1),
                0
            )
            .is_err()
        );
    }

    #[test]
    fn test_endpoint_joins_segments_under_base_path() {
        let svc = service("http://localhost:8004/api/");
        assert_eq!(
            svc.endpoint(&["outline", "generate"]).as_str(),
            "http://localhost:8004/api/outline/generate"
        );
    }

    #[test]
    fn test_image_url_encodes_filename_and_appends_timestamp() {
        let svc = service("http://localhost:8004/api");
        let url = svc.image_url("session_1_abc_第3页.jpg", Some(1_700_000_000_123));
        assert_eq!(
            url,
            "http://localhost:8004/api/image/session_1_abc_%E7%AC%AC3%E9%A1%B5.jpg?t=1700000000123"
        );

        let url = svc.image_url("a/b c.jpg", None);
        assert_eq!(url, "http://localhost:8004/api/image/a%2Fb%20c.jpg");
    }

    #[test]
    fn test_download_urls() {
        let svc = service("https://slides.example.com/api");
        let session = SessionId::from_raw("session_42_abcdefghi");
        assert_eq!(
            svc.download_url(&session),
            "https://slides.example.com/api/download/session_42_abcdefghi"
        );
        assert_eq!(
            svc.pdf_download_url(&session),
            "https://slides.example.com/api/download/session_42_abcdefghi/pdf"
        );
    }

    #[test]
    fn test_query_endpoints() {
        let svc = service("http://localhost:8004/api");
        let url = svc.endpoint_with_query(
            &["page-material", "remove"],
            &[("session_id", "s1"), ("page_index", "2"), ("material_index", "0")],
        );
        assert_eq!(
            url.as_str(),
            "http://localhost:8004/api/page-material/remove?session_id=s1&page_index=2&material_index=0"
        );
    }

    #[test]
    fn test_new_from_config_uses_resolved_base_url() {
        let config = Config::minimal_for_testing();
        let svc = HttpGenerationService::new_from_config(&config).unwrap();
        assert_eq!(svc.base_url().as_str(), "http://localhost:8004/api");
    }

    #[test]
    fn test_confirmed_refinement_without_outline_is_rejected() {
        let body = OutlineBody {
            outline_json: None,
            confirmed: true,
        };
        let err = require_outline(body, "refine_outline").unwrap_err();
        assert!(err.is_rejection(), "got {err:?}");
    }
}
