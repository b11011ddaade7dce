//! JSON bodies exchanged with the generation service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use deckflow_utils::error::ServiceError;
use deckflow_utils::types::MaterialKind;

use crate::types::{
    OutlinePage, OutlineRequest, RemoteMaterial, StylePage, SupportDocumentEntry,
};

/// Common response envelope.
///
/// Most endpoints answer `{success, message, ...}`; read-only endpoints omit
/// `success`, which is treated as success.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Unwrap the body, turning `success: false` into a rejection.
    pub fn into_result(self, operation: &str) -> Result<T, ServiceError> {
        if self.success == Some(false) {
            return Err(ServiceError::Rejected {
                operation: operation.to_string(),
                message: self
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| format!("{operation} failed")),
            });
        }
        Ok(self.body)
    }
}

/// Body of an HTTP error raised by the service (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateOutlineRequest<'a> {
    pub session_id: &'a str,
    #[serde(flatten)]
    pub request: &'a OutlineRequest,
}

/// Style generation reuses the free-text input body with empty content.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateStyleRequest<'a> {
    pub session_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    pub session_id: &'a str,
    pub feedback: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateOutlineRequest<'a> {
    pub session_id: &'a str,
    pub outline_json: &'a [OutlinePage],
}

#[derive(Debug, Serialize)]
pub(crate) struct PageRequest<'a> {
    pub session_id: &'a str,
    pub page_index: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefinePageRequest<'a> {
    pub session_id: &'a str,
    pub page_index: usize,
    pub feedback: &'a str,
}

/// Outline bodies. Refinement may answer `confirmed: true` without an outline
/// when the feedback reads like an approval.
#[derive(Debug, Deserialize)]
pub(crate) struct OutlineBody {
    #[serde(default)]
    pub outline_json: Option<Vec<OutlinePage>>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StyleBody {
    #[serde(default)]
    pub style_json: Option<Vec<StylePage>>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Empty {}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageBody {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefinedImageBody {
    pub image_filename: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptBody {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupportDocumentListBody {
    #[serde(default)]
    pub files: Vec<SupportDocumentEntry>,
    #[serde(default)]
    pub total_text_length: usize,
}

/// Material as the service stores it; `type` is `image`, `table` or `table_text`.
#[derive(Debug, Deserialize)]
pub(crate) struct MaterialBody {
    pub filename: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<MaterialBody> for RemoteMaterial {
    fn from(body: MaterialBody) -> Self {
        Self {
            filename: body.filename,
            kind: MaterialKind::from_service_label(&body.kind),
            description: body.description.unwrap_or_default(),
        }
    }
}

/// Materials keyed by the stringified page index.
#[derive(Debug, Deserialize)]
pub(crate) struct MaterialListBody {
    #[serde(default)]
    pub materials: BTreeMap<String, Vec<MaterialBody>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceBody {
    #[serde(default)]
    pub template_analysis: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_envelope_becomes_rejection_with_message() {
        let envelope: Envelope<OutlineBody> = serde_json::from_value(json!({
            "success": false,
            "message": "大纲生成失败，请重试"
        }))
        .unwrap();

        match envelope.into_result("generate_outline") {
            Err(ServiceError::Rejected { operation, message }) => {
                assert_eq!(operation, "generate_outline");
                assert_eq!(message, "大纲生成失败，请重试");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_success_is_success() {
        let envelope: Envelope<SupportDocumentListBody> =
            serde_json::from_value(json!({"files": [], "total_text_length": 0})).unwrap();
        assert!(envelope.into_result("list_support_documents").is_ok());
    }

    #[test]
    fn test_rejection_without_message_names_operation() {
        let envelope: Envelope<Empty> =
            serde_json::from_value(json!({"success": false, "message": ""})).unwrap();
        let err = envelope.into_result("confirm_style").unwrap_err();
        assert_eq!(err.to_string(), "confirm_style rejected: confirm_style failed");
    }

    #[test]
    fn test_generate_outline_body_flattens_options() {
        let request = OutlineRequest {
            content: "Q4".to_string(),
            page_instructions: Some("第1页: cover".to_string()),
            ..OutlineRequest::default()
        };
        let body = GenerateOutlineRequest {
            session_id: "session_1_x",
            request: &request,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"session_id": "session_1_x", "content": "Q4", "page_instructions": "第1页: cover"})
        );
    }

    #[test]
    fn test_material_labels_are_normalised() {
        let body: MaterialListBody = serde_json::from_value(json!({
            "success": true,
            "materials": {
                "0": [{"filename": "chart.png", "type": "image", "description": "hero"}],
                "2": [
                    {"filename": "q4.xlsx", "type": "table", "table_text": "a,b"},
                    {"filename": "粘贴的表格_1", "type": "table_text", "description": ""}
                ]
            }
        }))
        .unwrap();

        let page_two: Vec<RemoteMaterial> = body.materials["2"]
            .iter()
            .map(|m| {
                RemoteMaterial::from(MaterialBody {
                    filename: m.filename.clone(),
                    kind: m.kind.clone(),
                    description: m.description.clone(),
                })
            })
            .collect();
        assert_eq!(page_two[0].kind, MaterialKind::TableFile);
        assert_eq!(page_two[1].kind, MaterialKind::TableText);
        assert_eq!(page_two[0].description, "");
    }

    #[test]
    fn test_error_detail_message() {
        let detail: ErrorDetail = serde_json::from_value(json!({"detail": "页码超出范围"})).unwrap();
        assert_eq!(detail.message(), "页码超出范围");

        let detail: ErrorDetail =
            serde_json::from_value(json!({"detail": [{"loc": ["body"], "msg": "field required"}]}))
                .unwrap();
        assert!(detail.message().contains("field required"));
    }
}
