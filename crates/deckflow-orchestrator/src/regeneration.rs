//! Out-of-sequence regeneration of a single page

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use deckflow_client::GenerationService;
use deckflow_utils::error::{ServiceError, WorkflowError};
use deckflow_utils::types::SessionId;

use crate::pipeline::GeneratedPage;

pub struct RegenerationController {
    service: Arc<dyn GenerationService>,
    session: SessionId,
}

impl RegenerationController {
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>, session: SessionId) -> Self {
        Self { service, session }
    }

    /// Check a regeneration request before anything is sent.
    pub fn validate(page_index: usize, page_count: usize, feedback: &str) -> Result<(), WorkflowError> {
        if feedback.trim().is_empty() {
            return Err(WorkflowError::EmptyFeedback);
        }
        if page_index >= page_count {
            return Err(WorkflowError::PageOutOfRange {
                index: page_index,
                page_count,
            });
        }
        Ok(())
    }

    /// Re-render one page.
    ///
    /// The returned slot carries a fresh timestamp so the new image is never
    /// served from a cache keyed only on the filename.
    pub async fn regenerate(
        &self,
        page_index: usize,
        feedback: &str,
    ) -> Result<GeneratedPage, ServiceError> {
        match self
            .service
            .refine_page(&self.session, page_index, feedback.trim())
            .await
        {
            Ok(filename) => {
                info!(
                    session_id = %self.session,
                    page_index,
                    filename = %filename,
                    "Page regenerated"
                );
                Ok(GeneratedPage::Succeeded {
                    filename,
                    timestamp: Some(Utc::now().timestamp_millis()),
                })
            }
            Err(err) => {
                warn!(
                    session_id = %self.session,
                    page_index,
                    error = %err,
                    "Page regeneration failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, ScriptedService};

    #[test]
    fn test_validate() {
        assert!(RegenerationController::validate(0, 1, "brighter").is_ok());
        assert!(matches!(
            RegenerationController::validate(0, 1, "  "),
            Err(WorkflowError::EmptyFeedback)
        ));
        assert!(matches!(
            RegenerationController::validate(1, 1, "brighter"),
            Err(WorkflowError::PageOutOfRange {
                index: 1,
                page_count: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_success_carries_timestamp() {
        let service = Arc::new(ScriptedService::new());
        service.push_refined_page(Ok("p2_v2.jpg".to_string()));
        let controller =
            RegenerationController::new(service.clone(), SessionId::from_raw("session_1_abc"));

        let before = Utc::now().timestamp_millis();
        let page = controller.regenerate(1, " use a bar chart ").await.unwrap();

        match page {
            GeneratedPage::Succeeded {
                filename,
                timestamp: Some(ts),
            } => {
                assert_eq!(filename, "p2_v2.jpg");
                assert!(ts >= before);
            }
            other => panic!("unexpected slot: {other:?}"),
        }
        assert_eq!(
            service.calls(),
            vec![Call::RefinePage {
                page_index: 1,
                feedback: "use a bar chart".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let service = Arc::new(ScriptedService::new());
        service.push_refined_page(Err(ServiceError::Transport("connection reset".to_string())));
        let controller = RegenerationController::new(service, SessionId::from_raw("s"));

        let err = controller.regenerate(0, "again").await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }
}
