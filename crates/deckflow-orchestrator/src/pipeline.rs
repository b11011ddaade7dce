//! Sequential per-page image generation
//!
//! Pages are rendered one request at a time in increasing index order. A
//! failed page is recorded and the run continues with the next one; nothing
//! is retried here.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use deckflow_client::GenerationService;
use deckflow_utils::logging::log_pipeline_summary;
use deckflow_utils::types::SessionId;

/// Resting state of one generated-page slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GeneratedPage {
    #[default]
    Empty,
    Succeeded {
        filename: String,
        /// Unix millis of the last regeneration, used to bust image caches
        timestamp: Option<i64>,
    },
    Errored {
        message: String,
    },
}

impl GeneratedPage {
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Succeeded { filename, .. } => Some(filename),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Slot state as presented, including the transient busy marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Empty,
    Succeeded,
    Errored,
    Busy,
}

impl From<&GeneratedPage> for PageState {
    fn from(page: &GeneratedPage) -> Self {
        match page {
            GeneratedPage::Empty => Self::Empty,
            GeneratedPage::Succeeded { .. } => Self::Succeeded,
            GeneratedPage::Errored { .. } => Self::Errored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl PipelineSummary {
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.succeeded == self.total
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

/// Progress notifications, emitted in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    PageStarted { index: usize, total: usize },
    PageSucceeded { index: usize, filename: String },
    PageFailed { index: usize, message: String },
    Finished(PipelineSummary),
}

pub struct GenerationPipeline {
    service: Arc<dyn GenerationService>,
    session: SessionId,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>, session: SessionId) -> Self {
        Self { service, session }
    }

    /// Render pages `0..page_count` in order and fold the outcomes.
    ///
    /// Page `i` is requested only after page `i - 1`'s outcome has been
    /// reported to `observer`.
    pub async fn run(
        &self,
        page_count: usize,
        observer: &mut (dyn FnMut(&PipelineEvent) + Send),
    ) -> (Vec<GeneratedPage>, PipelineSummary) {
        let started = Instant::now();
        let mut pages = Vec::with_capacity(page_count);

        for index in 0..page_count {
            observer(&PipelineEvent::PageStarted {
                index,
                total: page_count,
            });

            let page = match self.service.generate_image(&self.session, index).await {
                Ok(filename) => {
                    debug!(
                        session_id = %self.session,
                        page_index = index,
                        filename = %filename,
                        "Page generated"
                    );
                    observer(&PipelineEvent::PageSucceeded {
                        index,
                        filename: filename.clone(),
                    });
                    GeneratedPage::Succeeded {
                        filename,
                        timestamp: None,
                    }
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(
                        session_id = %self.session,
                        page_index = index,
                        error = %message,
                        "Page generation failed; continuing with the next page"
                    );
                    observer(&PipelineEvent::PageFailed {
                        index,
                        message: message.clone(),
                    });
                    GeneratedPage::Errored { message }
                }
            };
            pages.push(page);
        }

        let summary = PipelineSummary {
            succeeded: pages.iter().filter(|p| p.is_succeeded()).count(),
            total: page_count,
        };
        log_pipeline_summary(
            self.session.as_str(),
            summary.succeeded,
            summary.total,
            started.elapsed().as_millis(),
        );
        observer(&PipelineEvent::Finished(summary));

        (pages, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, ScriptedService};
    use deckflow_utils::error::ServiceError;
    use proptest::prelude::*;

    fn rejected(message: &str) -> ServiceError {
        ServiceError::Rejected {
            operation: "generate image".to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_remaining_pages() {
        let service = Arc::new(ScriptedService::new());
        service.push_image(Ok("p1.jpg".to_string()));
        service.push_image(Err(rejected("quota exceeded")));
        service.push_image(Ok("p3.jpg".to_string()));

        let session = SessionId::from_raw("session_1_abc");
        let pipeline = GenerationPipeline::new(service.clone(), session);
        let mut events = Vec::new();
        let (pages, summary) = pipeline.run(3, &mut |e| events.push(e.clone())).await;

        assert_eq!(summary, PipelineSummary { succeeded: 2, total: 3 });
        assert_eq!(pages[0].filename(), Some("p1.jpg"));
        assert!(matches!(&pages[1], GeneratedPage::Errored { message } if message.contains("quota exceeded")));
        assert_eq!(pages[2].filename(), Some("p3.jpg"));

        assert_eq!(
            events,
            vec![
                PipelineEvent::PageStarted { index: 0, total: 3 },
                PipelineEvent::PageSucceeded { index: 0, filename: "p1.jpg".to_string() },
                PipelineEvent::PageStarted { index: 1, total: 3 },
                PipelineEvent::PageFailed {
                    index: 1,
                    message: "generate image rejected: quota exceeded".to_string()
                },
                PipelineEvent::PageStarted { index: 2, total: 3 },
                PipelineEvent::PageSucceeded { index: 2, filename: "p3.jpg".to_string() },
                PipelineEvent::Finished(summary),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_pages_finishes_immediately() {
        let service = Arc::new(ScriptedService::new());
        let pipeline = GenerationPipeline::new(service.clone(), SessionId::from_raw("s"));
        let mut finished = 0;
        let (pages, summary) = pipeline
            .run(0, &mut |e| {
                if matches!(e, PipelineEvent::Finished(_)) {
                    finished += 1;
                }
            })
            .await;

        assert!(pages.is_empty());
        assert_eq!(summary.total, 0);
        assert_eq!(finished, 1);
        assert!(service.calls().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_pipeline_issues_one_request_per_page_in_order(
            outcomes in prop::collection::vec(any::<bool>(), 0..12)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let service = Arc::new(ScriptedService::new());
            for (i, ok) in outcomes.iter().enumerate() {
                if *ok {
                    service.push_image(Ok(format!("p{i}.jpg")));
                } else {
                    service.push_image(Err(rejected("no")));
                }
            }

            let pipeline = GenerationPipeline::new(service.clone(), SessionId::from_raw("s"));
            let mut finished = 0usize;
            let (pages, summary) = runtime.block_on(pipeline.run(outcomes.len(), &mut |e| {
                if matches!(e, PipelineEvent::Finished(_)) {
                    finished += 1;
                }
            }));

            let requested: Vec<usize> = service
                .calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::GenerateImage { page_index } => Some(page_index),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(requested, (0..outcomes.len()).collect::<Vec<_>>());
            prop_assert_eq!(pages.len(), outcomes.len());
            prop_assert_eq!(summary.succeeded, outcomes.iter().filter(|ok| **ok).count());
            prop_assert_eq!(finished, 1);
        }
    }
}
