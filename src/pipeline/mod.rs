//! Bulk generation pipeline
//!
//! Runs N templates x M events through the compositor with small bounded
//! concurrency. Emitted results keep the deterministic (template, event)
//! order regardless of which fetch finishes first, one failed pair never
//! aborts the rest, and each pair's contribution to the result list is
//! atomic: a whole outcome is appended or nothing is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{EventData, Template};
use crate::engine::{Compositor, GeneratedImage, RenderError};

/// Cooperative cancellation handle shared between the caller and a running
/// batch. Cancelling stops the batch between pairs; in-flight renders are
/// abandoned with the stream.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome for one (template, event) pair
#[derive(Debug)]
pub struct PairOutcome {
    pub template_id: String,
    pub template_name: String,
    pub event_id: String,
    pub event_name: String,
    pub result: Result<GeneratedImage, RenderError>,
}

impl PairOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a completed (or cancelled) batch run
#[derive(Debug)]
pub struct BatchOutcome {
    pub job_id: Uuid,
    pub results: Vec<PairOutcome>,
    pub generated: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drives bulk generation over a shared compositor.
pub struct BatchGenerator {
    compositor: Arc<Compositor>,
    concurrency: usize,
}

impl BatchGenerator {
    /// `concurrency` is the number of renders in flight at once; keep it
    /// small (3-5) so repeated fetches against one photo host do not trip
    /// rate limits.
    pub fn new(compositor: Arc<Compositor>, concurrency: usize) -> Self {
        BatchGenerator {
            compositor,
            concurrency: concurrency.max(1),
        }
    }

    /// Render every (template, event) pair in template-major order.
    ///
    /// `on_result` observes each pair as it is appended, for incremental
    /// progress display.
    pub async fn run(
        &self,
        templates: &[Arc<Template>],
        events: &[EventData],
        cancel: &CancelFlag,
        mut on_result: impl FnMut(&PairOutcome),
    ) -> BatchOutcome {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = templates.len() * events.len();

        info!(
            job_id = %job_id,
            templates = templates.len(),
            events = events.len(),
            total,
            concurrency = self.concurrency,
            "Starting batch generation"
        );

        let pairs: Vec<(Arc<Template>, EventData)> = templates
            .iter()
            .flat_map(|template| {
                events
                    .iter()
                    .map(move |event| (template.clone(), event.clone()))
            })
            .collect();

        let compositor = self.compositor.clone();
        let mut outcomes = stream::iter(pairs)
            .map(|(template, event)| {
                let compositor = compositor.clone();
                async move {
                    let result = compositor.render(&template, &event, None).await;
                    if let Err(ref e) = result {
                        warn!(
                            template_id = %template.id,
                            event_id = %event.event_id,
                            error = %e,
                            "Pair failed, continuing batch"
                        );
                    }
                    PairOutcome {
                        template_id: template.id.clone(),
                        template_name: template.name.clone(),
                        event_id: event.event_id.clone(),
                        event_name: event.event_name.clone(),
                        result,
                    }
                }
            })
            .buffered(self.concurrency);

        let mut results: Vec<PairOutcome> = Vec::with_capacity(total);
        let mut cancelled = false;

        while let Some(outcome) = outcomes.next().await {
            on_result(&outcome);
            results.push(outcome);

            if cancel.is_cancelled() {
                debug!(job_id = %job_id, completed = results.len(), "Batch cancelled");
                cancelled = true;
                break;
            }
        }
        drop(outcomes);

        let generated = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - generated;

        info!(
            job_id = %job_id,
            generated,
            failed,
            cancelled,
            "Batch generation finished"
        );

        BatchOutcome {
            job_id,
            results,
            generated,
            failed,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
