//! The broadcast cycle engine.
//!
//! One cycle = fetch batch → per item, strictly in sequence: format →
//! (stage, send media, release | send text) → pacing delay. The next cycle is
//! armed only after the previous one has fully drained, so cycles never
//! overlap and a slow cycle pushes the next one back. Per-item failures are
//! logged and recorded as skips; they never abort the cycle, and no cycle
//! failure prevents the next cycle from being scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::ItemSource;
use coursecast_core::types::{BroadcastItem, CycleReport, ItemOutcome};
use coursecast_transport::SessionManager;

use crate::format::format_message;
use crate::stager::MediaStager;

pub struct BroadcastEngine {
    session: Arc<SessionManager>,
    source: Arc<dyn ItemSource>,
    stager: MediaStager,
    target: String,
    pacing: Duration,
    cadence: Duration,
    running: AtomicBool,
}

impl BroadcastEngine {
    pub fn new(
        session: Arc<SessionManager>,
        source: Arc<dyn ItemSource>,
        stager: MediaStager,
        target: impl Into<String>,
        pacing: Duration,
        cadence: Duration,
    ) -> Self {
        Self {
            session,
            source,
            stager,
            target: target.into(),
            pacing,
            cadence,
            running: AtomicBool::new(false),
        }
    }

    /// Run cycles until the process shuts down. Must be called once per
    /// process; a second call is rejected.
    pub async fn run_forever(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CastError::Scheduler(
                "broadcast loop already running".into(),
            ));
        }

        self.session.wait_until_ready().await;
        tracing::info!(target = %self.target, "session ready, starting broadcast cycles");

        loop {
            let report = self.run_cycle().await;
            tracing::info!(
                started_at = %report.started_at,
                items = report.outcomes.len(),
                sent = report.sent(),
                skipped = report.skipped(),
                "cycle complete"
            );
            tokio::time::sleep(self.cadence).await;
        }
    }

    /// One full pass over the current batch.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::new();

        // Feed failures degrade to an empty batch, consumed locally.
        let items = match self.source.fetch_batch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "feed fetch failed, running empty cycle");
                Vec::new()
            }
        };
        tracing::info!(count = items.len(), "fetched broadcast batch");

        for item in &items {
            let outcome = self.process_item(item).await;
            if let ItemOutcome::Skipped { reason } = &outcome {
                tracing::warn!(item = item.label(), reason, "item skipped");
            }
            report.outcomes.push(outcome);
            // Trailing delay included: the cycle is not drained until the
            // last item's pacing has elapsed.
            tokio::time::sleep(self.pacing).await;
        }

        report
    }

    async fn process_item(&self, item: &BroadcastItem) -> ItemOutcome {
        let message = format_message(item);

        // Fail fast while not Ready rather than blocking on a dead transport.
        let transport = match self.session.transport() {
            Ok(transport) => transport,
            Err(e) => return ItemOutcome::skipped(e.to_string()),
        };

        match &item.image {
            Some(url) => {
                let asset = match self.stager.stage(url).await {
                    Ok(asset) => asset,
                    Err(e) => return ItemOutcome::skipped(format!("stage failed: {e}")),
                };
                let result = transport.send_media(&self.target, &message, &asset.path).await;
                // Release on the failure path too.
                self.stager.release(&asset).await;
                match result {
                    Ok(()) => ItemOutcome::Sent,
                    Err(e) => ItemOutcome::skipped(format!("media send failed: {e}")),
                }
            }
            None => match transport.send_text(&self.target, &message).await {
                Ok(()) => ItemOutcome::Sent,
                Err(e) => ItemOutcome::skipped(format!("send failed: {e}")),
            },
        }
    }
}
