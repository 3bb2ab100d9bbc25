//! HTTP relay transport — the alternate deployment mode where message
//! dispatch is delegated to a separate service accepting `{ target, message }`.
//! Session-less: connect reports Ready immediately.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::{ChatTransport, TransportEvent};
use tokio::sync::mpsc;

pub struct RelayTransport {
    endpoint: String,
    client: reqwest::Client,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

impl RelayTransport {
    pub fn new(endpoint: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
            events_tx: tx,
            events_rx: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl ChatTransport for RelayTransport {
    fn name(&self) -> &str {
        "relay"
    }

    async fn connect(&self) -> Result<()> {
        tracing::info!(endpoint = %self.endpoint, "relay transport ready");
        let _ = self.events_tx.send(TransportEvent::Ready);
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.lock().expect("events lock poisoned").take()
    }

    async fn send_text(&self, target: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({ "target": target, "message": text });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CastError::send(format!("relay send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CastError::send(format!("relay {status}: {text}")));
        }
        Ok(())
    }

    /// The dispatch service only carries text; media items degrade to their
    /// caption rather than being dropped wholesale.
    async fn send_media(&self, target: &str, caption: &str, media: &Path) -> Result<()> {
        tracing::debug!(media = %media.display(), "relay has no media path, sending caption only");
        self.send_text(target, caption).await
    }
}
