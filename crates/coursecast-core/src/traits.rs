//! Seam traits implemented by transport adapters and feed sources.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::BroadcastItem;

/// Lifecycle event emitted by a transport adapter.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A new pairing QR is available. `image_data_url` is already rendered
    /// (data:image/png;base64,...) by the transport side.
    PairingChallenge {
        code: String,
        image_data_url: String,
    },
    /// The session is authenticated and the transport can send.
    Ready,
    /// The underlying connection dropped.
    Disconnected { reason: String },
}

/// A chat transport backend: connect, emit lifecycle events, send text/media.
///
/// Adapters differ only in session strategy (local file store, remote store,
/// HTTP relay); the session manager and scheduler are written once against
/// this trait.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Begin (or re-begin) the connection. Re-invocable: the session manager
    /// calls this again after each disconnect.
    async fn connect(&self) -> Result<()>;

    /// Hand out the lifecycle event receiver. Yields `Some` exactly once;
    /// the receiver stays valid across reconnects.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;

    /// Send a plain text message to a group or user.
    async fn send_text(&self, target: &str, text: &str) -> Result<()>;

    /// Send a locally staged media file with a caption.
    async fn send_media(&self, target: &str, caption: &str, media: &Path) -> Result<()>;
}

/// Source of broadcastable items. Pure request/response, no state.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch the current batch. Single request, no pagination, no caching.
    async fn fetch_batch(&self) -> Result<Vec<BroadcastItem>>;
}
