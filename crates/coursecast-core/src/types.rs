//! Shared types: connection state, pairing challenge, feed items, cycle outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the chat transport connection.
///
/// Owned exclusively by the session manager; everyone else reads snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Initializing,
    AwaitingPairing,
    Ready,
    Disconnected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Initializing => write!(f, "initializing"),
            ConnectionState::AwaitingPairing => write!(f, "awaiting_pairing"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// The latest QR pairing payload emitted by the transport.
///
/// Replaced wholesale on each new emission; `generation` is strictly increasing
/// so readers can detect refreshes. Cleared once the session reaches Ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingChallenge {
    /// Scan code identifier from the transport.
    pub code: String,
    /// Pre-rendered QR image as a data URL (data:image/png;base64,...).
    pub image_data_url: String,
    pub generation: u64,
}

/// One broadcastable item as received from the feed.
///
/// Field set mirrors the upstream course-coupon objects; everything beyond the
/// title is optional and rendered with a placeholder when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub instructional_level_simple: Option<String>,
    #[serde(default)]
    pub content_info_short: Option<String>,
    #[serde(default)]
    pub coupon_uses_remaining: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub primary_subcategory: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub id_name: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Remote media URL to stage and attach, when present.
    #[serde(default)]
    pub image: Option<String>,
}

impl BroadcastItem {
    /// Best identifying label for log lines.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or("<untitled>")
    }
}

/// Outcome of processing a single item within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Sent,
    Skipped { reason: String },
}

impl ItemOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Report for one scheduler cycle. Logged, never persisted.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ItemOutcome>,
}

impl CycleReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Sent))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.sent()
    }
}

impl Default for CycleReport {
    fn default() -> Self {
        Self::new()
    }
}
