//! # CourseCast Transport
//!
//! Chat transport adapters (browser-automation bridge with file or remote
//! session store, plus the HTTP relay mode) and the `SessionManager` that
//! supervises whichever one is configured.

pub mod bridge;
pub mod relay;
pub mod session;
pub mod store;

use std::sync::Arc;

use coursecast_core::config::{Config, TransportMode};
use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::ChatTransport;

pub use bridge::BridgeTransport;
pub use relay::RelayTransport;
pub use session::SessionManager;
pub use store::{FileSessionStore, HttpSessionStore, SessionStore};

/// Build the transport selected by configuration.
pub fn build_transport(config: &Config) -> Result<Arc<dyn ChatTransport>> {
    match config.transport_mode {
        TransportMode::Local => {
            let store = Arc::new(FileSessionStore::new(config.session_dir.clone()));
            Ok(Arc::new(BridgeTransport::new(
                &config.bridge_url,
                store,
                "bridge-local",
            )?))
        }
        TransportMode::Remote => {
            let base = config
                .session_store_url
                .as_deref()
                .ok_or_else(|| CastError::MissingEnv("SESSION_STORE_URL".into()))?;
            let store = Arc::new(HttpSessionStore::new(base, "primary"));
            Ok(Arc::new(BridgeTransport::new(
                &config.bridge_url,
                store,
                "bridge-remote",
            )?))
        }
        TransportMode::Relay => Ok(Arc::new(RelayTransport::new(&config.send_endpoint))),
    }
}
