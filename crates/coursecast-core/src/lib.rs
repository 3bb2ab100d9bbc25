//! # CourseCast Core
//!
//! Shared foundation: error taxonomy, configuration, wire types, and the seam
//! traits (`ChatTransport`, `ItemSource`) the rest of the workspace builds on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{Config, TransportMode};
pub use error::{CastError, Result};
pub use traits::{ChatTransport, ItemSource, TransportEvent};
pub use types::{
    BroadcastItem, ConnectionState, CycleReport, ItemOutcome, PairingChallenge,
};
