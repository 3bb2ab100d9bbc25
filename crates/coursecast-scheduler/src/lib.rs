//! # CourseCast Scheduler
//!
//! The cycle engine that pulls a batch from the feed, formats each item, and
//! paces sends through the session-managed transport.
//!
//! ## Architecture
//! ```text
//! BroadcastEngine (run_forever)
//!   └── cycle: HttpItemSource.fetch_batch()
//!         ├── format_message(item)
//!         ├── MediaStager.stage() → send_media → release()   (media items)
//!         ├── send_text                                      (text items)
//!         └── pacing delay, then next item — strictly sequential
//!   └── cadence delay, then next cycle — never overlapping
//! ```

pub mod engine;
pub mod format;
pub mod source;
pub mod stager;

pub use engine::BroadcastEngine;
pub use format::format_message;
pub use source::HttpItemSource;
pub use stager::{MediaStager, StagedAsset};
