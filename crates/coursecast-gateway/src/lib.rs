//! # CourseCast Gateway
//!
//! Thin HTTP control surface over the session manager: pairing challenge,
//! session status, and synchronous one-off sends.

pub mod routes;
pub mod server;

pub use server::{router, serve, AppState};
