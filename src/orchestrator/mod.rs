//! Application-level orchestration.
//!
//! Owns run lifecycle control (start/cancel/quit), post-run processing
//! (output-dir location, artifact extraction, history persistence), and the
//! cookie-backed orchestrate CLI flow. UI/CLI layers call into this module to
//! keep responsibilities separated.

pub mod baseline;
mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
