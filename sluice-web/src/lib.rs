//! # Sluice Web Utilities
//!
//! Admission control in front of the worker and the mapping of admission
//! rejections onto HTTP responses.
//!
//! Admission is layered:
//!
//! - **Rate gate**: a rolling-window counter sheds load above a fixed number
//!   of acceptances per window
//! - **Backlog**: a bounded number of requests may run or wait for a worker
//! - **Execution tokens**: at most `thread_count` requests run at once
//!
//! The controller does not depend on axum; only [`AdmissionRejection`]'s
//! `IntoResponse` implementation does.

pub mod admission;
pub mod errors;

pub use admission::{AdmissionController, AdmissionPermit, RateWindow};
pub use errors::{AdmissionRejection, RejectionKind};
