//! Admission control: rate gate, backlog and execution tokens

pub mod controller;
pub mod window;

pub use controller::{AdmissionController, AdmissionPermit};
pub use window::RateWindow;
