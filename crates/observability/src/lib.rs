//! # hinterzimmer-observability
//!
//! Structured Logging via tracing-subscriber fuer Server, Admin-Werkzeug
//! und Terminal-Client.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat};
