//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle (terminate, shutdown, signals):
//!     → tracing events with structured fields (signal, policy, index)
//!     → logging.rs subscriber (stdout, pretty or JSON)
//! ```

pub mod logging;

pub use logging::init_logging;
