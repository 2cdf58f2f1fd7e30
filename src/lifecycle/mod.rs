//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Open storage → Build stores → Seed defaults → Load level → service_start
//!
//! Running (service.rs):
//!     heartbeat loop, optional sync loop, admin API
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → loops exit → service_stop → close storage
//! ```
//!
//! # Design Decisions
//! - Ordered startup: storage first, then stores, then listeners
//! - The storage handle is closed exactly once, after every loop has stopped

pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{initialize, teardown, Core, StartupError};
