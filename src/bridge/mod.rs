//! Bridge orchestration.
//!
//! # Data Flow
//! ```text
//! admin API / service loops
//!     → orchestrator.rs (Bridge)
//!         → config store (fresh ApiConfig per call)
//!         → client (Orderwise, external webhook)
//!         → audit log (operation outcome)
//!     → OperationResult {success, message, data?}
//! ```

pub mod orchestrator;
pub mod result;

pub use orchestrator::Bridge;
pub use result::OperationResult;
