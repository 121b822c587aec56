//! pulse-web — JSON API behind the sentiment dashboard.
//!   - Dataset listing and per-dataset statistics
//!   - One-off classification
//!   - Customer-care chat with a persisted log

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::{AppState, SharedState};
