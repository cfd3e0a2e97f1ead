//! Shared building blocks for the cogito conversational pipeline.
//!
//! Holds the data model exchanged between the context, reasoning,
//! learning, and engine crates, plus configuration, time, and the
//! confidence helpers every component scores with.

pub mod clock;
pub mod confidence;
pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use confidence::{aggregate_confidence, clamp_confidence, position_weighted_confidence};
pub use config::CogitoConfig;
pub use error::{CogitoError, Result};
pub use types::*;
