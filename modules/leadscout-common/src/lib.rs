pub mod error;
pub mod events;
pub mod lead;
pub mod run_result;
pub mod telemetry;

pub use error::{LeadScoutError, Result};
pub use events::{Event, EventSink, VecSink};
pub use lead::{DedupeKey, Lead, Priority};
pub use run_result::RunResult;
