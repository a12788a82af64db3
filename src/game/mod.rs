//! Game flow module
//!
//! Per-target state, the perk selection session, wave-1 handling and the
//! polling loop that ties them together.

pub mod monitor;
pub mod session;
pub mod state;
pub mod wave;

pub use monitor::Monitor;
pub use session::{PerkSession, SessionContext, SessionError, SessionSummary};
pub use state::{PlayState, SessionPhase, SessionState};
pub use wave::{is_first_wave, RestoreScheduler};
