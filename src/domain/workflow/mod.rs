//! Workflow domain module.
//!
//! Envelopes for a routed turn: what enters the system, what is sent to a
//! specialist agent, and what comes back to the caller.

mod envelope;

pub use envelope::{
    append_bounded, AgentRequest, AgentResponse, HealthReport, HistoryEntry, HistoryRole,
    UnifiedRequest, UnifiedResponse, DEFAULT_PERSONA,
};
