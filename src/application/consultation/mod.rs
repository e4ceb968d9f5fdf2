//! Consultation services.
//!
//! The model-backed pieces of a consultation turn and the agent that runs
//! them against the domain's transition policy.

mod agent;
mod extraction;
mod prompts;
mod replies;
mod signals;

pub use agent::{ConsultationAgent, CONTENT_COMPLETED, FEEDBACK_ACKNOWLEDGEMENT};
pub use extraction::InformationExtractor;
pub use replies::{ReplyWriter, INFORMED_SUGGESTION_FALLBACK, MINIMAL_SUGGESTION_FALLBACK};
pub use signals::SignalAnalyzer;
