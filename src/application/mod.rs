//! Application layer - Services that sequence domain logic over ports.
//!
//! - `consultation` - In-process multi-turn specialist agents
//! - `routing` - Agent selection with conversation continuity
//! - `workflow` - The per-turn pipeline behind `POST /query`

pub mod consultation;
pub mod routing;
pub mod workflow;

pub use consultation::{ConsultationAgent, InformationExtractor, SignalAnalyzer};
pub use routing::{ConversationInsights, QueryRouter, RouterError, RouterSettings};
pub use workflow::{AgentStatus, WorkflowError, WorkflowOrchestrator, WorkflowSettings, WorkflowStatus};

/// Request purposes attached to every model call.
///
/// Logs and the mock provider key off these.
pub mod purpose {
    pub const ROUTING: &str = "routing";
    pub const CONTEXT_ROUTING: &str = "context_routing";
    pub const EXTRACTION: &str = "extraction";
    pub const INTENT: &str = "intent";
    pub const NEGATIVE: &str = "negative";
    pub const FEEDBACK: &str = "feedback";
    pub const SUGGESTIONS: &str = "suggestions";
    pub const CONTENT: &str = "content";
    pub const ANALYSIS: &str = "analysis";
}
