//! Routing domain module.
//!
//! Agent identities, routing decisions, the per-conversation flow record
//! the router consults for continuity, and the parser for classifier output.

mod agent;
mod decision;
mod flow;
mod parse;

pub use agent::{AgentType, Priority};
pub use decision::RoutingDecision;
pub use flow::{ConversationFlow, FlowInteraction, ReferenceAnalysis, DEFAULT_FLOW_HISTORY};
pub use parse::{
    parse_context_output, parse_routing_output, ContextVerdict, RoutingParseError, RoutingVerdict,
};
