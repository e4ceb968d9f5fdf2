//! Query routing.
//!
//! Turns a user message into a `RoutingDecision`, using the conversation's
//! flow to keep follow-ups with the agent that produced the last answer.

mod prompts;
mod query_router;

pub use query_router::{ConversationInsights, QueryRouter, RouterError, RouterSettings};
