//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, confidence, errors)
//! - `conversation` - Per-domain consultation state machines and turn policy
//! - `routing` - Agent identities, routing decisions and conversation flow
//! - `workflow` - Request and response envelopes for a routed turn

pub mod conversation;
pub mod foundation;
pub mod routing;
pub mod workflow;
