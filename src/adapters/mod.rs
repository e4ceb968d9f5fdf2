//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Language model providers (OpenAI, mock)
//! - `agents` - Specialist agent clients (HTTP, mock)
//! - `storage` - In-process session and message stores
//! - `http` - REST API over the workflow orchestrator

pub mod agents;
pub mod ai;
pub mod http;
pub mod storage;
