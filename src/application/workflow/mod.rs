//! Per-turn workflow behind `POST /query`.

mod orchestrator;

pub use orchestrator::{
    AgentStatus, WorkflowError, WorkflowOrchestrator, WorkflowSettings, WorkflowStatus, APOLOGY,
};
