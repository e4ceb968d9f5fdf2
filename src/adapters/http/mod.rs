//! HTTP adapter - REST API over the workflow orchestrator.
//!
//! - `POST /query` - Route and answer one user turn
//! - `GET|DELETE /conversations/:id/history` - Conversation history
//! - `GET /conversations/:id/insights` - Routing continuity snapshot
//! - `POST /conversations/:id/reset` - Forget routing context
//! - `GET /status`, `GET /health` - Operational views
//! - `PUT /routing/context-mode` - Toggle context-aware routing

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ContextModeRequest, ContextModeResponse, ConversationCommandResponse, ErrorResponse,
    HistoryResponse,
};
pub use handlers::AppState;
pub use routes::api_router;
