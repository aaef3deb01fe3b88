pub mod api;
pub mod handlers;
pub mod server;

pub use api::{ApiError, ChatRequest, ChatResponse, ResetResponse, RestoreResponse};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
