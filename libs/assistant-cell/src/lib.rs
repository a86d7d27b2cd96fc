pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AssistantError, ChatReply, ChatRequest, Topic};
pub use router::assistant_routes;
pub use services::RuleBasedResponder;
