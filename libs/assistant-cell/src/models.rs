// libs/assistant-cell/src/models.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub topic: Topic,
    /// Set when the message describes symptoms that need emergency care.
    pub urgent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Emergency,
    Fever,
    Headache,
    Respiratory,
    Digestive,
    Sleep,
    MentalHealth,
    Appointments,
    Greeting,
    General,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}
