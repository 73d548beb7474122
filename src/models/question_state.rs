use serde::{Deserialize, Serialize};

/// Ephemeral per-question play state. Lives in the cookie session for
/// the duration of a playthrough and is never written to the database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuestionState {
    pub id: String,
    pub revealed: bool,
    pub answered: bool,
    pub correct: Option<bool>,
}

impl QuestionState {
    pub fn fresh(question_id: &str) -> Self {
        return Self {
            id: question_id.to_string(),
            revealed: false,
            answered: false,
            correct: None,
        };
    }
}
