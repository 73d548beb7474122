use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{self, types::Json};

/// One playthrough of a board by a named player. Created when play
/// starts, updated after every graded question.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameSession {
    pub id: String,
    pub game_board_id: String,

    pub player_name: String,
    pub score: i32,
    pub completed_questions: Json<Vec<String>>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
