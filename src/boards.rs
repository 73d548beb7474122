use nanoid::nanoid;
use sqlx::{types::Json, PgPool};
use tower_sessions::Session;

use crate::{
    models::{BoardDraft, GameBoard, GameSession},
    prelude::*,
};

/// Session key for the board a player/editor is currently working with.
const CURRENT_BOARD_KEY: &str = "current_board_id";

/// CRUD over a user's game boards. Borrowed out of `AppState` so every
/// handler goes through the same surface instead of scattering queries.
pub struct BoardStore<'a> {
    db: &'a PgPool,
}

impl AppState {
    pub fn boards(&self) -> BoardStore<'_> {
        return BoardStore { db: &self.db };
    }
}

const BOARD_COLUMNS: &str =
    "id, user_id, title, description, categories, theme, created_at, updated_at";

impl<'a> BoardStore<'a> {
    fn ensure_available(&self) -> Result {
        if self.db.is_closed() {
            return Err(anyhow::anyhow!(
                "database connection pool is closed; check DATABASE_URL before retrying"
            )
            .into());
        }
        return Ok(());
    }

    /// All boards owned by the user, newest first. Query failures are
    /// logged and degrade to an empty list so the listing page always
    /// renders.
    pub async fn fetch_all(&self, user_id: &str) -> Vec<GameBoard> {
        if let Err(e) = self.ensure_available() {
            tracing::warn!(error = %e, "board listing unavailable");
            return Vec::new();
        }

        let found: Result<Vec<GameBoard>, sqlx::Error> = sqlx::query_as(&format!(
            "SELECT {BOARD_COLUMNS} FROM game_boards WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db)
        .await;

        return match found {
            Ok(boards) => boards,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch game boards");
                Vec::new()
            }
        };
    }

    pub async fn find(&self, user_id: &str, board_id: &str) -> Result<Option<GameBoard>> {
        self.ensure_available()?;

        let found: Option<GameBoard> = sqlx::query_as(&format!(
            "SELECT {BOARD_COLUMNS} FROM game_boards WHERE id = $1 AND user_id = $2 LIMIT 1"
        ))
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(self.db)
        .await?;

        return Ok(found);
    }

    pub async fn create(&self, user_id: &str, draft: &BoardDraft) -> Result<GameBoard> {
        self.ensure_available()?;

        let board: GameBoard = sqlx::query_as(&format!(
            "INSERT INTO game_boards (id, user_id, title, description, categories, theme) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOARD_COLUMNS}"
        ))
        .bind(nanoid!())
        .bind(user_id)
        .bind(draft.title.trim())
        .bind(none_if_empty(&draft.description))
        .bind(Json(&draft.categories))
        .bind(Json(&draft.theme))
        .fetch_one(self.db)
        .await?;

        return Ok(board);
    }

    /// Updates an owned board, bumping `updated_at`. Returns `None` when
    /// the board does not exist or belongs to someone else.
    pub async fn update(
        &self,
        user_id: &str,
        board_id: &str,
        draft: &BoardDraft,
    ) -> Result<Option<GameBoard>> {
        self.ensure_available()?;

        let board: Option<GameBoard> = sqlx::query_as(&format!(
            "UPDATE game_boards SET title = $3, description = $4, categories = $5, theme = $6, updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {BOARD_COLUMNS}"
        ))
        .bind(board_id)
        .bind(user_id)
        .bind(draft.title.trim())
        .bind(none_if_empty(&draft.description))
        .bind(Json(&draft.categories))
        .bind(Json(&draft.theme))
        .fetch_optional(self.db)
        .await?;

        return Ok(board);
    }

    /// Deletes an owned board. The caller is responsible for clearing
    /// any session pointer at the deleted board.
    pub async fn delete(&self, user_id: &str, board_id: &str) -> Result<bool> {
        self.ensure_available()?;

        let result = sqlx::query("DELETE FROM game_boards WHERE id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(self.db)
            .await?;

        return Ok(result.rows_affected() > 0);
    }

    /// Creates the session row a playthrough is recorded against.
    pub async fn start_session(&self, board_id: &str, player_name: &str) -> Result<GameSession> {
        self.ensure_available()?;

        let session: GameSession = sqlx::query_as(
            "INSERT INTO game_sessions (id, game_board_id, player_name) VALUES ($1, $2, $3) RETURNING id, game_board_id, player_name, score, completed_questions, created_at, completed_at"
        )
        .bind(nanoid!())
        .bind(board_id)
        .bind(player_name)
        .fetch_one(self.db)
        .await?;

        return Ok(session);
    }

    /// Stores the recomputed score and appends the just-graded question
    /// id to the session's completed list.
    pub async fn record_progress(
        &self,
        session_id: &str,
        score: i32,
        question_id: &str,
    ) -> Result {
        self.ensure_available()?;

        sqlx::query(
            "UPDATE game_sessions SET score = $2, completed_questions = completed_questions || $3::jsonb WHERE id = $1"
        )
        .bind(session_id)
        .bind(score)
        .bind(Json(vec![question_id]))
        .execute(self.db)
        .await?;

        return Ok(());
    }

    pub async fn complete_session(&self, session_id: &str) -> Result {
        self.ensure_available()?;

        sqlx::query("UPDATE game_sessions SET completed_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(self.db)
            .await?;

        return Ok(());
    }
}

fn none_if_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    return if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    };
}

pub fn set_current_board(session: &Session, board_id: &str) -> Result {
    session.insert(CURRENT_BOARD_KEY, board_id.to_string())?;
    return Ok(());
}

pub fn current_board_id(session: &Session) -> Result<Option<String>> {
    return Ok(session.get(CURRENT_BOARD_KEY)?);
}

/// Clears the current-board pointer iff it referenced the deleted
/// board; deleting any other board leaves the pointer untouched.
pub fn forget_board(session: &Session, deleted_id: &str) -> Result {
    let current = current_board_id(session)?;
    if pointer_clears(current.as_deref(), deleted_id) {
        session.remove::<String>(CURRENT_BOARD_KEY)?;
    }
    return Ok(());
}

fn pointer_clears(current: Option<&str>, deleted_id: &str) -> bool {
    return current == Some(deleted_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_the_current_board_clears_the_pointer() {
        assert!(pointer_clears(Some("abc"), "abc"));
    }

    #[test]
    fn deleting_another_board_keeps_the_pointer() {
        assert!(!pointer_clears(Some("abc"), "xyz"));
        assert!(!pointer_clears(None, "xyz"));
    }

    #[test]
    fn blank_description_is_stored_as_null() {
        assert_eq!(none_if_empty("   "), None);
        assert_eq!(none_if_empty(" hi "), Some("hi"));
    }
}
