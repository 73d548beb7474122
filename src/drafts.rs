use axum::{body::Body, http::Request, middleware::Next, response::Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{models::BoardDraft, prelude::*};

const CREATE_DRAFT_KEY: &str = "draft.create";
const EDIT_DRAFT_KEY: &str = "draft.edit";

/// An edit draft remembers which board it belongs to, so a draft for
/// one board can never hydrate the edit form of another.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct EditDraft {
    board_id: String,
    board: BoardDraft,
}

pub fn save_create_draft(session: &Session, draft: &BoardDraft) -> Result {
    session.insert(CREATE_DRAFT_KEY, draft)?;
    return Ok(());
}

pub fn load_create_draft(session: &Session) -> Result<Option<BoardDraft>> {
    return Ok(session.get(CREATE_DRAFT_KEY)?);
}

pub fn clear_create_draft(session: &Session) -> Result {
    session.remove::<BoardDraft>(CREATE_DRAFT_KEY)?;
    return Ok(());
}

pub fn save_edit_draft(session: &Session, board_id: &str, draft: &BoardDraft) -> Result {
    session.insert(
        EDIT_DRAFT_KEY,
        EditDraft {
            board_id: board_id.to_string(),
            board: draft.clone(),
        },
    )?;
    return Ok(());
}

/// Loads the edit draft only when it was saved for this exact board.
pub fn load_edit_draft(session: &Session, board_id: &str) -> Result<Option<BoardDraft>> {
    let saved: Option<EditDraft> = session.get(EDIT_DRAFT_KEY)?;

    return Ok(saved.filter(|d| d.board_id == board_id).map(|d| d.board));
}

pub fn clear_edit_draft(session: &Session) -> Result {
    session.remove::<EditDraft>(EDIT_DRAFT_KEY)?;
    return Ok(());
}

/// Route observer middleware: drops drafts as soon as navigation leaves
/// the route they belong to, so a stale working copy never leaks into
/// an unrelated page visit.
pub async fn route_watcher(session: Session, request: Request<Body>, next: Next<Body>) -> Response {
    let path = request.uri().path().to_string();

    if let Err(e) = sweep_stale_drafts(&session, &path) {
        tracing::warn!(error = %e, %path, "failed to sweep stale drafts");
    }

    return next.run(request).await;
}

fn sweep_stale_drafts(session: &Session, path: &str) -> Result {
    if sweeps_create_draft(path) {
        clear_create_draft(session)?;
    }

    let edit: Option<EditDraft> = session.get(EDIT_DRAFT_KEY)?;
    if let Some(draft) = edit {
        if sweeps_edit_draft(path, &draft.board_id) {
            clear_edit_draft(session)?;
        }
    }

    return Ok(());
}

fn sweeps_create_draft(path: &str) -> bool {
    return !is_asset_request(path) && !keeps_create_draft(path);
}

fn sweeps_edit_draft(path: &str, board_id: &str) -> bool {
    return !is_asset_request(path) && !keeps_edit_draft(path, board_id);
}

/// A page load also fetches the stylesheet and favicon; those requests
/// are not navigation and must never count as leaving a route.
fn is_asset_request(path: &str) -> bool {
    return path == "/favicon.ico" || path.starts_with("/assets/");
}

fn keeps_create_draft(path: &str) -> bool {
    return path == "/game-boards/create" || path.starts_with("/game-boards/create/");
}

fn keeps_edit_draft(path: &str, board_id: &str) -> bool {
    let base = format!("/game-boards/{board_id}/edit");
    return path == base || path.starts_with(&format!("{base}/"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_the_create_route_drops_the_create_draft() {
        assert!(!sweeps_create_draft("/game-boards/create"));
        assert!(!sweeps_create_draft("/game-boards/create/draft"));

        assert!(sweeps_create_draft("/game-boards"));
        assert!(sweeps_create_draft("/"));
        assert!(sweeps_create_draft("/profile"));
    }

    #[test]
    fn leaving_an_edit_route_drops_the_edit_draft() {
        assert!(!sweeps_edit_draft("/game-boards/abc/edit", "abc"));
        assert!(!sweeps_edit_draft("/game-boards/abc/edit/draft", "abc"));

        assert!(sweeps_edit_draft("/profile", "abc"));
        assert!(sweeps_edit_draft("/game-boards", "abc"));
    }

    #[test]
    fn an_edit_draft_for_one_board_is_stale_on_another_boards_edit_page() {
        assert!(sweeps_edit_draft("/game-boards/xyz/edit", "abc"));
    }

    #[test]
    fn asset_fetches_never_sweep_drafts() {
        assert!(!sweeps_create_draft("/assets/style.css"));
        assert!(!sweeps_create_draft("/favicon.ico"));

        assert!(!sweeps_edit_draft("/assets/style.css", "abc"));
        assert!(!sweeps_edit_draft("/favicon.ico", "abc"));
    }
}
