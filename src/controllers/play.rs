use super::utils::{self, Flash};

use crate::{
    boards,
    models::{GameTheme, QuestionState},
    play::{self, PlayState},
    prelude::*,
};

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/game-boards/:board_id/play", get(play_board))
        .route("/game-boards/:board_id/play/start", post(start))
        .route("/game-boards/:board_id/play/select", post(select))
        .route("/game-boards/:board_id/play/reveal", post(reveal))
        .route("/game-boards/:board_id/play/close", post(close))
        .route("/game-boards/:board_id/play/grade", post(grade))
        .route("/game-boards/:board_id/play/again", post(play_again));
}

struct QuestionCell {
    id: String,
    points: i32,
    answered: bool,
    correct: bool,
}

struct CategoryColumn {
    name: String,
    cells: Vec<QuestionCell>,
}

struct OpenQuestion {
    points: i32,
    question: String,
    answer: String,
    answer_shown: bool,
}

#[derive(Template)]
#[template(path = "play.html")]
struct PlayTemplate {
    signed_in: bool,
    flash: Option<Flash>,
    board_id: String,
    board_title: String,
    theme: GameTheme,
    needs_player: bool,
    complete: bool,
    complete_delay_ms: u64,
    player_name: String,
    score: i32,
    columns: Vec<CategoryColumn>,
    open_question: Option<OpenQuestion>,
}

async fn play_board(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let Some(board) = state.boards().find(&user.id, &board_id).await? else {
        utils::flash_error(&session, "Game board not found")?;
        return Ok(Redirect::to("/game-boards").into_response());
    };

    boards::set_current_board(&session, &board.id)?;

    // A leftover playthrough of some other board never bleeds into this
    // one.
    let play_state = match play::load_play(&session)? {
        Some(ps) if ps.board_id == board.id => Some(ps),
        Some(_) => {
            play::clear_play(&session)?;
            None
        }
        None => None,
    };

    let empty: Vec<QuestionState> = Vec::new();
    let states = play_state
        .as_ref()
        .map(|ps| &ps.question_states)
        .unwrap_or(&empty);

    let columns = board
        .categories
        .iter()
        .map(|category| CategoryColumn {
            name: category.name.clone(),
            cells: category
                .questions
                .iter()
                .map(|q| {
                    let qs = states.iter().find(|s| s.id == q.id);
                    QuestionCell {
                        id: q.id.clone(),
                        points: q.points,
                        answered: qs.is_some_and(|s| s.answered),
                        correct: qs.is_some_and(|s| s.correct == Some(true)),
                    }
                })
                .collect(),
        })
        .collect();

    let open_question = play_state.as_ref().and_then(|ps| {
        let selected = ps.selected.as_deref()?;
        let question = board.question(selected)?;
        return Some(OpenQuestion {
            points: question.points,
            question: question.question.clone(),
            answer: question.answer.clone(),
            answer_shown: ps.answer_shown,
        });
    });

    return Ok(PlayTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        board_id: board.id.clone(),
        board_title: board.title.clone(),
        theme: board.theme.0.clone(),
        needs_player: play_state.is_none(),
        complete: play_state.as_ref().is_some_and(|ps| ps.complete),
        complete_delay_ms: play::COMPLETE_REVEAL_DELAY_MS,
        player_name: play_state
            .as_ref()
            .map(|ps| ps.player_name.clone())
            .unwrap_or_default(),
        score: play::calculate_score(&board.categories, states),
        columns,
        open_question,
    }
    .into_response());
}

#[derive(Debug, Deserialize)]
struct StartForm {
    player_name: String,
}

async fn start(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<StartForm>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let player_name = body.player_name.trim().to_string();
    if player_name.is_empty() {
        utils::flash_error(&session, "Player name is required")?;
        return Ok(play_redirect(&board_id));
    }

    let Some(board) = state.boards().find(&user.id, &board_id).await? else {
        utils::flash_error(&session, "Game board not found")?;
        return Ok(Redirect::to("/game-boards").into_response());
    };

    let game_session = match state.boards().start_session(&board.id, &player_name).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start game session");
            utils::flash_error(&session, "Failed to start game session")?;
            return Ok(play_redirect(&board_id));
        }
    };

    let play_state = PlayState::new(
        game_session.id,
        board.id.clone(),
        player_name,
        &board.categories,
    );
    play::save_play(&session, &play_state)?;

    return Ok(play_redirect(&board_id));
}

#[derive(Debug, Deserialize)]
struct SelectForm {
    question_id: String,
}

async fn select(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<SelectForm>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    if let Some(mut play_state) = current_play(&session, &board_id)? {
        // Answered questions stay closed; selecting them is a no-op.
        if play_state.select_question(&body.question_id) {
            play::save_play(&session, &play_state)?;
        }
    }

    return Ok(play_redirect(&board_id));
}

async fn reveal(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    if let Some(mut play_state) = current_play(&session, &board_id)? {
        play_state.reveal_answer();
        play::save_play(&session, &play_state)?;
    }

    return Ok(play_redirect(&board_id));
}

async fn close(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    if let Some(mut play_state) = current_play(&session, &board_id)? {
        play_state.close_question();
        play::save_play(&session, &play_state)?;
    }

    return Ok(play_redirect(&board_id));
}

#[derive(Debug, Deserialize)]
struct GradeForm {
    correct: bool,
}

async fn grade(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<GradeForm>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let Some(mut play_state) = current_play(&session, &board_id)? else {
        return Ok(play_redirect(&board_id));
    };

    let Some(question_id) = play_state.grade(body.correct) else {
        return Ok(play_redirect(&board_id));
    };

    let Some(board) = state.boards().find(&user.id, &board_id).await? else {
        utils::flash_error(&session, "Game board not found")?;
        return Ok(Redirect::to("/game-boards").into_response());
    };

    // Score is recomputed from full state rather than incremented; the
    // stored row always reflects the whole board.
    let score = play::calculate_score(&board.categories, &play_state.question_states);

    if let Err(e) = state
        .boards()
        .record_progress(&play_state.session_id, score, &question_id)
        .await
    {
        tracing::warn!(error = %e, "failed to persist session progress");
    }

    if play::is_game_complete(&board.categories, &play_state.question_states) {
        play_state.complete = true;
        if let Err(e) = state.boards().complete_session(&play_state.session_id).await {
            tracing::warn!(error = %e, "failed to mark session complete");
        }
    }

    play::save_play(&session, &play_state)?;

    return Ok(play_redirect(&board_id));
}

/// "Play again": back to name entry with every question state dropped.
/// The finished session row stays behind as history.
async fn play_again(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    play::clear_play(&session)?;

    return Ok(play_redirect(&board_id));
}

fn current_play(session: &Session, board_id: &str) -> Result<Option<PlayState>> {
    let found = play::load_play(session)?.filter(|ps| ps.board_id == board_id);
    return Ok(found);
}

fn play_redirect(board_id: &str) -> Response {
    return Redirect::to(&format!("/game-boards/{board_id}/play")).into_response();
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::{
        body::Body,
        error_handling::HandleErrorLayer,
        http::{Request, StatusCode},
    };
    use sqlx::PgPool;
    use tokio::sync::broadcast;
    use tower::{ServiceBuilder, ServiceExt};
    use tower_sessions::{MokaStore, SessionManagerLayer};

    // In-memory sessions and a pool that never connects; enough for
    // routing decisions that happen before any query.
    fn test_router() -> Router {
        let (auth_events, _) = broadcast::channel(4);

        let state = AppState {
            cfg: Arc::new(Config {
                server_domain: "localhost".to_string(),
                server_port: 0,
                database_url: "postgres://localhost/unused".to_string(),
            }),
            db: PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
            auth_events,
        };

        let session_service = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|_| async {
                return StatusCode::BAD_REQUEST;
            }))
            .layer(SessionManagerLayer::new(MokaStore::new(Some(16))));

        return add_routes(Router::new())
            .with_state(state)
            .layer(session_service);
    }

    #[tokio::test]
    async fn play_actions_require_a_signed_in_user() {
        let router = test_router();

        for path in [
            "/game-boards/b1/play/select",
            "/game-boards/b1/play/reveal",
            "/game-boards/b1/play/close",
            "/game-boards/b1/play/grade",
            "/game-boards/b1/play/again",
        ] {
            let request = Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("question_id=q1&correct=true"))
                .unwrap();

            let response = router.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(response.headers()["location"], "/login", "{path}");
        }
    }
}
