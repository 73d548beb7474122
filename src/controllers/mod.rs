mod auth;
mod board;
mod play;
pub mod utils;

use crate::{models::User, prelude::*};

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tower_sessions::Session;

use self::utils::Flash;

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    let router = auth::add_routes(router);
    let router = board::add_routes(router);
    let router = play::add_routes(router);

    return router
        .route("/", get(index))
        .route("/health", get(|| async { StatusCode::NO_CONTENT }));
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    signed_in: bool,
    flash: Option<Flash>,
    user: User,
    board_count: usize,
}

async fn index(session: Session, State(state): State<AppState>) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let board_count = state.boards().fetch_all(&user.id).await.len();

    return Ok(IndexTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        user,
        board_count,
    }
    .into_response());
}
