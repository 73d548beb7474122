use super::utils::{self, Flash};

use crate::{
    boards, drafts,
    models::{
        BoardDraft, Category, GameTheme, Question, MAX_CATEGORIES, QUESTIONS_PER_CATEGORY,
    },
    play,
    prelude::*,
};

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use nanoid::nanoid;
use tower_sessions::Session;

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/game-boards", get(list))
        .route("/game-boards/create", get(create_form).post(create))
        .route("/game-boards/create/draft", post(autosave_create))
        .route("/game-boards/:board_id/edit", get(edit_form).post(update))
        .route("/game-boards/:board_id/edit/draft", post(autosave_edit))
        .route("/game-boards/:board_id/delete", post(delete));
}

struct BoardCard {
    id: String,
    title: String,
    description: String,
    category_count: usize,
    created_at: String,
}

#[derive(Template)]
#[template(path = "game-boards.html")]
struct GameBoardsTemplate {
    signed_in: bool,
    flash: Option<Flash>,
    boards: Vec<BoardCard>,
}

async fn list(session: Session, State(state): State<AppState>) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let boards = state
        .boards()
        .fetch_all(&user.id)
        .await
        .into_iter()
        .map(|b| BoardCard {
            id: b.id,
            title: b.title,
            description: b.description.unwrap_or_default(),
            category_count: b.categories.len(),
            created_at: b.created_at.format("%b %e, %Y").to_string(),
        })
        .collect();

    return Ok(GameBoardsTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        boards,
    }
    .into_response());
}

#[derive(Template)]
#[template(path = "board-form.html")]
struct BoardFormTemplate {
    signed_in: bool,
    flash: Option<Flash>,
    heading: String,
    submit_path: String,
    draft_path: String,
    draft: BoardDraft,
    themes: Vec<GameTheme>,
}

async fn create_form(session: Session, State(state): State<AppState>) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    // A previously saved draft survives a reload; otherwise start from
    // the blank 5x4 grid.
    let draft = match drafts::load_create_draft(&session)? {
        Some(saved) => saved,
        None => BoardDraft::blank(),
    };

    return Ok(BoardFormTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        heading: "Create New Game Board".to_string(),
        submit_path: "/game-boards/create".to_string(),
        draft_path: "/game-boards/create/draft".to_string(),
        draft,
        themes: GameTheme::defaults(),
    }
    .into_response());
}

async fn autosave_create(
    session: Session,
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let mut draft = draft_from_form(&pairs);
    apply_form_action(&mut draft, form_value(&pairs, "action").unwrap_or("save"));

    drafts::save_create_draft(&session, &draft)?;

    return Ok(Redirect::to("/game-boards/create").into_response());
}

async fn create(
    session: Session,
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let draft = draft_from_form(&pairs);

    let problems = draft.validate();
    if !problems.is_empty() {
        drafts::save_create_draft(&session, &draft)?;
        utils::flash_error(&session, problems.join("; "))?;
        return Ok(Redirect::to("/game-boards/create").into_response());
    }

    match state.boards().create(&user.id, &draft).await {
        Ok(_) => {
            drafts::clear_create_draft(&session)?;
            utils::flash_success(&session, "Game board created")?;
            return Ok(Redirect::to("/game-boards").into_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "game board create failed");
            drafts::save_create_draft(&session, &draft)?;
            utils::flash_error(&session, "Failed to create game board. Please try again.")?;
            return Ok(Redirect::to("/game-boards/create").into_response());
        }
    }
}

async fn edit_form(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    // A draft for this exact board skips the fetch entirely.
    let draft = match drafts::load_edit_draft(&session, &board_id)? {
        Some(saved) => saved,
        None => {
            let Some(board) = state.boards().find(&user.id, &board_id).await? else {
                utils::flash_error(&session, "Game board not found")?;
                return Ok(Redirect::to("/game-boards").into_response());
            };
            BoardDraft::from_board(&board)
        }
    };

    return Ok(BoardFormTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        heading: "Edit Game Board".to_string(),
        submit_path: format!("/game-boards/{board_id}/edit"),
        draft_path: format!("/game-boards/{board_id}/edit/draft"),
        draft,
        themes: GameTheme::defaults(),
    }
    .into_response());
}

async fn autosave_edit(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    if utils::current_user(&state, &session).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let mut draft = draft_from_form(&pairs);
    apply_form_action(&mut draft, form_value(&pairs, "action").unwrap_or("save"));

    drafts::save_edit_draft(&session, &board_id, &draft)?;

    return Ok(Redirect::to(&format!("/game-boards/{board_id}/edit")).into_response());
}

async fn update(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let draft = draft_from_form(&pairs);

    let problems = draft.validate();
    if !problems.is_empty() {
        drafts::save_edit_draft(&session, &board_id, &draft)?;
        utils::flash_error(&session, problems.join("; "))?;
        return Ok(Redirect::to(&format!("/game-boards/{board_id}/edit")).into_response());
    }

    match state.boards().update(&user.id, &board_id, &draft).await {
        Ok(Some(_)) => {
            drafts::clear_edit_draft(&session)?;
            utils::flash_success(&session, "Game board updated successfully")?;
            return Ok(Redirect::to("/game-boards").into_response());
        }
        Ok(None) => {
            utils::flash_error(&session, "Game board not found")?;
            return Ok(Redirect::to("/game-boards").into_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "game board update failed");
            drafts::save_edit_draft(&session, &board_id, &draft)?;
            utils::flash_error(&session, "Failed to update game board")?;
            return Ok(Redirect::to(&format!("/game-boards/{board_id}/edit")).into_response());
        }
    }
}

async fn delete(
    Path(board_id): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    match state.boards().delete(&user.id, &board_id).await {
        Ok(true) => {
            boards::forget_board(&session, &board_id)?;
            play::clear_play_for_board(&session, &board_id)?;
            utils::flash_success(&session, "Game board deleted")?;
        }
        Ok(false) => utils::flash_error(&session, "Game board not found")?,
        Err(e) => {
            tracing::warn!(error = %e, "game board delete failed");
            utils::flash_error(&session, "Failed to delete game board")?;
        }
    }

    return Ok(Redirect::to("/game-boards").into_response());
}

fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    return pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str());
}

/// Rebuilds a working copy from the flat form encoding. The form posts
/// `title`, `description`, `theme_*` fields and per-category fields
/// `cat_{i}_id` / `cat_{i}_name` plus `q_{i}_{j}_{id,points,question,answer}`.
/// Hidden id fields keep category and question identity stable across
/// autosaves; anything missing gets a fresh id.
fn draft_from_form(pairs: &[(String, String)]) -> BoardDraft {
    let get = |key: &str| form_value(pairs, key);

    let selected_palette = get("theme_name").unwrap_or("");
    let mut theme = GameTheme::by_name(selected_palette).unwrap_or_default();

    if !selected_palette.trim().is_empty() {
        theme.name = selected_palette.to_string();
    }

    // The color inputs hold whatever palette was on screen when the form
    // was rendered; `theme_applied` names it. When the select now points
    // at a different palette, that palette's colors win and the stale
    // inputs are ignored. Posted colors only customize an unchanged
    // palette.
    let applied_palette = get("theme_applied").unwrap_or(selected_palette);
    if selected_palette == applied_palette {
        if let Some(v) = get("theme_background_color") {
            theme.background_color = v.to_string();
        }
        if let Some(v) = get("theme_card_color") {
            theme.card_color = v.to_string();
        }
        if let Some(v) = get("theme_card_text_color") {
            theme.card_text_color = v.to_string();
        }
        if let Some(v) = get("theme_header_color") {
            theme.header_color = v.to_string();
        }
        if let Some(v) = get("theme_header_text_color") {
            theme.header_text_color = v.to_string();
        }
        if let Some(v) = get("theme_title_color") {
            theme.title_color = v.to_string();
        }
        if let Some(v) = get("theme_background_image") {
            theme.background_image = if v.trim().is_empty() {
                None
            } else {
                Some(v.to_string())
            };
        }
        if let Some(v) = get("theme_border_radius") {
            if let Ok(radius) = v.parse() {
                theme.border_radius = radius;
            }
        }
    }

    let mut categories = Vec::new();
    for ci in 0..MAX_CATEGORIES {
        let Some(name) = get(&format!("cat_{ci}_name")) else {
            continue;
        };

        let questions = (0..QUESTIONS_PER_CATEGORY)
            .map(|qi| Question {
                id: get(&format!("q_{ci}_{qi}_id"))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| nanoid!()),
                points: get(&format!("q_{ci}_{qi}_points"))
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(((qi as i32) + 1) * 100),
                question: get(&format!("q_{ci}_{qi}_question")).unwrap_or("").to_string(),
                answer: get(&format!("q_{ci}_{qi}_answer")).unwrap_or("").to_string(),
            })
            .collect();

        categories.push(Category {
            id: get(&format!("cat_{ci}_id"))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| nanoid!()),
            name: name.to_string(),
            questions,
        });
    }

    return BoardDraft {
        title: get("title").unwrap_or("").to_string(),
        description: get("description").unwrap_or("").to_string(),
        categories,
        theme,
    };
}

fn apply_form_action(draft: &mut BoardDraft, action: &str) {
    if action == "add_category" {
        draft.add_category();
    } else if let Some(index) = action.strip_prefix("remove_category_") {
        if let Ok(index) = index.parse() {
            draft.remove_category(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: impl Into<String>, value: impl Into<String>) -> (String, String) {
        return (name.into(), value.into());
    }

    fn full_form() -> Vec<(String, String)> {
        let mut pairs = vec![
            pair("title", "Science Night"),
            pair("description", "Friday trivia"),
            pair("theme_name", "Royal Purple"),
        ];

        for ci in 0..5 {
            pairs.push(pair(format!("cat_{ci}_id"), format!("cat{ci}")));
            pairs.push(pair(format!("cat_{ci}_name"), format!("Category {ci}")));
            for qi in 0..4 {
                pairs.push(pair(format!("q_{ci}_{qi}_id"), format!("q{ci}-{qi}")));
                pairs.push(pair(format!("q_{ci}_{qi}_points"), ((qi + 1) * 100).to_string()));
                pairs.push(pair(format!("q_{ci}_{qi}_question"), "What is it?"));
                pairs.push(pair(format!("q_{ci}_{qi}_answer"), "It is that"));
            }
        }

        return pairs;
    }

    #[test]
    fn full_form_decodes_into_a_valid_draft() {
        let draft = draft_from_form(&full_form());

        assert_eq!(draft.title, "Science Night");
        assert_eq!(draft.categories.len(), 5);
        assert_eq!(draft.theme.name, "Royal Purple");
        assert_eq!(draft.theme.border_radius, 12);
        assert!(draft.validate().is_empty());
    }

    #[test]
    fn ids_from_hidden_fields_are_preserved() {
        let draft = draft_from_form(&full_form());

        assert_eq!(draft.categories[0].id, "cat0");
        assert_eq!(draft.categories[3].questions[2].id, "q3-2");
    }

    #[test]
    fn missing_points_fall_back_to_the_fixed_ladder() {
        let mut pairs = full_form();
        pairs.retain(|(name, _)| name != "q_2_3_points");

        let draft = draft_from_form(&pairs);
        assert_eq!(draft.categories[2].questions[3].points, 400);
    }

    #[test]
    fn custom_theme_fields_override_the_builtin_copy() {
        let mut pairs = full_form();
        pairs.push(pair("theme_card_color", "#123456"));
        pairs.push(pair("theme_border_radius", "3"));

        let draft = draft_from_form(&pairs);
        assert_eq!(draft.theme.card_color, "#123456");
        assert_eq!(draft.theme.border_radius, 3);
        // Untouched fields keep the builtin palette's values.
        assert_eq!(draft.theme.header_color, "#8b5cf6");
    }

    #[test]
    fn switching_the_palette_applies_its_colors() {
        // The inputs still carry Classic Blue's colors; the select has
        // moved on to Emerald Green.
        let mut pairs = full_form();
        pairs.retain(|(name, _)| name != "theme_name");
        pairs.push(pair("theme_name", "Emerald Green"));
        pairs.push(pair("theme_applied", "Classic Blue"));
        pairs.push(pair("theme_card_color", "#1e40af"));
        pairs.push(pair("theme_header_color", "#3b82f6"));
        pairs.push(pair("theme_border_radius", "8"));

        let draft = draft_from_form(&pairs);
        assert_eq!(draft.theme.name, "Emerald Green");
        assert_eq!(draft.theme.card_color, "#059669");
        assert_eq!(draft.theme.header_color, "#10b981");
        assert_eq!(draft.theme.border_radius, 6);
    }

    #[test]
    fn resubmitting_the_same_palette_keeps_customizations() {
        let mut pairs = full_form();
        pairs.push(pair("theme_applied", "Royal Purple"));
        pairs.push(pair("theme_card_color", "#123456"));

        let draft = draft_from_form(&pairs);
        assert_eq!(draft.theme.name, "Royal Purple");
        assert_eq!(draft.theme.card_color, "#123456");
    }

    #[test]
    fn empty_form_yields_an_invalid_draft() {
        let draft = draft_from_form(&[]);

        assert!(draft.categories.is_empty());
        assert!(!draft.validate().is_empty());
    }

    #[test]
    fn add_and_remove_category_actions_respect_the_bounds() {
        let mut draft = draft_from_form(&full_form());

        apply_form_action(&mut draft, "add_category");
        assert_eq!(draft.categories.len(), 6);

        apply_form_action(&mut draft, "add_category");
        assert_eq!(draft.categories.len(), 6);

        apply_form_action(&mut draft, "remove_category_5");
        assert_eq!(draft.categories.len(), 5);

        apply_form_action(&mut draft, "remove_category_0");
        assert_eq!(draft.categories.len(), 5);

        apply_form_action(&mut draft, "remove_category_junk");
        assert_eq!(draft.categories.len(), 5);
    }
}
