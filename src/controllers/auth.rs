use super::utils::{self, Flash};

use crate::{
    auth::{ProfileUpdate, Registration, SignIn},
    models::User,
    prelude::*,
};

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout))
        .route("/reset-password", get(reset_form).post(reset))
        .route("/profile", get(profile_form).post(update_profile));
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    signed_in: bool,
    flash: Option<Flash>,
}

async fn login_form(session: Session) -> Result<Response> {
    if utils::signed_in(&session)? {
        return Ok(Redirect::to("/").into_response());
    }

    return Ok(LoginTemplate {
        signed_in: false,
        flash: utils::take_flash(&session)?,
    }
    .into_response());
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<LoginForm>,
) -> Result<Response> {
    if utils::signed_in(&session)? {
        return Ok(Redirect::to("/").into_response());
    }

    match state.auth().sign_in(&body.email, &body.password).await? {
        SignIn::Ok(user) => {
            utils::establish(&session, &user)?;
            return Ok(Redirect::to("/").into_response());
        }
        SignIn::BadCredentials => {
            utils::flash_error(&session, "Invalid email or password")?;
            return Ok(Redirect::to("/login").into_response());
        }
    }
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    signed_in: bool,
    flash: Option<Flash>,
}

async fn register_form(session: Session) -> Result<Response> {
    if utils::signed_in(&session)? {
        return Ok(Redirect::to("/").into_response());
    }

    return Ok(RegisterTemplate {
        signed_in: false,
        flash: utils::take_flash(&session)?,
    }
    .into_response());
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    full_name: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn register(
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<RegisterForm>,
) -> Result<Response> {
    if utils::signed_in(&session)? {
        return Ok(Redirect::to("/").into_response());
    }

    if body.password != body.confirm_password {
        utils::flash_error(&session, "Passwords do not match")?;
        return Ok(Redirect::to("/register").into_response());
    }

    if body.password.is_empty() {
        utils::flash_error(&session, "Password is required")?;
        return Ok(Redirect::to("/register").into_response());
    }

    let registration = state
        .auth()
        .register(&body.email, &body.password, Some(&body.full_name))
        .await?;

    match registration {
        Registration::Created(user) => {
            utils::establish(&session, &user)?;
            return Ok(Redirect::to("/").into_response());
        }
        Registration::EmailTaken => {
            utils::flash_error(&session, "An account with that email already exists")?;
            return Ok(Redirect::to("/register").into_response());
        }
    }
}

/// Tears the session down no matter what; a failure while notifying the
/// rest of the app is logged, never surfaced.
async fn logout(session: Session, State(state): State<AppState>) -> Result<Response> {
    match utils::current_user(&state, &session).await {
        Ok(Some(user)) => state.auth().signed_out(&user.id),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "sign out continued despite lookup failure"),
    }

    session.clear();

    return Ok(Redirect::to("/login").into_response());
}

#[derive(Template)]
#[template(path = "reset-password.html")]
struct ResetPasswordTemplate {
    signed_in: bool,
    flash: Option<Flash>,
}

async fn reset_form(session: Session) -> Result<Response> {
    if utils::signed_in(&session)? {
        return Ok(Redirect::to("/").into_response());
    }

    return Ok(ResetPasswordTemplate {
        signed_in: false,
        flash: utils::take_flash(&session)?,
    }
    .into_response());
}

#[derive(Debug, Deserialize)]
struct ResetForm {
    email: String,
}

async fn reset(
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<ResetForm>,
) -> Result<Response> {
    state.auth().reset_password(&body.email).await?;

    utils::flash_success(
        &session,
        "If an account exists for that address, a reset link has been issued",
    )?;

    return Ok(Redirect::to("/reset-password").into_response());
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    signed_in: bool,
    flash: Option<Flash>,
    user: User,
}

async fn profile_form(session: Session, State(state): State<AppState>) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    return Ok(ProfileTemplate {
        signed_in: true,
        flash: utils::take_flash(&session)?,
        user,
    }
    .into_response());
}

#[derive(Debug, Deserialize)]
struct ProfileForm {
    full_name: String,
    avatar_url: String,
}

async fn update_profile(
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<ProfileForm>,
) -> Result<Response> {
    let Some(user) = utils::current_user(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let updates = ProfileUpdate {
        full_name: Some(body.full_name),
        avatar_url: Some(body.avatar_url),
    };

    match state.auth().update_profile(&user.id, updates).await {
        Ok(_) => utils::flash_success(&session, "Profile updated successfully")?,
        Err(e) => {
            tracing::warn!(error = %e, "profile update failed");
            utils::flash_error(&session, "Failed to update profile")?;
        }
    }

    return Ok(Redirect::to("/profile").into_response());
}
