use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{models::User, prelude::*};

const USER_ID_KEY: &str = "user_id";
const FLASH_KEY: &str = "flash";

pub fn establish(session: &Session, user: &User) -> Result {
    session.insert(USER_ID_KEY, user.id.clone())?;
    return Ok(());
}

pub fn signed_in(session: &Session) -> Result<bool> {
    return Ok(session.get::<String>(USER_ID_KEY)?.is_some());
}

/// Resolves the signed-in user from the cookie session. A cookie that
/// points at a user row that no longer exists is treated as signed out.
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<User>> {
    let Some(user_id) = session.get::<String>(USER_ID_KEY)? else {
        return Ok(None);
    };

    let found = state.auth().find(&user_id).await?;
    if found.is_none() {
        session.clear();
    }

    return Ok(found);
}

/// One-shot user-visible message, rendered (and auto-dismissed after a
/// few seconds) by the base template on the next page load.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Flash {
    pub kind: String,
    pub text: String,
}

pub fn flash_success(session: &Session, text: impl Into<String>) -> Result {
    return set_flash(session, "success", text.into());
}

pub fn flash_error(session: &Session, text: impl Into<String>) -> Result {
    return set_flash(session, "error", text.into());
}

fn set_flash(session: &Session, kind: &str, text: String) -> Result {
    session.insert(
        FLASH_KEY,
        Flash {
            kind: kind.to_string(),
            text,
        },
    )?;
    return Ok(());
}

pub fn take_flash(session: &Session) -> Result<Option<Flash>> {
    return Ok(session.remove::<Flash>(FLASH_KEY)?);
}
