use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::{
    models::{User, USER_COLUMNS},
    prelude::*,
};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Auth state changes, published on an in-process channel. The host
/// subscribes exactly once at startup; a lagging or dropped receiver is
/// never an error for the publisher.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    ProfileUpdated { user_id: String },
}

pub type AuthEvents = broadcast::Sender<AuthEvent>;

pub enum Registration {
    Created(User),
    EmailTaken,
}

pub enum SignIn {
    Ok(User),
    BadCredentials,
}

#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct AuthStore<'a> {
    db: &'a PgPool,
    events: &'a AuthEvents,
}

impl AppState {
    pub fn auth(&self) -> AuthStore<'_> {
        return AuthStore {
            db: &self.db,
            events: &self.auth_events,
        };
    }
}

impl<'a> AuthStore<'a> {
    fn ensure_available(&self) -> Result {
        if self.db.is_closed() {
            return Err(anyhow::anyhow!(
                "database connection pool is closed; check DATABASE_URL before retrying"
            )
            .into());
        }
        return Ok(());
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Registration> {
        self.ensure_available()?;

        let email = email.trim().to_lowercase();

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(self.db)
            .await?;

        if existing.is_some() {
            return Ok(Registration::EmailTaken);
        }

        let password_hash = hash_password(password)?;

        let user: User = sqlx::query_as(&format!(
            "INSERT INTO users (id, email, password_hash, full_name) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(nanoid!())
        .bind(&email)
        .bind(&password_hash)
        .bind(full_name.map(|n| n.trim()).filter(|n| !n.is_empty()))
        .fetch_one(self.db)
        .await?;

        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: user.id.clone(),
        });

        return Ok(Registration::Created(user));
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn> {
        self.ensure_available()?;

        let email = email.trim().to_lowercase();

        let found: Option<(String, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(self.db)
                .await?;

        let Some((user_id, password_hash)) = found else {
            return Ok(SignIn::BadCredentials);
        };

        if !verify_password(password, &password_hash) {
            return Ok(SignIn::BadCredentials);
        }

        let user = self
            .find(&user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user row vanished while signing in"))?;

        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: user.id.clone(),
        });

        return Ok(SignIn::Ok(user));
    }

    /// Publishes the sign-out event. Session teardown happens at the
    /// controller regardless of what this store reports.
    pub fn signed_out(&self, user_id: &str) {
        let _ = self.events.send(AuthEvent::SignedOut {
            user_id: user_id.to_string(),
        });
    }

    /// Issues a reset token for the address if it belongs to a user.
    /// The outcome is identical either way so the endpoint cannot be
    /// used to enumerate accounts.
    pub async fn reset_password(&self, email: &str) -> Result {
        self.ensure_available()?;

        let email = email.trim().to_lowercase();

        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(self.db)
            .await?;

        let Some((user_id,)) = found else {
            tracing::debug!("password reset requested for unknown address");
            return Ok(());
        };

        let token = nanoid!();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(&user_id)
            .bind(expires_at)
            .execute(self.db)
            .await?;

        // No mailer is wired up; the token is logged for the operator.
        tracing::info!(%user_id, %token, "password reset token issued");

        return Ok(());
    }

    /// Applies the submitted fields; a blank or omitted field keeps the
    /// stored value via the `COALESCE`.
    pub async fn update_profile(&self, user_id: &str, updates: ProfileUpdate) -> Result<User> {
        self.ensure_available()?;

        let user: User = sqlx::query_as(&format!(
            "UPDATE users SET full_name = COALESCE($2, full_name), avatar_url = COALESCE($3, avatar_url) WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(submitted_field(updates.full_name))
        .bind(submitted_field(updates.avatar_url))
        .fetch_one(self.db)
        .await?;

        let _ = self.events.send(AuthEvent::ProfileUpdated {
            user_id: user.id.clone(),
        });

        return Ok(user);
    }

    pub async fn find(&self, user_id: &str) -> Result<Option<User>> {
        self.ensure_available()?;

        let found: Option<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(self.db)
                .await?;

        return Ok(found);
    }
}

fn submitted_field(value: Option<String>) -> Option<String> {
    return value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    return Ok(hash.to_string());
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        tracing::warn!("stored password hash is malformed");
        return false;
    };

    return Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verifies_against_its_own_hash() {
        let hash = hash_password("hunter2").unwrap();

        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn blank_profile_fields_keep_the_stored_values() {
        assert_eq!(submitted_field(Some("   ".to_string())), None);
        assert_eq!(submitted_field(Some("".to_string())), None);
        assert_eq!(submitted_field(None), None);

        assert_eq!(
            submitted_field(Some(" Ada Lovelace ".to_string())),
            Some("Ada Lovelace".to_string())
        );
    }
}
