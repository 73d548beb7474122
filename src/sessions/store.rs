use crate::prelude::*;

use sqlx::PgPool;
use tower_sessions::{CachingSessionStore, MokaStore, PostgresStore};

const SESSION_CACHE_CAPACITY: u64 = 2000;

/// Postgres-backed session store with an in-memory cache in front, so
/// the common case of an active session never touches the database.
pub async fn build(db: PgPool) -> Result<CachingSessionStore<MokaStore, PostgresStore>> {
    let db_session_store = PostgresStore::new(db);
    db_session_store.migrate().await?;

    let mem_session_store = MokaStore::new(Some(SESSION_CACHE_CAPACITY));

    return Ok(CachingSessionStore::new(
        mem_session_store,
        db_session_store,
    ));
}
