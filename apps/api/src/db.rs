use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

const MAX_CONNECTIONS: u32 = 10;

/// Creates the shared PostgreSQL pool. The schema is managed by Supabase.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established ({MAX_CONNECTIONS} connections)");
    Ok(pool)
}

/// Text hashed into the advisory lock id for one user and one kind of write.
pub fn advisory_key(scope: &str, user_id: Uuid) -> String {
    format!("{scope}:{user_id}")
}

/// Blocks until no other transaction holds the `scope` lock for `user_id`.
/// The lock is released on commit or rollback.
pub async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    scope: &str,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(advisory_key(scope, user_id))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_key_separates_scopes_and_users() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_eq!(advisory_key("daily_login", a), advisory_key("daily_login", a));
        assert_ne!(advisory_key("daily_login", a), advisory_key("daily_login", b));
        assert_ne!(advisory_key("daily_login", a), advisory_key("dream_draft", a));
    }
}
