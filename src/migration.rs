//! Database schema setup
//!
//! Creates the tables used by the shared backend. The settings bag is a
//! JSONB column, so new subscriber settings never require a migration;
//! only structurally new storage would.

use crate::core::BotCore;
use crate::errors::BotCoreError;

const CREATE_BOT_USERS: &str = "
    CREATE TABLE IF NOT EXISTS bot_users (
        id             BIGINT PRIMARY KEY,
        username       TEXT,
        first_contact  TIMESTAMPTZ NOT NULL,
        language       TEXT NOT NULL,
        settings       JSONB NOT NULL DEFAULT '{}'::jsonb
    )";

const CREATE_BOT_USERS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_bot_users_first_contact ON bot_users (first_contact)";

const CREATE_PUSH_MARKER: &str = "
    CREATE TABLE IF NOT EXISTS push_marker (
        id         BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
        last_push  TIMESTAMPTZ NOT NULL
    )";

impl BotCore {
    /// Create the shared-backend schema if it does not exist yet.
    /// Errors with [`BotCoreError::NoDatabase`] under the file backend.
    pub async fn setup_schema(&self) -> Result<(), BotCoreError> {
        let pool = self.pool().ok_or(BotCoreError::NoDatabase)?;

        for ddl in [CREATE_BOT_USERS, CREATE_BOT_USERS_INDEX, CREATE_PUSH_MARKER] {
            sqlx::query(ddl).execute(pool).await?;
        }
        Ok(())
    }
}
