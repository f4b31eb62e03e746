//! Read-only access to stored mail bodies.

use async_trait::async_trait;
use sqlx::PgPool;

use mailwatch_common::error::AppError;
use mailwatch_common::types::StoredMail;

/// Lookup of mail bodies by id.
#[async_trait]
pub trait MailStore: Send + Sync {
    async fn find_mail(&self, email_id: i64) -> Result<Option<StoredMail>, AppError>;
}

/// `MailStore` backed by the webmail's `email` table.
#[derive(Clone)]
pub struct PgMailStore {
    pool: PgPool,
}

impl PgMailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MailStore for PgMailStore {
    async fn find_mail(&self, email_id: i64) -> Result<Option<StoredMail>, AppError> {
        let mail: Option<StoredMail> =
            sqlx::query_as("SELECT email_id, content, text FROM email WHERE email_id = $1")
                .bind(email_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(mail)
    }
}
