//! Mail preview opened from the Telegram "Check" button.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use mailwatch_common::error::AppError;
use mailwatch_notifier::pages::{ACCESS_DENIED, MAIL_NOT_FOUND, html_page, text_page};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/telegram/getEmail/{token}", get(get_email))
}

/// GET /api/telegram/getEmail/{token}: Render the mail named by a preview token.
///
/// Token problems are answered with a readable page rather than an error
/// status, since the page is shown directly inside Telegram.
async fn get_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Html<String>, AppError> {
    let Some(email_id) = state.notifier.signer().verify(&token) else {
        return Ok(Html(text_page(ACCESS_DENIED)));
    };

    let page = match state.mail_store.find_mail(email_id).await? {
        Some(mail) => match mail.content.as_deref().filter(|c| !c.is_empty()) {
            Some(content) => html_page(content, state.config.r2_domain.as_deref()),
            None => text_page(mail.text.as_deref().unwrap_or_default()),
        },
        None => {
            tracing::debug!(email_id, "Preview requested for missing mail");
            text_page(MAIL_NOT_FOUND)
        }
    };

    Ok(Html(page))
}
