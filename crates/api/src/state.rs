//! Shared application state for the Axum API server.

use std::sync::Arc;

use mailwatch_common::config::AppConfig;
use mailwatch_notifier::service::TelegramService;

use crate::store::MailStore;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub mail_store: Arc<dyn MailStore>,
    pub notifier: Arc<TelegramService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        mail_store: Arc<dyn MailStore>,
        notifier: Arc<TelegramService>,
        config: AppConfig,
    ) -> Self {
        Self {
            mail_store,
            notifier,
            config,
        }
    }
}
