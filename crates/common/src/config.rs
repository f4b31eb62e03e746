use serde::Deserialize;

use crate::types::{
    DestinationConfig, DisplaySettings, FromDisplay, NotificationSettings, Visibility,
};

/// Longest accepted preview link lifetime (one year).
pub const MAX_LINK_TOKEN_EXPIRY_HOURS: u64 = 24 * 365;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Port the API server listens on (default: 3000)
    pub port: u16,

    /// Secret used to sign mail preview links
    pub jwt_secret: String,

    /// Preview link lifetime in hours (default: 24)
    pub link_token_expiry_hours: u64,

    /// Telegram bot token
    pub tg_bot_token: Option<String>,

    /// Comma-separated Telegram chat ids
    pub tg_chat_id: Option<String>,

    /// Public domain of the web UI, used to build preview links
    pub custom_domain: Option<String>,

    /// Object storage domain for inline resources in mail HTML
    pub r2_domain: Option<String>,

    /// Sender display mode for incoming mail: hide | only-name | show
    pub tg_msg_from: FromDisplay,

    /// Recipient display mode for incoming mail: hide | show
    pub tg_msg_to: Visibility,

    /// Body preview mode for incoming mail: hide | show
    pub tg_msg_text: Visibility,

    /// Telegram Bot API base URL
    pub telegram_api_base: String,

    /// Key required by the notification trigger endpoint; unset disables it
    pub notify_api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            link_token_expiry_hours: parse_expiry_hours(
                &std::env::var("LINK_TOKEN_EXPIRY_HOURS").unwrap_or_else(|_| "24".to_string()),
            )?,
            tg_bot_token: std::env::var("TG_BOT_TOKEN").ok(),
            tg_chat_id: std::env::var("TG_CHAT_ID").ok(),
            custom_domain: std::env::var("CUSTOM_DOMAIN").ok(),
            r2_domain: std::env::var("R2_DOMAIN").ok(),
            tg_msg_from: std::env::var("TG_MSG_FROM")
                .unwrap_or_else(|_| "show".to_string())
                .parse()?,
            tg_msg_to: std::env::var("TG_MSG_TO")
                .unwrap_or_else(|_| "show".to_string())
                .parse()?,
            tg_msg_text: std::env::var("TG_MSG_TEXT")
                .unwrap_or_else(|_| "hide".to_string())
                .parse()?,
            telegram_api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            notify_api_key: std::env::var("NOTIFY_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        })
    }

    /// Snapshot of the notification-related settings.
    pub fn notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            destination: DestinationConfig::new(
                self.tg_bot_token.clone(),
                self.tg_chat_id.as_deref(),
                self.custom_domain.clone(),
            ),
            display: DisplaySettings {
                msg_from: self.tg_msg_from,
                msg_to: self.tg_msg_to,
                msg_text: self.tg_msg_text,
            },
        }
    }
}

fn parse_expiry_hours(raw: &str) -> anyhow::Result<u64> {
    let hours: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("LINK_TOKEN_EXPIRY_HOURS must be a valid u64"))?;
    if hours == 0 || hours > MAX_LINK_TOKEN_EXPIRY_HOURS {
        anyhow::bail!(
            "LINK_TOKEN_EXPIRY_HOURS must be between 1 and {}",
            MAX_LINK_TOKEN_EXPIRY_HOURS
        );
    }
    Ok(hours)
}
