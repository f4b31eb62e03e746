use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How a role restricts outgoing mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendLimitKind {
    /// `send_count` messages per day
    Day,
    /// `send_count` messages in total
    Count,
    /// Sending is disabled
    Ban,
    /// Only delivery to addresses hosted on this instance
    Internal,
}

impl std::fmt::Display for SendLimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendLimitKind::Day => write!(f, "day"),
            SendLimitKind::Count => write!(f, "count"),
            SendLimitKind::Ban => write!(f, "ban"),
            SendLimitKind::Internal => write!(f, "internal"),
        }
    }
}

/// Permissions attached to a user's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub name: String,
    /// Send allowance; 0 means unlimited
    #[serde(default)]
    pub send_count: u32,
    pub send_type: SendLimitKind,
    /// Maximum number of addresses; 0 means unlimited
    #[serde(default)]
    pub account_count: u32,
}

impl RoleInfo {
    /// The numeric send limit used for quota accounting, if the role has one.
    pub fn send_limit(&self) -> Option<u32> {
        match self.send_type {
            SendLimitKind::Day | SendLimitKind::Count if self.send_count > 0 => {
                Some(self.send_count)
            }
            _ => None,
        }
    }

    pub fn address_limit(&self) -> Option<u32> {
        (self.account_count > 0).then_some(self.account_count)
    }
}

/// The account an event is about, as seen at the time of the event.
///
/// Every field except `email` is optional; the composer substitutes
/// placeholders for anything missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub email: String,
    pub active_ip: Option<String>,
    pub create_ip: Option<String>,
    pub device: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub active_time: Option<DateTime<Utc>>,
    /// IANA timezone id, resolved upstream from the activity IP
    pub timezone: Option<String>,
    pub role: Option<RoleInfo>,
    pub login_count: Option<u32>,
}

/// Metadata of a stored mail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailInfo {
    pub email_id: i64,
    /// Sender address
    pub send_email: String,
    /// Sender display name
    pub name: String,
    /// Recipient address of an incoming mail
    pub to_email: String,
    /// Recipient addresses of an outgoing mail
    pub recipients: Vec<String>,
    pub subject: String,
    pub text: Option<String>,
    /// HTML body
    pub content: Option<String>,
    pub attachment_count: u32,
    pub create_time: Option<DateTime<Utc>>,
}

/// The stored body of a mail, as read by the preview page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMail {
    pub email_id: i64,
    pub content: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailReceivedEvent {
    pub mail: MailInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSentEvent {
    pub mail: MailInfo,
    pub user: UserContext,
    /// Messages sent within the current quota window, including this one
    #[serde(default)]
    pub sent_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailDeletedEvent {
    pub user: UserContext,
    pub email_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressAddedEvent {
    pub user: UserContext,
    pub address: String,
    #[serde(default)]
    pub name: String,
    /// Address count after the addition
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressDeletedEvent {
    pub user: UserContext,
    pub address: String,
    /// Address count after the removal
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginEvent {
    pub user: UserContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEvent {
    pub user: UserContext,
    pub address_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangedEvent {
    pub user: UserContext,
    pub old_role: RoleInfo,
    pub new_role: RoleInfo,
    /// Email of the administrator who made the change
    pub admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub user: UserContext,
    pub old_status: i64,
    pub new_status: i64,
    pub admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetEvent {
    pub user: UserContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfDeleteEvent {
    pub user: UserContext,
    pub address_count: u32,
    pub mail_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDeleteEvent {
    pub user: UserContext,
    pub address_count: u32,
    pub mail_count: u32,
    pub admin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedLoginEvent {
    pub user: UserContext,
    pub attempts: u32,
}

/// Which allowance a quota warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    Send,
    Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaWarningEvent {
    pub user: UserContext,
    pub kind: QuotaKind,
    /// Amount consumed so far; the limit comes from `user.role`
    pub used: u32,
}

/// Account and mail lifecycle events that produce a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    MailReceived(MailReceivedEvent),
    MailSent(MailSentEvent),
    MailDeleted(MailDeletedEvent),
    AddressAdded(AddressAddedEvent),
    AddressDeleted(AddressDeletedEvent),
    Login(LoginEvent),
    Register(RegisterEvent),
    RoleChanged(RoleChangedEvent),
    StatusChanged(StatusChangedEvent),
    PasswordReset(PasswordResetEvent),
    SelfDelete(SelfDeleteEvent),
    AdminDelete(AdminDeleteEvent),
    FailedLogin(FailedLoginEvent),
    QuotaWarning(QuotaWarningEvent),
}

impl NotificationEvent {
    /// Stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::MailReceived(_) => "mail_received",
            NotificationEvent::MailSent(_) => "mail_sent",
            NotificationEvent::MailDeleted(_) => "mail_deleted",
            NotificationEvent::AddressAdded(_) => "address_added",
            NotificationEvent::AddressDeleted(_) => "address_deleted",
            NotificationEvent::Login(_) => "login",
            NotificationEvent::Register(_) => "register",
            NotificationEvent::RoleChanged(_) => "role_changed",
            NotificationEvent::StatusChanged(_) => "status_changed",
            NotificationEvent::PasswordReset(_) => "password_reset",
            NotificationEvent::SelfDelete(_) => "self_delete",
            NotificationEvent::AdminDelete(_) => "admin_delete",
            NotificationEvent::FailedLogin(_) => "failed_login",
            NotificationEvent::QuotaWarning(_) => "quota_warning",
        }
    }

    /// The mail a "preview" button should open, for events that have one.
    pub fn preview_mail_id(&self) -> Option<i64> {
        match self {
            NotificationEvent::MailReceived(e) => Some(e.mail.email_id),
            NotificationEvent::MailSent(e) => Some(e.mail.email_id),
            _ => None,
        }
    }
}

/// How the sender of an incoming mail is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FromDisplay {
    Hide,
    OnlyName,
    Show,
}

impl FromStr for FromDisplay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hide" => Ok(FromDisplay::Hide),
            "only-name" => Ok(FromDisplay::OnlyName),
            "show" => Ok(FromDisplay::Show),
            other => Err(AppError::Config(format!(
                "invalid from-display mode '{}', expected hide|only-name|show",
                other
            ))),
        }
    }
}

/// Show/hide switch for the recipient line and the body preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hide,
    Show,
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hide" => Ok(Visibility::Hide),
            "show" => Ok(Visibility::Show),
            other => Err(AppError::Config(format!(
                "invalid display mode '{}', expected hide|show",
                other
            ))),
        }
    }
}

/// Presentation switches for incoming-mail notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub msg_from: FromDisplay,
    pub msg_to: Visibility,
    pub msg_text: Visibility,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            msg_from: FromDisplay::Show,
            msg_to: Visibility::Show,
            msg_text: Visibility::Hide,
        }
    }
}

/// Where notifications are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub bot_token: Option<String>,
    pub chat_ids: Vec<String>,
    /// Public domain of the web UI, used for preview links
    pub custom_domain: Option<String>,
}

impl DestinationConfig {
    /// Build a config from raw setting values. `chat_id_list` is comma-separated.
    pub fn new(
        bot_token: Option<String>,
        chat_id_list: Option<&str>,
        custom_domain: Option<String>,
    ) -> Self {
        Self {
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
            chat_ids: chat_id_list.map(Self::parse_chat_ids).unwrap_or_default(),
            custom_domain: custom_domain.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Split a comma-separated chat id list, trimming each id and dropping empty entries.
    pub fn parse_chat_ids(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns the bot token when notifications are enabled.
    pub fn active_token(&self) -> Option<&str> {
        match self.bot_token.as_deref() {
            Some(token) if !token.is_empty() && !self.chat_ids.is_empty() => Some(token),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.active_token().is_some()
    }
}

/// Everything a send operation reads from settings, resolved once per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub destination: DestinationConfig,
    pub display: DisplaySettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_ids_trims_and_skips_empty() {
        assert_eq!(
            DestinationConfig::parse_chat_ids("1, 2,3"),
            vec!["1".to_string(), "2".to_string(), "3".to_string()]
        );
        assert_eq!(
            DestinationConfig::parse_chat_ids(" -100200 ,, "),
            vec!["-100200".to_string()]
        );
    }

    #[test]
    fn test_destination_disabled_without_token_or_chats() {
        let no_token = DestinationConfig::new(Some("  ".to_string()), Some("1,2"), None);
        assert!(!no_token.is_enabled());

        let no_chats = DestinationConfig::new(Some("abc".to_string()), Some(""), None);
        assert!(!no_chats.is_enabled());

        let enabled = DestinationConfig::new(Some("abc".to_string()), Some("1"), None);
        assert_eq!(enabled.active_token(), Some("abc"));
    }

    #[test]
    fn test_role_limits() {
        let role = RoleInfo {
            name: "member".to_string(),
            send_count: 10,
            send_type: SendLimitKind::Day,
            account_count: 0,
        };
        assert_eq!(role.send_limit(), Some(10));
        assert_eq!(role.address_limit(), None);

        let banned = RoleInfo {
            send_type: SendLimitKind::Ban,
            ..role
        };
        assert_eq!(banned.send_limit(), None);
    }

    #[test]
    fn test_display_modes_parse() {
        assert_eq!("only-name".parse::<FromDisplay>().unwrap(), FromDisplay::OnlyName);
        assert_eq!(" show ".parse::<Visibility>().unwrap(), Visibility::Show);
        assert!("maybe".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_event_deserializes_from_tagged_json() {
        let event: NotificationEvent = serde_json::from_value(serde_json::json!({
            "type": "failed_login",
            "user": { "email": "a@example.com", "active_ip": "1.2.3.4" },
            "attempts": 3
        }))
        .unwrap();
        assert_eq!(event.kind(), "failed_login");
        assert!(event.preview_mail_id().is_none());
    }
}
