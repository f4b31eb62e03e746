//! Named send operations, one per lifecycle event.
//!
//! Every operation renders the event, attaches a preview button for mail
//! events, and hands the result to the dispatcher. None of them can fail:
//! callers invoke them after their own work has committed, usually through
//! [`TelegramService::spawn_notify`].

use std::sync::Arc;

use tokio::task::JoinHandle;

use mailwatch_common::config::AppConfig;
use mailwatch_common::error::AppError;
use mailwatch_common::types::{
    AddressAddedEvent, AddressDeletedEvent, AdminDeleteEvent, DestinationConfig,
    FailedLoginEvent, LoginEvent, MailDeletedEvent, MailInfo, MailReceivedEvent, MailSentEvent,
    NotificationEvent, NotificationSettings, PasswordResetEvent, QuotaKind, QuotaWarningEvent,
    RegisterEvent, RoleChangedEvent, RoleInfo, SelfDeleteEvent, StatusChangedEvent, UserContext,
};

use crate::compose::{ActionButton, MessageComposer, RenderedMessage};
use crate::dispatcher::TelegramDispatcher;
use crate::link_token::{LinkSigner, PREVIEW_FALLBACK_URL, preview_url};

pub const PREVIEW_BUTTON_LABEL: &str = "Check";

/// Entry point for all Telegram notifications.
#[derive(Clone)]
pub struct TelegramService {
    dispatcher: TelegramDispatcher,
    signer: LinkSigner,
}

impl TelegramService {
    pub fn new(dispatcher: TelegramDispatcher, signer: LinkSigner) -> Self {
        Self { dispatcher, signer }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let dispatcher = TelegramDispatcher::new(config.telegram_api_base.clone())?;
        let signer = LinkSigner::new(&config.jwt_secret, config.link_token_expiry_hours);
        Ok(Self::new(dispatcher, signer))
    }

    pub fn signer(&self) -> &LinkSigner {
        &self.signer
    }

    /// Render `event`, with a preview button when it concerns a single mail.
    pub fn render(
        &self,
        settings: &NotificationSettings,
        event: &NotificationEvent,
    ) -> RenderedMessage {
        let message = MessageComposer::new(settings.display).render(event);
        match event.preview_mail_id() {
            Some(email_id) => {
                message.with_button(self.preview_button(&settings.destination, email_id))
            }
            None => message,
        }
    }

    fn preview_button(&self, destination: &DestinationConfig, email_id: i64) -> ActionButton {
        let url = match destination.custom_domain.as_deref() {
            Some(domain) => match self.signer.issue(email_id) {
                Ok(token) => preview_url(domain, &token),
                Err(e) => {
                    tracing::warn!(email_id, error = %e, "Falling back to placeholder preview link");
                    PREVIEW_FALLBACK_URL.to_string()
                }
            },
            None => PREVIEW_FALLBACK_URL.to_string(),
        };

        ActionButton {
            label: PREVIEW_BUTTON_LABEL.to_string(),
            url,
        }
    }

    /// Render and deliver one event to every configured chat.
    pub async fn notify(&self, settings: &NotificationSettings, event: &NotificationEvent) {
        if !settings.destination.is_enabled() {
            tracing::debug!(event = event.kind(), "Telegram not configured, notification skipped");
            return;
        }

        let message = self.render(settings, event);
        tracing::info!(
            event = event.kind(),
            destinations = settings.destination.chat_ids.len(),
            "Sending Telegram notification"
        );
        self.dispatcher.dispatch(&settings.destination, &message).await;
    }

    /// Fire-and-forget variant of [`notify`](Self::notify) for use after the
    /// triggering operation has completed.
    pub fn spawn_notify(
        self: &Arc<Self>,
        settings: NotificationSettings,
        event: NotificationEvent,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.notify(&settings, &event).await })
    }

    pub async fn send_email_to_bot(&self, settings: &NotificationSettings, mail: MailInfo) {
        let event = NotificationEvent::MailReceived(MailReceivedEvent { mail });
        self.notify(settings, &event).await;
    }

    pub async fn send_email_sent_notification(
        &self,
        settings: &NotificationSettings,
        mail: MailInfo,
        user: UserContext,
        sent_count: Option<u32>,
    ) {
        let event = NotificationEvent::MailSent(MailSentEvent {
            mail,
            user,
            sent_count,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_email_delete_notification(
        &self,
        settings: &NotificationSettings,
        email_ids: Vec<i64>,
        user: UserContext,
    ) {
        let event = NotificationEvent::MailDeleted(MailDeletedEvent { user, email_ids });
        self.notify(settings, &event).await;
    }

    pub async fn send_add_address_notification(
        &self,
        settings: &NotificationSettings,
        address: String,
        name: String,
        user: UserContext,
        total: u32,
    ) {
        let event = NotificationEvent::AddressAdded(AddressAddedEvent {
            user,
            address,
            name,
            total,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_delete_address_notification(
        &self,
        settings: &NotificationSettings,
        address: String,
        user: UserContext,
        remaining: u32,
    ) {
        let event = NotificationEvent::AddressDeleted(AddressDeletedEvent {
            user,
            address,
            remaining,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_login_notification(&self, settings: &NotificationSettings, user: UserContext) {
        let event = NotificationEvent::Login(LoginEvent { user });
        self.notify(settings, &event).await;
    }

    pub async fn send_register_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        address_count: u32,
    ) {
        let event = NotificationEvent::Register(RegisterEvent {
            user,
            address_count,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_role_change_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        old_role: RoleInfo,
        new_role: RoleInfo,
        admin: String,
    ) {
        let event = NotificationEvent::RoleChanged(RoleChangedEvent {
            user,
            old_role,
            new_role,
            admin,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_status_change_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        old_status: i64,
        new_status: i64,
        admin: String,
    ) {
        let event = NotificationEvent::StatusChanged(StatusChangedEvent {
            user,
            old_status,
            new_status,
            admin,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_password_reset_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
    ) {
        let event = NotificationEvent::PasswordReset(PasswordResetEvent { user });
        self.notify(settings, &event).await;
    }

    pub async fn send_self_delete_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        address_count: u32,
        mail_count: u32,
    ) {
        let event = NotificationEvent::SelfDelete(SelfDeleteEvent {
            user,
            address_count,
            mail_count,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_admin_delete_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        address_count: u32,
        mail_count: u32,
        admin: String,
    ) {
        let event = NotificationEvent::AdminDelete(AdminDeleteEvent {
            user,
            address_count,
            mail_count,
            admin,
        });
        self.notify(settings, &event).await;
    }

    pub async fn send_failed_login_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        attempts: u32,
    ) {
        let event = NotificationEvent::FailedLogin(FailedLoginEvent { user, attempts });
        self.notify(settings, &event).await;
    }

    pub async fn send_quota_warning_notification(
        &self,
        settings: &NotificationSettings,
        user: UserContext,
        kind: QuotaKind,
        used: u32,
    ) {
        let event = NotificationEvent::QuotaWarning(QuotaWarningEvent { user, kind, used });
        self.notify(settings, &event).await;
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;

    use mailwatch_common::types::DisplaySettings;

    use super::*;

    const SECRET: &str = "service-test-secret";

    fn service(api_base: &str) -> Arc<TelegramService> {
        let dispatcher = TelegramDispatcher::new(api_base).unwrap();
        Arc::new(TelegramService::new(
            dispatcher,
            LinkSigner::new(SECRET, 24),
        ))
    }

    fn settings(chats: &str, custom_domain: Option<&str>) -> NotificationSettings {
        NotificationSettings {
            destination: DestinationConfig::new(
                Some("42:token".to_string()),
                Some(chats),
                custom_domain.map(str::to_string),
            ),
            display: DisplaySettings::default(),
        }
    }

    fn user() -> UserContext {
        UserContext {
            email: "alice@example.com".to_string(),
            ..UserContext::default()
        }
    }

    fn mail() -> MailInfo {
        MailInfo {
            email_id: 77,
            send_email: "bob@example.org".to_string(),
            subject: "Hello".to_string(),
            ..MailInfo::default()
        }
    }

    #[test]
    fn test_preview_button_signs_mail_id() {
        let svc = service("http://127.0.0.1:9");
        let event = NotificationEvent::MailReceived(MailReceivedEvent { mail: mail() });
        let message = svc.render(&settings("1", Some("mail.example.com")), &event);

        let button = message.button().unwrap();
        assert_eq!(button.label, "Check");
        let prefix = "https://mail.example.com/api/telegram/getEmail/";
        assert!(button.url.starts_with(prefix));
        let token = &button.url[prefix.len()..];
        assert_eq!(svc.signer().verify(token), Some(77));
    }

    #[test]
    fn test_preview_button_fallback_without_domain() {
        let svc = service("http://127.0.0.1:9");
        let event = NotificationEvent::MailSent(MailSentEvent {
            mail: mail(),
            user: user(),
            sent_count: None,
        });
        let message = svc.render(&settings("1", None), &event);
        assert_eq!(message.button().unwrap().url, PREVIEW_FALLBACK_URL);
    }

    #[test]
    fn test_unsignable_link_falls_back() {
        let dispatcher = TelegramDispatcher::new("http://127.0.0.1:9").unwrap();
        let svc = TelegramService::new(dispatcher, LinkSigner::new(SECRET, u64::MAX));
        let event = NotificationEvent::MailReceived(MailReceivedEvent { mail: mail() });
        let message = svc.render(&settings("1", Some("mail.example.com")), &event);
        assert_eq!(message.button().unwrap().url, PREVIEW_FALLBACK_URL);
    }

    #[test]
    fn test_account_events_have_no_button() {
        let svc = service("http://127.0.0.1:9");
        let event = NotificationEvent::Login(LoginEvent { user: user() });
        let message = svc.render(&settings("1", Some("mail.example.com")), &event);
        assert!(message.button().is_none());
    }

    #[tokio::test]
    async fn test_login_notification_reaches_every_chat() {
        let server = MockServer::start();
        let send = server.mock(|when, then| {
            when.method(POST).path("/bot42:token/sendMessage");
            then.status(200);
        });

        let svc = service(&server.base_url());
        svc.send_login_notification(&settings("10, 20", None), user())
            .await;

        send.assert_calls(2);
    }

    #[tokio::test]
    async fn test_disabled_settings_send_nothing() {
        let server = MockServer::start();
        let send = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let svc = service(&server.base_url());
        let disabled = NotificationSettings::default();
        svc.send_failed_login_notification(&disabled, user(), 5)
            .await;

        send.assert_calls(0);
    }

    #[tokio::test]
    async fn test_spawned_notification_swallows_failures() {
        let server = MockServer::start();
        let send = server.mock(|when, then| {
            when.method(POST).path("/bot42:token/sendMessage");
            then.status(500).body("boom");
        });

        let svc = service(&server.base_url());
        let event = NotificationEvent::PasswordReset(PasswordResetEvent { user: user() });
        let handle = svc.spawn_notify(settings("1,2,3", None), event);

        assert!(handle.await.is_ok());
        send.assert_calls(3);
    }
}
