//! Message composer: renders lifecycle events into Telegram HTML.
//!
//! Rendering never fails: a notification must not be able to break the
//! operation it reports on, so missing optional fields become `Unknown`
//! and an unresolvable timezone degrades to a UTC-only timestamp.

use chrono::{DateTime, Utc};

use mailwatch_common::types::{
    AddressAddedEvent, AddressDeletedEvent, AdminDeleteEvent, DisplaySettings, FailedLoginEvent,
    FromDisplay, LoginEvent, MailDeletedEvent, MailReceivedEvent, MailSentEvent,
    NotificationEvent, PasswordResetEvent, QuotaKind, QuotaWarningEvent, RegisterEvent,
    RoleChangedEvent, RoleInfo, SelfDeleteEvent, SendLimitKind, StatusChangedEvent, UserContext,
    Visibility,
};

use crate::text::{escape_html, excerpt, preview_source};
use crate::timefmt::time_block;

const UNKNOWN: &str = "Unknown";

/// Failed attempts at which the failed-login message carries a warning.
const FAILED_LOGIN_WARNING_THRESHOLD: u32 = 3;

/// Interactive button shown under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub url: String,
}

/// Final notification: HTML text plus an optional button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    text: String,
    button: Option<ActionButton>,
}

impl RenderedMessage {
    pub fn new(text: String) -> Self {
        Self { text, button: None }
    }

    pub fn with_button(self, button: ActionButton) -> Self {
        Self {
            text: self.text,
            button: Some(button),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn button(&self) -> Option<&ActionButton> {
        self.button.as_ref()
    }
}

/// Accumulates a titled message line by line.
struct MessageBuilder {
    text: String,
}

impl MessageBuilder {
    /// Start a message with a bold title followed by a blank line.
    fn titled(emoji: &str, title: &str) -> Self {
        Self {
            text: format!("{} <b>{}</b>\n", emoji, title),
        }
    }

    fn line(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.text.push('\n');
        self.text.push_str(line.as_ref());
        self
    }

    fn finish(self) -> String {
        self.text
    }
}

fn code(value: &str) -> String {
    format!("<code>{}</code>", escape_html(value))
}

fn or_unknown(value: Option<&String>) -> String {
    match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(v) => escape_html(v),
        None => UNKNOWN.to_string(),
    }
}

fn ip_of(user: &UserContext) -> String {
    match user.active_ip.as_deref().or(user.create_ip.as_deref()) {
        Some(ip) if !ip.is_empty() => code(ip),
        _ => UNKNOWN.to_string(),
    }
}

/// Device, OS and browser on separate lines.
fn device_lines(b: &mut MessageBuilder, user: &UserContext) {
    b.line(format!("📱 Device: {}", or_unknown(user.device.as_ref())))
        .line(format!("💻 OS: {}", or_unknown(user.os.as_ref())))
        .line(format!("🌐 Browser: {}", or_unknown(user.browser.as_ref())));
}

/// Device and OS on one line, used by mail and address events.
fn device_summary(user: &UserContext) -> String {
    format!(
        "💻 Device: {} / {}",
        or_unknown(user.device.as_ref()),
        or_unknown(user.os.as_ref())
    )
}

fn send_limit_text(role: &RoleInfo) -> String {
    match role.send_type {
        SendLimitKind::Day if role.send_count > 0 => format!("{} per day", role.send_count),
        SendLimitKind::Count if role.send_count > 0 => format!("{} total", role.send_count),
        SendLimitKind::Day | SendLimitKind::Count => "Unlimited".to_string(),
        SendLimitKind::Ban => "Sending banned".to_string(),
        SendLimitKind::Internal => "Internal delivery only".to_string(),
    }
}

fn address_limit_text(role: &RoleInfo) -> String {
    match role.address_limit() {
        Some(limit) => limit.to_string(),
        None => "Unlimited".to_string(),
    }
}

fn role_lines(b: &mut MessageBuilder, role: Option<&RoleInfo>) {
    if let Some(role) = role {
        b.line(format!("👤 Role: {}", escape_html(&role.name)))
            .line(format!("📤 Send Limit: {}", send_limit_text(role)))
            .line(format!("📬 Address Limit: {}", address_limit_text(role)));
    }
}

fn role_summary(role: &RoleInfo) -> String {
    format!(
        "{} (send: {}, addresses: {})",
        escape_html(&role.name),
        send_limit_text(role),
        address_limit_text(role)
    )
}

/// Label for an account status code.
pub fn status_label(code: i64) -> &'static str {
    match code {
        0 => "Active",
        1 => "Banned",
        _ => UNKNOWN,
    }
}

fn count_with_limit(count: u32, limit: Option<u32>) -> String {
    match limit {
        Some(limit) => format!("{} / {}", count, limit),
        None => count.to_string(),
    }
}

/// Share of `limit` still available, as a whole percentage.
pub fn remaining_percent(remaining: u32, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    (remaining as f64 / limit as f64 * 100.0).round() as u32
}

/// Renders [`NotificationEvent`]s into Telegram HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageComposer {
    display: DisplaySettings,
}

impl MessageComposer {
    pub fn new(display: DisplaySettings) -> Self {
        Self { display }
    }

    pub fn render(&self, event: &NotificationEvent) -> RenderedMessage {
        self.render_at(event, Utc::now())
    }

    /// Render with `now` standing in for the time of events that carry no
    /// timestamp of their own.
    pub fn render_at(&self, event: &NotificationEvent, now: DateTime<Utc>) -> RenderedMessage {
        let text = match event {
            NotificationEvent::MailReceived(e) => self.mail_received(e, now),
            NotificationEvent::MailSent(e) => Self::mail_sent(e, now),
            NotificationEvent::MailDeleted(e) => Self::mail_deleted(e, now),
            NotificationEvent::AddressAdded(e) => Self::address_added(e, now),
            NotificationEvent::AddressDeleted(e) => Self::address_deleted(e, now),
            NotificationEvent::Login(e) => Self::login(e, now),
            NotificationEvent::Register(e) => Self::register(e, now),
            NotificationEvent::RoleChanged(e) => Self::role_changed(e, now),
            NotificationEvent::StatusChanged(e) => Self::status_changed(e, now),
            NotificationEvent::PasswordReset(e) => Self::password_reset(e, now),
            NotificationEvent::SelfDelete(e) => Self::self_delete(e, now),
            NotificationEvent::AdminDelete(e) => Self::admin_delete(e, now),
            NotificationEvent::FailedLogin(e) => Self::failed_login(e, now),
            NotificationEvent::QuotaWarning(e) => Self::quota_warning(e, now),
        };
        RenderedMessage::new(text)
    }

    // Incoming mail never has a resolved timezone, so it is UTC only.
    fn mail_received(&self, e: &MailReceivedEvent, now: DateTime<Utc>) -> String {
        let mail = &e.mail;
        let mut b = MessageBuilder::titled("📥", "New Email");

        if self.display.msg_to == Visibility::Show {
            b.line(format!("📨 To: {}", code(&mail.to_email)));
        }

        let sender_name = if mail.name.trim().is_empty() {
            &mail.send_email
        } else {
            &mail.name
        };
        match self.display.msg_from {
            FromDisplay::Hide => {}
            FromDisplay::OnlyName => {
                b.line(format!("👤 From: {}", escape_html(sender_name)));
            }
            FromDisplay::Show => {
                b.line(format!(
                    "👤 From: {} &lt;{}&gt;",
                    escape_html(sender_name),
                    escape_html(&mail.send_email)
                ));
            }
        }

        b.line(format!("📝 Subject: <b>{}</b>", excerpt(&mail.subject)));

        if self.display.msg_text == Visibility::Show {
            let preview = preview_source(mail.text.as_deref(), mail.content.as_deref());
            if !preview.is_empty() {
                b.line(format!("💬 Preview: {}", excerpt(&preview)));
            }
        }

        if mail.attachment_count > 0 {
            b.line(format!("📎 Attachments: {}", mail.attachment_count));
        }

        b.line(time_block(mail.create_time.unwrap_or(now), None));
        b.finish()
    }

    fn mail_sent(e: &MailSentEvent, now: DateTime<Utc>) -> String {
        let mail = &e.mail;
        let user = &e.user;
        let recipients = mail.recipients.join(", ");
        let mut b = MessageBuilder::titled("📤", "Email Sent");

        b.line(format!("📧 From: {}", code(&mail.send_email)))
            .line(format!("📨 To: {}", code(&recipients)))
            .line(format!("📝 Subject: <b>{}</b>", excerpt(&mail.subject)));

        let preview = preview_source(mail.text.as_deref(), mail.content.as_deref());
        if !preview.is_empty() {
            b.line(format!("💬 Preview: {}", excerpt(&preview)));
        }

        if mail.attachment_count > 0 {
            b.line(format!("📎 Attachments: {}", mail.attachment_count));
        }

        let limit = user.role.as_ref().and_then(RoleInfo::send_limit);
        if let (Some(limit), Some(used)) = (limit, e.sent_count) {
            b.line(format!(
                "📊 Quota: {}/{} ({} remaining)",
                used,
                limit,
                limit.saturating_sub(used)
            ));
        }

        b.line(format!("📍 Sender IP: {}", ip_of(user)))
            .line(device_summary(user))
            .line(time_block(
                mail.create_time.unwrap_or(now),
                user.timezone.as_deref(),
            ));
        b.finish()
    }

    fn mail_deleted(e: &MailDeletedEvent, now: DateTime<Utc>) -> String {
        let ids = e
            .email_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut b = MessageBuilder::titled("🗑️", "Email Deleted");

        b.line(format!("📧 User: {}", code(&e.user.email)))
            .line(format!("🔢 Email Count: {}", e.email_ids.len()))
            .line(format!("📋 Email IDs: {}", code(&ids)))
            .line(format!("📍 IP Address: {}", ip_of(&e.user)))
            .line(device_summary(&e.user))
            .line(time_block(now, e.user.timezone.as_deref()));
        b.finish()
    }

    fn address_added(e: &AddressAddedEvent, now: DateTime<Utc>) -> String {
        let limit = e.user.role.as_ref().and_then(RoleInfo::address_limit);
        let mut b = MessageBuilder::titled("➕", "Address Added");

        b.line(format!("📧 User: {}", code(&e.user.email)))
            .line(format!("📬 New Address: {}", code(&e.address)));
        if !e.name.trim().is_empty() {
            b.line(format!("📝 Name: {}", escape_html(&e.name)));
        }
        b.line(format!(
            "🔢 Total Addresses: {}",
            count_with_limit(e.total, limit)
        ))
        .line(format!("📍 IP Address: {}", ip_of(&e.user)))
        .line(device_summary(&e.user))
        .line(time_block(now, e.user.timezone.as_deref()));
        b.finish()
    }

    fn address_deleted(e: &AddressDeletedEvent, now: DateTime<Utc>) -> String {
        let limit = e.user.role.as_ref().and_then(RoleInfo::address_limit);
        let mut b = MessageBuilder::titled("❌", "Address Deleted");

        b.line(format!("📧 User: {}", code(&e.user.email)))
            .line(format!("📬 Deleted Address: {}", code(&e.address)))
            .line(format!(
                "🔢 Remaining Addresses: {}",
                count_with_limit(e.remaining, limit)
            ))
            .line(format!("📍 IP Address: {}", ip_of(&e.user)))
            .line(device_summary(&e.user))
            .line(time_block(now, e.user.timezone.as_deref()));
        b.finish()
    }

    fn login(e: &LoginEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let mut b = MessageBuilder::titled("🔐", "User Login");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("📍 IP Address: {}", ip_of(user)));
        device_lines(&mut b, user);
        if let Some(count) = user.login_count {
            b.line(format!("🔁 Login Count: {}", count));
        }
        role_lines(&mut b, user.role.as_ref());
        b.line(time_block(
            user.active_time.unwrap_or(now),
            user.timezone.as_deref(),
        ));
        b.finish()
    }

    fn register(e: &RegisterEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let registration_ip = match user.create_ip.as_deref() {
            Some(ip) if !ip.is_empty() => code(ip),
            _ => ip_of(user),
        };
        let mut b = MessageBuilder::titled("✅", "New User Registration");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("📬 Addresses: {}", e.address_count))
            .line(format!("📍 Registration IP: {}", registration_ip));
        device_lines(&mut b, user);
        if let Some(count) = user.login_count {
            b.line(format!("🔁 Login Count: {}", count));
        }
        role_lines(&mut b, user.role.as_ref());
        b.line(time_block(
            user.create_time.unwrap_or(now),
            user.timezone.as_deref(),
        ));
        b.finish()
    }

    fn role_changed(e: &RoleChangedEvent, now: DateTime<Utc>) -> String {
        let mut b = MessageBuilder::titled("🎭", "Role Changed");

        b.line(format!("📧 User: {}", code(&e.user.email)))
            .line(format!("⬅️ Old Role: {}", role_summary(&e.old_role)))
            .line(format!("➡️ New Role: {}", role_summary(&e.new_role)))
            .line(format!("🛡️ Changed By: {}", code(&e.admin)))
            .line(time_block(now, e.user.timezone.as_deref()));
        b.finish()
    }

    fn status_changed(e: &StatusChangedEvent, now: DateTime<Utc>) -> String {
        let mut b = MessageBuilder::titled("🚦", "Account Status Changed");

        b.line(format!("📧 User: {}", code(&e.user.email)))
            .line(format!(
                "🔄 Status: {} → {}",
                status_label(e.old_status),
                status_label(e.new_status)
            ))
            .line(format!("🛡️ Changed By: {}", code(&e.admin)))
            .line(time_block(now, e.user.timezone.as_deref()));
        b.finish()
    }

    fn password_reset(e: &PasswordResetEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let mut b = MessageBuilder::titled("🔑", "Password Reset");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("📍 IP Address: {}", ip_of(user)));
        device_lines(&mut b, user);
        b.line(time_block(now, user.timezone.as_deref()));
        b.finish()
    }

    fn self_delete(e: &SelfDeleteEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let mut b = MessageBuilder::titled("👋", "Account Deleted by User");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("📬 Addresses Removed: {}", e.address_count))
            .line(format!("✉️ Emails Removed: {}", e.mail_count))
            .line(format!("📍 IP Address: {}", ip_of(user)));
        device_lines(&mut b, user);
        b.line(time_block(now, user.timezone.as_deref()));
        b.finish()
    }

    fn admin_delete(e: &AdminDeleteEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let mut b = MessageBuilder::titled("🚫", "Account Deleted by Admin");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("📬 Addresses Removed: {}", e.address_count))
            .line(format!("✉️ Emails Removed: {}", e.mail_count))
            .line(format!("🛡️ Deleted By: {}", code(&e.admin)))
            .line(format!("📍 Last IP Address: {}", ip_of(user)));
        device_lines(&mut b, user);
        b.line(time_block(now, user.timezone.as_deref()));
        b.finish()
    }

    fn failed_login(e: &FailedLoginEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let attempts = if e.attempts == 1 {
            "1 failed attempt".to_string()
        } else {
            format!("{} failed attempts", e.attempts)
        };
        let mut b = MessageBuilder::titled("⚠️", "Failed Login");

        b.line(format!("📧 Email: {}", code(&user.email)))
            .line(format!("🔢 Attempts: {}", attempts))
            .line(format!("📍 IP Address: {}", ip_of(user)));
        device_lines(&mut b, user);
        b.line(time_block(now, user.timezone.as_deref()));
        if e.attempts >= FAILED_LOGIN_WARNING_THRESHOLD {
            b.line("🚨 <b>Multiple failed attempts detected, the account may be under attack</b>");
        }
        b.finish()
    }

    fn quota_warning(e: &QuotaWarningEvent, now: DateTime<Utc>) -> String {
        let user = &e.user;
        let role = user.role.as_ref();
        let (label, limit) = match e.kind {
            QuotaKind::Send => ("Send", role.and_then(RoleInfo::send_limit)),
            QuotaKind::Address => ("Address", role.and_then(RoleInfo::address_limit)),
        };
        let mut b = MessageBuilder::titled("📊", "Quota Warning");

        b.line(format!("📧 User: {}", code(&user.email)))
            .line(format!("📦 Quota: {}", label));
        if let Some(role) = role {
            b.line(format!("👤 Role: {}", escape_html(&role.name)));
        }
        match limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(e.used);
                b.line(format!("🔢 Used: {} / {}", e.used, limit)).line(format!(
                    "📉 Left: {} remaining ({}%)",
                    remaining,
                    remaining_percent(remaining, limit)
                ));
            }
            None => {
                b.line(format!("🔢 Used: {} / Unlimited", e.used));
            }
        }
        b.line(time_block(now, user.timezone.as_deref()));
        b.finish()
    }
}
