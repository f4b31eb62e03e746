//! Telegram notification pipeline.
//!
//! Events from the mail backend are rendered into Telegram HTML by
//! [`compose::MessageComposer`] and fanned out to every configured chat by
//! [`dispatcher::TelegramDispatcher`]. [`service::TelegramService`] ties the
//! two together and exposes one send operation per event kind.

pub mod compose;
pub mod dispatcher;
pub mod link_token;
pub mod pages;
pub mod service;
pub mod text;
pub mod timefmt;
