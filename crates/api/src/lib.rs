//! HTTP surface of MailWatch.
//!
//! - `GET  /api/telegram/getEmail/{token}`: mail preview for the bot's in-app browser
//! - `POST /api/notifications`: hand a lifecycle event to the notifier
//! - `GET  /health`

pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
