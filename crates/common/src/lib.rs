//! Shared configuration, errors and domain types for MailWatch.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
