//! # authd Worker Library
//!
//! Drains the notification stream published by the authentication core and
//! delivers each message as an email.
//!
//! ## Modules
//!
//! - `config`: Worker configuration from the environment
//! - `consumer`: Redis Streams consumer group loop
//! - `mailer`: Email rendering and the mail API client

pub mod config;
pub mod consumer;
pub mod mailer;
