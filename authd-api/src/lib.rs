//! # authd API Server Library
//!
//! HTTP gateway over the authentication core.
//!
//! ## Modules
//!
//! - `app`: Application state, router and bearer-token middleware
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
