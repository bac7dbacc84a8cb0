/// API route handlers
///
/// - `health`: Liveness and backend reachability
/// - `auth`: Register, login, refresh, me, logout, confirm-email

pub mod auth;
pub mod health;
