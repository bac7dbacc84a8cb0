/// Database models for authd
///
/// Rows and the queries that read and write them. Each submodule owns one
/// table:
///
/// - `user`: Accounts (`users`)
/// - `tokens`: Latest issued token pair per user (`users_tokens`)
/// - `confirmation`: Pending email confirmation codes (`users_code`)
///
/// The authentication core does not call these directly; it goes through
/// the `CredentialStore` trait, whose Postgres implementation delegates here.

pub mod confirmation;
pub mod tokens;
pub mod user;

pub use confirmation::ConfirmationCode;
pub use tokens::{StoredToken, TokenPair, UserTokens};
pub use user::{NewUser, User};
