//! Authenticated identity and the OAuth handshake machinery.

pub mod identity;
pub mod oauth;

pub use identity::Identity;
pub use oauth::GitHubOauth;
