//! Authentication and authorization core.
//!
//! Provides:
//! - Argon2id password hashing with per-call salts ([`password`])
//! - Stateless HMAC-SHA256 session tokens, 60-minute default lifetime ([`token`])
//! - Bearer-token identity resolution with a single opaque failure ([`identity`])
//! - Pure per-resource ownership checks ([`ownership`])
//! - The signup/signin orchestrator wiring them together ([`service`])
//!
//! ## Design Decisions
//! - Sessions are self-contained signed tokens — no server-side session
//!   table and no revocation before expiry.
//! - The signing secret is process-wide, loaded once at startup.
//! - Collaborators (hasher, store, issuer) are injected through
//!   constructors; there is no global lookup at call time.

pub mod identity;
pub mod ownership;
pub mod password;
pub mod service;
pub mod token;

pub use identity::{Identity, Unauthorized};
pub use ownership::Forbidden;
pub use password::PasswordHasher;
pub use service::{AuthError, AuthService};
pub use token::{Claims, TokenError, TokenIssuer};
