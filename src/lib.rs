//! markstash — a self-hosted bookmark service.
//!
//! Accounts sign up and sign in with email + password; successful
//! authentication yields a stateless, signed access token presented as
//! `Authorization: Bearer <token>` on every protected call. Bookmarks are
//! single-owner resources: every read, update, and delete is checked
//! against the authenticated identity.

pub mod auth;
pub mod bookmarks;
pub mod config;
pub mod gateway;
pub mod store;
