//! Per-resource ownership enforcement.
//!
//! A pure decision over already-loaded data: no store I/O happens here.
//! Applied before every read, update, and delete of an owned resource;
//! creation sets the owner from the identity and needs no check.

use super::identity::Identity;

/// Authenticated, but not the owner of the targeted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not the owner of this resource")]
pub struct Forbidden;

/// Allow the operation only when `identity` owns the resource.
pub fn authorize(identity: &Identity, owner_id: &str) -> Result<(), Forbidden> {
    if identity.user_id == owner_id {
        Ok(())
    } else {
        Err(Forbidden)
    }
}
