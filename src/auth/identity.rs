//! Bearer-token identity resolution for inbound requests.
//!
//! Every failure mode — missing header, wrong scheme, bad signature,
//! expiry — collapses into the same opaque [`Unauthorized`] so a caller
//! cannot probe for why authentication failed.

use axum::http::{header, HeaderMap};

use super::token::TokenIssuer;

/// The authenticated caller, valid for the current request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Opaque authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authentication required")]
pub struct Unauthorized;

/// Resolve an authenticated identity from the request headers.
pub fn resolve(headers: &HeaderMap, issuer: &TokenIssuer) -> Result<Identity, Unauthorized> {
    let token = bearer_token(headers).ok_or(Unauthorized)?;
    let claims = issuer.validate(token).map_err(|_| Unauthorized)?;
    Ok(Identity {
        user_id: claims.sub,
        email: claims.email,
    })
}

/// Extract the token from an exact `Bearer <token>` authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-signing-secret", 60)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn valid_token_resolves_identity() {
        let issuer = issuer();
        let token = issuer.issue("user-1", "a@x.com");
        let identity = resolve(&headers_with(&format!("Bearer {token}")), &issuer).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn all_failures_are_the_same_unauthorized() {
        let issuer = issuer();
        let expired = issuer.issue_at("user-1", "a@x.com", 0);

        let failures = [
            resolve(&HeaderMap::new(), &issuer),
            resolve(&headers_with("Basic dXNlcjpwdw=="), &issuer),
            resolve(&headers_with("Bearer"), &issuer),
            resolve(&headers_with("Bearer garbage"), &issuer),
            resolve(&headers_with(&format!("Bearer {expired}")), &issuer),
            resolve(&headers_with("bearer lowercase-scheme"), &issuer),
        ];
        for failure in failures {
            assert_eq!(failure, Err(Unauthorized));
        }
    }
}
