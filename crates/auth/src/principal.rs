use serde::{Deserialize, Serialize};

use crate::JwtClaims;

/// Identity of an authenticated caller (the token subject / uid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller identity attached to a callable request.
///
/// Present only when the request carried a valid ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    uid: PrincipalId,
    token: JwtClaims,
}

impl AuthContext {
    pub fn from_claims(token: JwtClaims) -> Self {
        Self {
            uid: token.sub.clone(),
            token,
        }
    }

    pub fn uid(&self) -> &PrincipalId {
        &self.uid
    }

    pub fn token(&self) -> &JwtClaims {
        &self.token
    }
}
