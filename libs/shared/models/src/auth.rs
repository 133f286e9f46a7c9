use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLE: &str = "outsider";

/// Claims carried by the access tokens this service issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// The user's email address.
    pub sub: String,
    pub uid: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The caller resolved from a validated bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub role: String,
}

impl From<JwtClaims> for User {
    fn from(claims: JwtClaims) -> Self {
        Self {
            uid: claims.uid,
            email: claims.sub,
            role: claims.role,
        }
    }
}
