use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, User};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

fn algorithm(config: &AppConfig) -> Result<Algorithm, TokenError> {
    match Algorithm::from_str(&config.jwt_algorithm) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(TokenError::UnsupportedAlgorithm(config.jwt_algorithm.clone())),
    }
}

/// Issues an access token carrying the user's email, uid and role.
pub fn create_access_token(
    config: &AppConfig,
    email: &str,
    uid: &str,
    role: &str,
) -> Result<String, TokenError> {
    if config.jwt_secret_key.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: email.to_string(),
        uid: uid.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.access_token_expire_minutes)).timestamp(),
    };

    encode(
        &Header::new(algorithm(config)?),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_key.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

pub fn decode_claims(token: &str, config: &AppConfig) -> Result<JwtClaims, TokenError> {
    if config.jwt_secret_key.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let validation = Validation::new(algorithm(config)?);

    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => {
            debug!("Token rejected: {}", e);
            TokenError::Invalid(e.to_string())
        }
    })
}

pub fn validate_token(token: &str, config: &AppConfig) -> Result<User, TokenError> {
    let claims = decode_claims(token, config)?;
    debug!("Token validated successfully for user: {}", claims.uid);
    Ok(User::from(claims))
}
