//! HS256 access tokens for the GraphQL data endpoint.
//!
//! A token carries a single claims value under the field named by
//! [`Config::claims`], next to the standard `iat` claim (and `exp` when the
//! configuration sets a token lifetime). The server verifies it with the
//! same shared secret, see [`crate::config::authorization_footer`].

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::config::Config;
use crate::error::{DgkitError, DgkitResult};

/// Decoded token payload.
pub type TokenClaims = Map<String, Value>;

/// Signs `claims` into a bearer token.
///
/// # Errors
/// Returns `DgkitError::Token` if signing fails.
pub fn token(claims: &str, config: &Config) -> DgkitResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let mut payload = TokenClaims::new();
    payload.insert("iat".to_string(), Value::from(now));
    if let Some(ttl) = config.token_ttl {
        let exp = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        payload.insert("exp".to_string(), Value::from(exp));
    }
    payload.insert(config.claims.clone(), Value::String(claims.to_string()));

    encode(
        &Header::new(Algorithm::HS256),
        &payload,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(DgkitError::from)
}

/// Verifies a token against the configured secret and returns its payload.
///
/// `exp` is checked when present; tokens issued without a lifetime never
/// expire.
///
/// # Errors
/// Returns `DgkitError::Token` for a bad signature, malformed token or expired
/// token.
pub fn decode_token(token: &str, config: &Config) -> DgkitResult<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = true;
    validation.validate_aud = false;

    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Returns the claims value stored under the configured field, if any.
#[must_use]
pub fn claims_value<'a>(payload: &'a TokenClaims, config: &Config) -> Option<&'a str> {
    payload.get(&config.claims).and_then(Value::as_str)
}
