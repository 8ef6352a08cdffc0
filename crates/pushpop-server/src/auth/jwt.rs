use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Role claim carried only by wizard tokens.
pub const WIZARD_ROLE: &str = "wizard";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id for sessions, the configured email for wizard tokens.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_wizard(&self) -> bool {
        self.role.as_deref() == Some(WIZARD_ROLE)
    }
}

fn encode_claims(secret: &str, sub: &str, role: Option<&str>, ttl: Duration) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        role: role.map(str::to_string),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))
}

/// Encode a dashboard session token for `user_id`.
pub fn encode_session_jwt(secret: &str, user_id: &str, session_days: u32) -> Result<String> {
    encode_claims(secret, user_id, None, Duration::days(i64::from(session_days)))
}

/// Encode a 24h wizard token.
pub fn encode_wizard_jwt(secret: &str, email: &str) -> Result<String> {
    encode_claims(secret, email, Some(WIZARD_ROLE), Duration::hours(24))
}

/// Decode and validate a JWT token (HS256, `exp` enforced).
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}
