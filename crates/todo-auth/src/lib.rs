//! Bearer-token authorization for the todo APIs.
//!
//! The signing key is HMAC-SHA256 material, base64-encoded in the
//! `JWT_SIGNING_KEY` environment variable. A missing or undecodable key is a
//! startup error so misconfigured deployments fail fast instead of serving
//! an API whose protected routes can never be reached.

use axum::{
    extract::State,
    http::{self, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose, Engine};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

pub const SIGNING_KEY_ENV: &str = "JWT_SIGNING_KEY";
pub const DEFAULT_ISSUER: &str = "slim-todo";
pub const DEFAULT_AUDIENCE: &str = "slim-todo-api";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "JWT signing key not found. Set {SIGNING_KEY_ENV} or run \
         'cargo run -p todo-auth --bin make-token -- --new-key --role admin' \
         to generate one."
    )]
    MissingKey,
    #[error("{SIGNING_KEY_ENV} is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: u64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

// The authenticated principal, inserted into request extensions for handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

fn issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string())
}

fn audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string())
}

/// Verifier handed to the axum middleware as state.
#[derive(Clone)]
pub struct JwtAuth {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn from_env() -> Result<Self, AuthError> {
        let key_b64 = std::env::var(SIGNING_KEY_ENV).map_err(|_| AuthError::MissingKey)?;
        Self::from_key_material(&key_b64)
    }

    pub fn from_key_material(key_b64: &str) -> Result<Self, AuthError> {
        let key_material = general_purpose::STANDARD.decode(key_b64)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer()]);
        validation.set_audience(&[audience()]);

        Ok(Self {
            decoding_key: DecodingKey::from_secret(&key_material),
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Creates a signed token for `sub` carrying `roles`, valid for `ttl_secs`.
pub fn create_token(
    key_b64: &str,
    sub: &str,
    roles: &[String],
    ttl_secs: u64,
) -> Result<String, AuthError> {
    let key_material = general_purpose::STANDARD.decode(key_b64)?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let claims = Claims {
        sub: sub.to_string(),
        iss: issuer(),
        aud: audience(),
        roles: roles.to_vec(),
        exp: now + ttl_secs,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&key_material),
    )?;
    Ok(token)
}

/// Fresh 256-bit signing key, base64-encoded.
pub fn generate_key_material() -> String {
    use rand::RngCore;
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    general_purpose::STANDARD.encode(key)
}

/// Middleware guarding admin-only routes: 401 for a missing or invalid
/// bearer token, 403 for a valid token without the admin role.
pub async fn require_admin<B>(
    State(auth): State<JwtAuth>,
    mut request: Request<B>,
    next: Next<B>,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    let claims = match auth.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "bearer token rejected");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    if !claims.has_role(ADMIN_ROLE) {
        return Err(StatusCode::FORBIDDEN);
    }

    request.extensions_mut().insert(CurrentUser {
        username: claims.sub,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> String {
        general_purpose::STANDARD.encode([7u8; 32])
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let key = key();
        let token = create_token(&key, "alice", &[ADMIN_ROLE.to_string()], 600).unwrap();
        let auth = JwtAuth::from_key_material(&key).unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.has_role(ADMIN_ROLE));
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.aud, DEFAULT_AUDIENCE);
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let token = create_token(&key(), "mallory", &[], 600).unwrap();
        let other = general_purpose::STANDARD.encode([9u8; 32]);
        let auth = JwtAuth::from_key_material(&other).unwrap();

        assert!(auth.verify(&token).is_err());
    }

    #[test]
    fn roles_are_checked_exactly() {
        let key = key();
        let token = create_token(&key, "bob", &["reader".to_string()], 600).unwrap();
        let auth = JwtAuth::from_key_material(&key).unwrap();

        let claims = auth.verify(&token).unwrap();
        assert!(!claims.has_role(ADMIN_ROLE));
    }

    #[test]
    fn invalid_key_material_is_an_error() {
        assert!(matches!(
            JwtAuth::from_key_material("not-base64!!!"),
            Err(AuthError::InvalidKey(_))
        ));
    }

    #[test]
    fn generated_key_material_decodes_to_256_bits() {
        let key = generate_key_material();
        let material = general_purpose::STANDARD.decode(key).unwrap();
        assert_eq!(material.len(), 32);
    }
}
