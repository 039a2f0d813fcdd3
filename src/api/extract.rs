use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header};

use super::SharedState;
use crate::entities::{Role, UserId};
use crate::handlers::{Context, Error, Result};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, ::serde::Serialize, ::serde::Deserialize)]
struct Claims {
    id: String,
    exp: usize,
}

pub fn issue_token(secret: &str, user_id: UserId) -> Result<String> {
    let claims = Claims {
        id: user_id.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(anyhow!("cannot sign token: {}", e)))
}

/// Bearer-token extractor. The token only proves identity; the admin bit
/// is re-read from the store on every request.
pub struct Auth(pub Context);

#[axum::async_trait]
impl FromRequestParts<SharedState> for Auth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let token = match header.strip_prefix("Bearer ") {
            Some(t) => t,
            None => return Err(Error::Unauthorized),
        };

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|_| Error::Unauthorized)?
        .claims;

        let user_id: UserId = claims.id.parse().map_err(|_| Error::Unauthorized)?;
        let user = state
            .app
            .users
            .profile(user_id)
            .await
            .map_err(|_| Error::Unauthorized)?;

        Ok(Auth(Context {
            user_id,
            admin: user.role == Role::Admin,
        }))
    }
}
