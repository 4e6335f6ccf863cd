//! # Authentication Module
//!
//! Resolves the caller of a request from a `Bearer` JWT. Issuing tokens is
//! the job of the external account service; this crate only verifies them
//! with the shared `JWT_SECRET` and turns the claims into an [`Actor`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use slotbook_core::models::{Actor, Role};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id of the caller
    pub sub: Uuid,
    pub role: Role,
    /// Expiry as a unix timestamp
    pub exp: usize,
}

impl Claims {
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    pub fn to_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

/// Signs a token for `actor` that stays valid for `ttl_seconds`.
pub fn issue_token(
    actor: &Actor,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now().timestamp() + ttl_seconds).max(0) as usize;
    Claims {
        sub: actor.id,
        role: actor.role,
        exp,
    }
    .to_token(secret)
}

/// Extractor for the authenticated caller
pub struct CallerIdentity(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("Missing authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthenticated("Invalid authorization header format".to_string())
        })?;

        let claims = Claims::from_token(token, &state.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected caller token: {}", e);
            AppError::Unauthenticated(e.to_string())
        })?;

        Ok(CallerIdentity(Actor::new(claims.sub, claims.role)))
    }
}
