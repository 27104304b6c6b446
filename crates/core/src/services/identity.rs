//! Identity gate.
//!
//! Resolves request credentials to an [`Actor`]. Token issuance belongs to
//! an external service; [`JwtIdentityGate::issue`] exists for tooling and
//! tests.

use agora_common::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub is_admin: bool,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin,
        }
    }

    /// Fail with [`AppError::Forbidden`] unless the actor is an admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Whether the actor is the given user.
    #[must_use]
    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Resolves credentials to an actor or rejects them.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    /// Authenticate a bearer credential.
    ///
    /// Every rejection is [`AppError::Unauthorized`].
    async fn authenticate(&self, credentials: &str) -> AppResult<Actor>;
}

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: u64,
}

/// HS256 JWT implementation of [`IdentityGate`].
#[derive(Clone)]
pub struct JwtIdentityGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityGate {
    /// Create a gate verifying tokens with the given shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `actor` that expires after `ttl`.
    pub fn issue(&self, actor: &Actor, ttl: Duration) -> AppResult<String> {
        let exp = u64::try_from((Utc::now() + ttl).timestamp().max(0))
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let claims = Claims {
            user_id: actor.user_id.clone(),
            is_admin: actor.is_admin,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    fn verify(&self, token: &str) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized
            })?
            .claims;

        if claims.user_id.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }
}

#[async_trait]
impl IdentityGate for JwtIdentityGate {
    async fn authenticate(&self, credentials: &str) -> AppResult<Actor> {
        let claims = self.verify(credentials)?;
        Ok(Actor {
            user_id: claims.user_id,
            is_admin: claims.is_admin,
        })
    }
}
