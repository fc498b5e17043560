//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs minted by the account service. Handlers take a
//! [`Principal`] (any authenticated caller) or an [`Authority`] (officers and
//! admins only) as an extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::AppError;

/// Minimum HS256 secret length.
const MIN_SECRET_LENGTH: usize = 32;

/// Default lifetime of tokens minted by [`JwtConfig::issue`].
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tourist,
    Authority,
    Admin,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Claims {
    /// Claims valid for the default lifetime starting now.
    pub fn new(user_id: &str, role: Role) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        Self {
            sub: user_id.to_string(),
            exp: now + DEFAULT_TOKEN_TTL_SECS,
            iat: now,
            iss: None,
            role,
            name: None,
            email: None,
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    secret: String,
    issuer: Option<String>,
}

impl JwtConfig {
    pub fn try_new(secret: impl Into<String>, issuer: Option<String>) -> anyhow::Result<Self> {
        let secret = secret.into();
        anyhow::ensure!(
            secret.len() >= MIN_SECRET_LENGTH,
            "JWT secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
            secret.len()
        );
        Ok(Self { secret, issuer })
    }

    /// Sign `claims`, stamping the configured issuer when one is set.
    pub fn issue(&self, claims: &Claims) -> Result<String, AppError> {
        let mut claims = claims.clone();
        if claims.iss.is_none() {
            claims.iss = self.issuer.clone();
        }

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Unauthorized(format!("cannot sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("token has expired".to_string())
            }
            _ => AppError::Unauthorized(format!("invalid token: {e}")),
        })
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Principal {
    pub fn is_authority(&self) -> bool {
        matches!(self.role, Role::Authority | Role::Admin)
    }

    /// Name used in communication entries.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            name: claims.name,
            email: claims.email,
            phone: claims.phone,
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("expected `Bearer <token>`".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.jwt.verify(token)?;
        Ok(claims.into())
    }
}

/// A principal holding the `authority` or `admin` role.
#[derive(Debug, Clone)]
pub struct Authority(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Authority {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_authority() {
            return Err(AppError::Forbidden(
                "authority role required".to_string(),
            ));
        }
        Ok(Authority(principal))
    }
}
