//! Session context and local credential guard.
//!
//! The session is an explicit value passed by reference into every
//! authenticated call — created at login, destroyed at logout, never
//! held in process-wide state. [`SessionContext::require_token`] is the
//! guard: calls that need a bearer credential short-circuit locally,
//! before any network I/O, when none is held or the token is past its
//! `exp` claim.

pub mod storage;

pub use storage::SessionStorage;

use crate::types::{AppError, AppResult};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};

/// Identity snapshot returned by the auth backend at login.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionContext {
    token: String,
    pub user: UserProfile,
    pub login_time: DateTime<Utc>,
}

/// Unverified claim set; only `exp` is of interest locally.
#[derive(Debug, serde::Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
            login_time: Utc::now(),
        }
    }

    /// A context holding no credential. Every authenticated call against
    /// it fails locally.
    pub fn anonymous() -> Self {
        Self::new(String::new(), UserProfile::default())
    }

    /// Rebuild a previously persisted session, keeping its login time.
    pub(crate) fn restore(token: String, user: UserProfile, login_time: DateTime<Utc>) -> Self {
        Self {
            token,
            user,
            login_time,
        }
    }

    pub(crate) fn raw_token(&self) -> &str {
        &self.token
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Whether the bearer token's `exp` claim has passed.
    ///
    /// The signature is deliberately not verified — the backend stays the
    /// authority; this check only avoids a round-trip that is certain to
    /// be rejected. Tokens that do not parse as JWTs are left for the
    /// backend to judge.
    pub fn is_expired(&self) -> bool {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        match decode::<Claims>(&self.token, &DecodingKey::from_secret(b""), &validation) {
            Ok(data) => match data.claims.exp {
                Some(exp) => exp <= Utc::now().timestamp(),
                None => false,
            },
            Err(_) => false,
        }
    }

    /// The bearer credential, or an auth error when none is usable.
    pub fn require_token(&self) -> AppResult<&str> {
        if !self.has_token() {
            return Err(AppError::Auth("required. Please login again.".to_string()));
        }
        if self.is_expired() {
            return Err(AppError::Auth("expired. Please login again.".to_string()));
        }
        Ok(&self.token)
    }

    /// How long ago this session was established, for display.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.login_time
    }
}
