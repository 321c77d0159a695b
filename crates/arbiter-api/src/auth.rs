//! # Authentication & Authorization
//!
//! Session validation sits behind [`SessionValidator`] so the hosting
//! system can plug in its own identity service. [`BearerTokenValidator`]
//! is the built-in implementation.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{principal}:{secret}
//! ```
//!
//! `role` is one of `submitter`, `approver`, `admin`. The secret is compared
//! in constant time. The principal is recorded as the actor on every audit
//! entry the request produces.
//!
//! ## Scopes
//!
//! | Scope     | Minimum role | Operations                               |
//! |-----------|--------------|------------------------------------------|
//! | `Advise`  | Submitter    | recommend, compliance checks, reads      |
//! | `Resolve` | Approver     | resolve a review request                 |
//! | `Operate` | Admin        | trigger an SLA sweep                     |

use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Principal injected when authentication is disabled.
pub const LOCAL_PRINCIPAL: &str = "local-admin";

// ── Role & Scope ────────────────────────────────────────────────────────────

/// Caller roles, ordered by privilege: `Submitter < Approver < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits actions for advice and reads results.
    Submitter,
    /// Resolves review requests.
    Approver,
    /// Operates the engine.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitter => "submitter",
            Self::Approver => "approver",
            Self::Admin => "admin",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "submitter" => Some(Self::Submitter),
            "approver" => Some(Self::Approver),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// What an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Request advice and read results.
    Advise,
    /// Resolve a review request.
    Resolve,
    /// Operational actions.
    Operate,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advise => "advise",
            Self::Resolve => "resolve",
            Self::Operate => "operate",
        }
    }

    /// Least privileged role that holds this scope.
    pub fn minimum_role(&self) -> Role {
        match self {
            Self::Advise => Role::Submitter,
            Self::Resolve => Role::Approver,
            Self::Operate => Role::Admin,
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// Principal name, recorded as the audit actor.
    pub principal: String,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled.
    pub fn local_admin() -> Self {
        Self {
            role: Role::Admin,
            principal: LOCAL_PRINCIPAL.to_string(),
        }
    }

    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Whether the caller may act as `principal`: only admins may act for
    /// someone else.
    pub fn may_act_as(&self, principal: &str) -> bool {
        self.role == Role::Admin || self.principal == principal
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── SessionValidator ────────────────────────────────────────────────────────

/// Authentication and authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is malformed or its secret is wrong.
    #[error("invalid bearer token")]
    InvalidToken,

    /// The token names a role this service does not know.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The token carries no principal.
    #[error("token has an empty principal")]
    EmptyPrincipal,

    /// The caller's role does not hold the scope.
    #[error("scope '{scope}' requires role '{required}', caller has '{actual}'")]
    InsufficientScope {
        scope: &'static str,
        required: &'static str,
        actual: &'static str,
    },
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::InsufficientScope { .. } => Self::Forbidden(err.to_string()),
            _ => Self::Unauthorized(err.to_string()),
        }
    }
}

/// Principal + scope validation supplied by the identity collaborator.
pub trait SessionValidator: Send + Sync {
    /// Resolve a bearer token to a caller.
    fn authenticate(&self, token: &str) -> Result<CallerIdentity, AuthError>;

    /// Check that `caller` holds `scope`. The default grants a scope to
    /// every role at or above its minimum.
    fn authorize(&self, caller: &CallerIdentity, scope: Scope) -> Result<(), AuthError> {
        let required = scope.minimum_role();
        if caller.has_role(required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope {
                scope: scope.as_str(),
                required: required.as_str(),
                actual: caller.role.as_str(),
            })
        }
    }
}

/// Constant-time comparison of secrets.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Validates `{role}:{principal}:{secret}` tokens against one shared secret.
///
/// Custom `Debug` redacts the secret.
#[derive(Clone)]
pub struct BearerTokenValidator {
    secret: String,
}

impl BearerTokenValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for BearerTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenValidator")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SessionValidator for BearerTokenValidator {
    fn authenticate(&self, token: &str) -> Result<CallerIdentity, AuthError> {
        let mut parts = token.splitn(3, ':');
        let (Some(role), Some(principal), Some(secret)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        // The secret is checked before the role or principal is looked at.
        if !constant_time_token_eq(secret, &self.secret) {
            return Err(AuthError::InvalidToken);
        }
        let role = Role::parse(role).ok_or_else(|| AuthError::UnknownRole(role.to_string()))?;
        if principal.trim().is_empty() {
            return Err(AuthError::EmptyPrincipal);
        }

        Ok(CallerIdentity {
            role,
            principal: principal.to_string(),
        })
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions and app state.
/// `None` disables authentication.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub validator: Option<Arc<dyn SessionValidator>>,
}

impl AuthConfig {
    /// Bearer-token auth when a secret is configured.
    pub fn from_token(token: Option<&str>) -> Self {
        Self {
            validator: token.map(|t| Arc::new(BearerTokenValidator::new(t)) as Arc<dyn SessionValidator>),
        }
    }

    /// Check a scope. With auth disabled every caller is the local admin.
    pub fn authorize(&self, caller: &CallerIdentity, scope: Scope) -> Result<(), AppError> {
        match &self.validator {
            Some(v) => v.authorize(caller, scope).map_err(|e| {
                tracing::warn!(principal = %caller.principal, scope = scope.as_str(), "authorization denied");
                AppError::from(e)
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.validator.is_some())
            .finish()
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the [`CallerIdentity`].
///
/// When no validator is configured, every request runs as the local admin.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let validator = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.validator.clone());

    let Some(validator) = validator else {
        request.extensions_mut().insert(CallerIdentity::local_admin());
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => match validator.authenticate(&value[7..]) {
            Ok(identity) => {
                tracing::debug!(principal = %identity.principal, role = identity.role.as_str(), "authenticated");
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(err) => {
                tracing::warn!(reason = %err, "authentication failed");
                unauthorized_response(&err.to_string())
            }
        },
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
