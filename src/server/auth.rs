//! Session token authentication.
//!
//! Every `/data` route requires a bearer token. Tokens are signed with
//! HMAC-SHA256 and bind a person id to an expiry time:
//!
//! ```text
//! token     = "{person_id}.{expiry}.{signature}"
//! signature = hex(HMAC-SHA256(secret_key, "{person_id}.{expiry}"))
//! ```
//!
//! The middleware verifies the token, loads the person from the store and
//! attaches a [`Caller`] to the request. Handlers receive it through the
//! [`Caller`] extractor.
//!
//! With authentication disabled (development only) the caller is taken from
//! the `X-Person-Id` header instead.
//!
//! # Example
//!
//! ```rust
//! use entity_api::server::auth::SessionAuth;
//! use std::time::Duration;
//!
//! let auth = SessionAuth::new("my-secret-key");
//! let (token, _expiry) = auth.issue("person-1", Duration::from_secs(3600));
//!
//! assert_eq!(auth.verify(&token).unwrap(), "person-1");
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use crate::model::Caller;
use crate::store::EntityStore;

use super::handlers::{AppState, ErrorResponse};

/// Header naming the caller when authentication is disabled.
pub const PERSON_ID_HEADER: &str = "x-person-id";

// =============================================================================
// Types
// =============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Authentication error types.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No credential on the request
    MissingToken,

    /// Authorization header is not a bearer credential
    InvalidScheme,

    /// Token does not have the `{person_id}.{expiry}.{signature}` shape
    MalformedToken,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,

    /// Token is valid but names a person the store does not know
    UnknownPerson(String),

    /// Person lookup failed
    Storage(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing session token"),
            AuthError::InvalidScheme => write!(f, "Expected a Bearer authorization header"),
            AuthError::MalformedToken => write!(f, "Malformed session token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
            AuthError::UnknownPerson(id) => write!(f, "Unknown person: {}", id),
            AuthError::Storage(message) => write!(f, "Failed to load caller: {}", message),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token"),
            AuthError::InvalidScheme | AuthError::MalformedToken => {
                (StatusCode::UNAUTHORIZED, "invalid_token")
            }
            AuthError::Expired { .. } => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            AuthError::UnknownPerson(_) => (StatusCode::UNAUTHORIZED, "unknown_person"),
            AuthError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        let message = self.to_string();

        // A bad signature may be a forged token
        match &self {
            AuthError::InvalidSignature | AuthError::UnknownPerson(_) => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            AuthError::Storage(_) => {
                error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Session Tokens
// =============================================================================

/// Issues and verifies HMAC-SHA256 session tokens.
#[derive(Clone)]
pub struct SessionAuth {
    secret_key: Vec<u8>,
}

impl SessionAuth {
    /// Create an authenticator with the given secret key.
    ///
    /// The key should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Issue a token for `person_id` valid for `ttl`.
    ///
    /// Returns the token and its expiry (Unix epoch seconds).
    pub fn issue(&self, person_id: &str, ttl: Duration) -> (String, u64) {
        let expiry = now_secs().saturating_add(ttl.as_secs());
        (self.issue_with_expiry(person_id, expiry), expiry)
    }

    /// Issue a token with a specific expiry timestamp.
    pub fn issue_with_expiry(&self, person_id: &str, expiry: u64) -> String {
        let signature = self.compute_signature(person_id, expiry);
        format!("{}.{}.{}", person_id, expiry, signature)
    }

    /// Verify a token, returning the person id it was issued for.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let mut parts = token.rsplitn(3, '.');
        let (Some(signature), Some(expiry), Some(person_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken);
        };
        if person_id.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        let expiry: u64 = expiry.parse().map_err(|_| AuthError::MalformedToken)?;

        // Check expiry first
        let current_time = now_secs();
        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let provided_sig = hex::decode(signature).map_err(|_| AuthError::MalformedToken)?;
        let expected_sig = self.compute_signature_bytes(person_id, expiry);

        if provided_sig.ct_eq(&expected_sig).into() {
            Ok(person_id.to_string())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    fn compute_signature(&self, person_id: &str, expiry: u64) -> String {
        hex::encode(self.compute_signature_bytes(person_id, expiry))
    }

    fn compute_signature_bytes(&self, person_id: &str, expiry: u64) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(format!("{}.{}", person_id, expiry).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Extract the bearer token from request headers.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(AuthError::MissingToken)
            } else {
                Ok(token)
            }
        }
        _ => Err(AuthError::InvalidScheme),
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware resolving the caller of every protected request.
///
/// Rejects the request with 401 before any handler runs when the credential
/// is missing or invalid, or names an unknown person.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
///
/// let app = Router::new()
///     .route("/data/entities", get(entities_handler::<S>))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<S>));
/// ```
pub async fn auth_middleware<S>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    S: EntityStore + 'static,
{
    let person_id = match &state.auth {
        Some(auth) => auth.verify(bearer_token(request.headers())?)?,
        None => request
            .headers()
            .get(PERSON_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(AuthError::MissingToken)?,
    };

    let person = state
        .service
        .get_person(&person_id)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?
        .ok_or(AuthError::UnknownPerson(person_id))?;

    debug!(person_id = %person.id, role = ?person.role, "Authenticated request");
    request.extensions_mut().insert(Caller::from(&person));

    Ok(next.run(request).await)
}

/// Handlers take the authenticated caller as an argument.
///
/// Only available behind [`auth_middleware`]; elsewhere the request is
/// rejected as unauthenticated.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

// =============================================================================
// Tests
// =============================================================================
