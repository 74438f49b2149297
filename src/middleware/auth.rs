//! Authentication middleware
//!
//! Checks the bearer token against a static allow-list read from a local JSON
//! file. The file is re-read on every request, so edits apply immediately.
//!
//! The gate fails open: a missing, unreadable or malformed file, or one with no
//! keys at all, disables authentication entirely. Once the file has any key the
//! gate is on, and entries that are not permission records deny.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::{AppError, NO_ACCESS_RIGHTS},
    routes::metrics::record_auth_denied,
    AppState,
};

/// Permission record attached to a token
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Permission {
    pub allow: bool,
    /// Any other fields operators keep next to the flag
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token -> permission mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthMap {
    entries: HashMap<String, Permission>,
    /// Whether the file carried any key, valid or not
    configured: bool,
}

impl AuthMap {
    /// Parse the auth file contents, dropping entries that are not permission records
    pub fn parse(contents: &str) -> Self {
        let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(contents) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Auth file is not a JSON object, treating as empty");
                return Self::default();
            }
        };

        let configured = !raw.is_empty();
        let entries = raw
            .into_iter()
            .filter_map(|(token, value)| match serde_json::from_value::<Permission>(value) {
                Ok(permission) => Some((token, permission)),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed auth entry");
                    None
                }
            })
            .collect();

        Self {
            entries,
            configured,
        }
    }

    /// Whether the gate is on
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of well-formed entries

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the token is present and marked as allowed
    pub fn allows(&self, token: &str) -> bool {
        self.entries.get(token).is_some_and(|p| p.allow)
    }

    /// Decide on a request given its raw Authorization header
    pub fn check(&self, auth_header: Option<&str>) -> Result<(), AppError> {
        if !self.is_configured() {
            return Ok(());
        }

        let token = auth_header
            .map(extract_bearer_token)
            .ok_or_else(|| AppError::Unauthorized(NO_ACCESS_RIGHTS.to_string()))?;

        if self.allows(token) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(NO_ACCESS_RIGHTS.to_string()))
        }
    }
}

/// Strip the `Bearer ` prefix from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> &str {
    auth_header
        .strip_prefix("Bearer ")
        .unwrap_or(auth_header)
        .trim()
}

/// Reads the auth map from disk on demand
#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current mapping; any read failure yields an empty map
    pub async fn load(&self) -> AuthMap {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => AuthMap::parse(&contents),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Auth file not readable, treating as empty");
                AuthMap::default()
            }
        }
    }

    /// Reload the mapping and check the Authorization header against it
    pub async fn authorize(&self, auth_header: Option<&str>) -> Result<(), AppError> {
        self.load().await.check(auth_header)
    }

    /// Whether any tokens are configured
    pub async fn has_tokens(&self) -> bool {
        self.load().await.is_configured()
    }
}

/// Authentication middleware
///
/// Rejects the request with the Unauthorized body when the gate denies it,
/// otherwise passes it on unchanged.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Err(e) = state.auth.authorize(auth_header).await {
        warn!("Request rejected by access gate");
        record_auth_denied();
        return Err(e);
    }

    Ok(next.run(request).await)
}
