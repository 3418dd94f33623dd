//! Bearer-token authentication for the HTTP transport.
//!
//! Tokens come from `--auth-token` / `MCP_AUTH_TOKENS`. With no tokens the
//! middleware is not installed at all.

use crate::error::{DbError, DbResult};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Accepted bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: HashSet<String>,
}

impl AuthConfig {
    /// Build from configured tokens. Blank entries are a configuration error.
    pub fn from_tokens(tokens: Vec<String>) -> DbResult<Self> {
        let mut accepted = HashSet::new();
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err(DbError::config("Empty value in --auth-token"));
            }
            accepted.insert(trimmed.to_string());
        }
        Ok(Self { tokens: accepted })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compare against every token in constant time; no early exit on a match.
    fn accepts(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            found | constant_time_eq(provided.as_bytes(), expected.as_bytes())
        })
    }
}

/// Axum middleware rejecting requests without a valid bearer token.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&request) {
        Ok(Some(token)) => token,
        Ok(None) => {
            warn!("Rejected HTTP request without Authorization header");
            return unauthorized_response(
                "Missing Bearer token in Authorization header",
                "Send 'Authorization: Bearer <token>'",
            );
        }
        Err(msg) => {
            warn!("Rejected HTTP request with malformed Authorization header");
            return unauthorized_response(msg, "Send 'Authorization: Bearer <token>'");
        }
    };

    if auth.accepts(token) {
        debug!("HTTP request authenticated");
        next.run(request).await
    } else {
        warn!(token_prefix = %mask_token(token), "Rejected HTTP request with unknown token");
        unauthorized_response(
            "Invalid Bearer token",
            "Use one of the tokens configured with --auth-token",
        )
    }
}

fn extract_bearer_token(request: &Request<Body>) -> Result<Option<&str>, &'static str> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    match value.strip_prefix("Bearer ") {
        Some("") => Err("Bearer token is empty"),
        Some(token) => Ok(Some(token)),
        None => Err("Invalid Authorization header format. Expected 'Bearer <token>'"),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn mask_token(token: &str) -> String {
    match token.char_indices().nth(3) {
        Some((idx, _)) => format!("{}***", &token[..idx]),
        None => "***".to_string(),
    }
}

#[derive(Serialize)]
struct UnauthorizedBody {
    error: UnauthorizedDetail,
}

#[derive(Serialize)]
struct UnauthorizedDetail {
    code: &'static str,
    message: String,
    suggestion: String,
}

fn unauthorized_response(message: impl Into<String>, suggestion: impl Into<String>) -> Response {
    let body = UnauthorizedBody {
        error: UnauthorizedDetail {
            code: "unauthorized",
            message: message.into(),
            suggestion: suggestion.into(),
        },
    };
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
