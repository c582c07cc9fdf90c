//! Publish authentication.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// How a publisher proves ownership of a server name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Github,
    None,
}

impl AuthMethod {
    /// `io.github.*` names are owned through GitHub; anything else has no
    /// ownership scheme.
    pub fn for_server_name(name: &str) -> Self {
        if name.starts_with("io.github") {
            AuthMethod::Github
        } else {
            AuthMethod::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Github => "github",
            AuthMethod::None => "none",
        }
    }
}

/// Credentials attached to a publish request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    pub method: Option<AuthMethod>,
    pub token: Option<String>,
    /// Server name the credentials are presented for.
    pub repo_ref: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is required")]
    TokenRequired,
}

/// Validates publish credentials.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// `Ok(false)` rejects the credentials; `Err` means they could not be
    /// checked at all.
    async fn validate(&self, auth: &Authentication) -> Result<bool, AuthError>;

    fn name(&self) -> &'static str;
}

/// Accepts every request.
#[derive(Debug, Default)]
pub struct NoOpAuth;

#[async_trait]
impl AuthService for NoOpAuth {
    async fn validate(&self, _auth: &Authentication) -> Result<bool, AuthError> {
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Accepts requests carrying one of a fixed set of tokens.
#[derive(Debug)]
pub struct TokenAuth {
    tokens: HashSet<String>,
}

impl TokenAuth {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl AuthService for TokenAuth {
    async fn validate(&self, auth: &Authentication) -> Result<bool, AuthError> {
        match auth.token.as_deref() {
            None | Some("") => Err(AuthError::TokenRequired),
            Some(token) => Ok(self.tokens.contains(token)),
        }
    }

    fn name(&self) -> &'static str {
        "simple_token"
    }
}

/// Pick the auth service for the configured options.
pub fn auth_from_config(
    enabled: bool,
    method: Option<&str>,
    tokens: &[String],
) -> Arc<dyn AuthService> {
    let service: Arc<dyn AuthService> = match (enabled, method) {
        (true, Some("simple_token")) => {
            let auth = TokenAuth::new(tokens.iter().cloned());
            if auth.tokens.is_empty() {
                warn!("Token auth enabled without tokens; every publish will be rejected");
            }
            Arc::new(auth)
        }
        (true, other) => {
            warn!(
                "Unknown auth method {:?}, publishing without authentication",
                other
            );
            Arc::new(NoOpAuth)
        }
        (false, _) => Arc::new(NoOpAuth),
    };

    info!("Publish authentication: {}", service.name());
    service
}
