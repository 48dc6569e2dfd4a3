//! Caller identity for the catalog API.
//!
//! Every request resolves to an [`Identity`]. Reads are open to viewers;
//! mutations (locations, games, entities, stats refresh) require
//! [`Identity::require_admin`] to pass.

mod api_key;
mod none;
mod types;

pub use api_key::ApiKeyAuthenticator;
pub use none::NoneAuthenticator;
pub use types::{AuthRequest, Identity};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the caller of a request.
    ///
    /// A missing credential is not an error: the caller becomes a viewer.
    /// A presented but wrong credential is rejected.
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}

/// Build the authenticator selected by `[auth]`.
pub fn create_authenticator(config: &AuthConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => {
            warn!("Authentication disabled, every caller may modify the catalog");
            Ok(Arc::new(NoneAuthenticator))
        }
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using api_key auth".to_string(),
                    )
                })?;
            Ok(Arc::new(ApiKeyAuthenticator::new(api_key.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn bare_request() -> AuthRequest {
        AuthRequest {
            headers: HashMap::new(),
            source_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    #[tokio::test]
    async fn test_disabled_auth_makes_everyone_admin() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
        .unwrap();

        assert_eq!(auth.method_name(), "none");
        let identity = auth.authenticate(&bare_request()).await.unwrap();
        assert!(identity.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_api_key_auth_without_key_is_viewer() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("curator-key".to_string()),
        })
        .unwrap();

        assert_eq!(auth.method_name(), "api_key");
        let identity = auth.authenticate(&bare_request()).await.unwrap();
        assert!(matches!(identity.require_admin(), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_api_key_auth_requires_a_key() {
        for api_key in [None, Some(String::new())] {
            let result = create_authenticator(&AuthConfig {
                method: AuthMethod::ApiKey,
                api_key,
            });
            assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
        }
    }
}
