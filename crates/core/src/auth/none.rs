use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Treats every caller as the anonymous admin.
///
/// Only selected by an explicit `method = "none"`; there is no fallback to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
