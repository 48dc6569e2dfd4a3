use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use super::AuthError;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated caller identity.
///
/// The catalog core trusts this value as handed in; only `is_admin` gates
/// location mutations, game edits and stats force-refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    pub is_admin: bool,
}

impl Identity {
    /// Identity used when authentication is disabled. Has admin rights.
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            is_admin: true,
        }
    }

    /// Unauthenticated caller on a deployment that requires credentials.
    pub fn viewer() -> Self {
        Self {
            user_id: "viewer".to_string(),
            method: "api_key".to_string(),
            is_admin: false,
        }
    }

    /// Gate for catalog mutations.
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity_is_admin() {
        let identity = Identity::anonymous();
        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert!(identity.is_admin);
    }

    #[test]
    fn test_viewer_identity_is_not_admin() {
        assert!(!Identity::viewer().is_admin);
        assert!(matches!(
            Identity::viewer().require_admin(),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: "curator".to_string(),
            method: "api_key".to_string(),
            is_admin: true,
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, identity);
    }
}
