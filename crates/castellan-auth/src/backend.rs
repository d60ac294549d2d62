//! The authorization backend.

use async_trait::async_trait;
use tracing::debug;

use castellan_directory::{DirectoryConnection, DirectoryPrincipal, FilterTest, User};

/// Outcome of an authorization check.
///
/// Denial is an expected, frequent outcome, not an error. The reason for
/// a denial is deliberately the same shape whether the user does not
/// exist or merely lacks an allowed group membership; no side channel
/// reveals which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Authorized; carries the principal URI (`principals/<uid>`).
    Granted { principal: String },
    /// Not authorized; carries a human-readable reason.
    Denied { reason: String },
}

impl AuthOutcome {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// An authorization decision point for the protocol server.
#[async_trait]
pub trait AuthorizationBackend: Send + Sync {
    /// Decide whether the asserted identity is authorized.
    async fn check(&self, assertion: &str) -> AuthOutcome;

    /// Emit an authentication challenge.
    ///
    /// Intentionally a no-op here: the identity assertion was already
    /// authenticated upstream; this gate only authorizes.
    fn challenge(&self) {}
}

/// Authorization against the directory under a group allow-list.
///
/// An empty allow-list means no group membership is checked — any
/// resolvable user principal is authorized.
pub struct GssapiAuthBackend {
    directory: DirectoryConnection,
    allowed_groups: Vec<String>,
}

impl GssapiAuthBackend {
    #[must_use]
    pub fn new(directory: DirectoryConnection, allowed_groups: Vec<String>) -> Self {
        Self {
            directory,
            allowed_groups,
        }
    }
}

#[async_trait]
impl AuthorizationBackend for GssapiAuthBackend {
    async fn check(&self, assertion: &str) -> AuthOutcome {
        // A realm mismatch is decided locally; the directory is not
        // consulted.
        let name = match verify_realm(assertion, self.directory.realm()) {
            Ok(name) => name,
            Err(reason) => {
                debug!(assertion = %assertion, reason = %reason, "authorization denied");
                return AuthOutcome::Denied { reason };
            }
        };

        match User::get(&self.directory, name, &[], FilterTest::AllOf, &self.allowed_groups).await
        {
            Ok(Some(user)) => AuthOutcome::Granted {
                principal: user.principal_uri(),
            },
            _ => {
                debug!(name = %name, "authorization denied");
                AuthOutcome::Denied {
                    reason: format!("user {name} failed group authorization"),
                }
            }
        }
    }
}

/// Split an identity assertion and verify its realm component.
///
/// Returns the bare name, or a denial reason when a realm is present
/// and differs from the local one.
fn verify_realm<'a>(assertion: &'a str, local_realm: &str) -> Result<&'a str, String> {
    match assertion.split_once('@') {
        Some((_, realm)) if realm != local_realm => {
            Err(format!("identity has unknown realm: {realm}"))
        }
        Some((name, _)) => Ok(name),
        None => Ok(assertion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_passes_through() {
        assert_eq!(verify_realm("alice", "EXAMPLE.COM"), Ok("alice"));
    }

    #[test]
    fn matching_realm_is_stripped() {
        assert_eq!(verify_realm("alice@EXAMPLE.COM", "EXAMPLE.COM"), Ok("alice"));
    }

    #[test]
    fn foreign_realm_is_denied() {
        let reason = verify_realm("alice@WRONG.REALM", "EXAMPLE.COM").unwrap_err();
        assert!(reason.contains("WRONG.REALM"));
    }

    #[test]
    fn realm_comparison_is_case_sensitive() {
        assert!(verify_realm("alice@example.com", "EXAMPLE.COM").is_err());
    }

    #[test]
    fn empty_name_with_realm_still_splits() {
        assert_eq!(verify_realm("@EXAMPLE.COM", "EXAMPLE.COM"), Ok(""));
    }

    #[test]
    fn outcome_shapes() {
        let granted = AuthOutcome::Granted {
            principal: "principals/alice".to_string(),
        };
        assert!(granted.is_granted());

        let denied = AuthOutcome::Denied {
            reason: "user bob failed group authorization".to_string(),
        };
        assert!(!denied.is_granted());
    }
}
