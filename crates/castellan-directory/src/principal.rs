//! The principal record exposed to the protocol server.

use serde::Serialize;

use crate::schema::PRINCIPAL_PREFIX;

/// Access-control-facing representation of a directory entity.
///
/// This is the only shape that leaves this crate; the entities
/// themselves stay internal snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Principal URI, `principals/<identifier>`.
    pub uri: String,

    /// Human-readable name.
    pub display_name: String,

    /// Email address; present for users only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A directory entity addressable as a principal.
pub trait DirectoryPrincipal {
    /// The entity's unique identifier (`uid` for users, `cn` for groups).
    fn principal_id(&self) -> &str;

    /// Convert to the fixed-shape principal record.
    fn to_principal(&self) -> Principal;

    /// The entity's principal URI.
    fn principal_uri(&self) -> String {
        format!("{PRINCIPAL_PREFIX}{}", self.principal_id())
    }
}
