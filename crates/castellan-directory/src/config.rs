//! Directory connection configuration.
//!
//! Every field is optional; anything left unset is autodiscovered at
//! connect time. An explicit override always wins over discovery.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DirectoryError, DirectoryResult};

/// Configuration for a [`DirectoryConnection`](crate::DirectoryConnection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// DNS domain of the directory (e.g., "example.com"). Discovered
    /// from the local host's reverse record when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Kerberos realm (e.g., "EXAMPLE.COM"). Discovered from the
    /// `_kerberos` TXT record when unset, falling back to the
    /// upper-cased domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,

    /// Base DN for all operations (e.g., "dc=example,dc=com").
    /// Discovered from the root DSE when unset, falling back to a
    /// realm-derived DN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,

    /// Directory server URLs (`ldap://host:port` or `ldaps://host:port`).
    /// Discovered from the `_ldap._tcp` SRV record when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,

    /// Transport connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            domain: None,
            realm: None,
            base_dn: None,
            endpoints: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl DirectoryConfig {
    /// Create a config with full autodiscovery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the DNS domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Override the kerberos realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Override the base DN.
    #[must_use]
    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    /// Override the directory server list.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Validate explicit overrides.
    ///
    /// Unset fields are fine (discovery covers them); set-but-unusable
    /// fields are configuration errors.
    pub fn validate(&self) -> DirectoryResult<()> {
        if matches!(&self.domain, Some(domain) if domain.is_empty()) {
            return Err(DirectoryError::configuration("domain override is empty"));
        }

        if matches!(&self.realm, Some(realm) if realm.is_empty()) {
            return Err(DirectoryError::configuration("realm override is empty"));
        }

        if matches!(&self.base_dn, Some(base_dn) if base_dn.is_empty()) {
            return Err(DirectoryError::configuration("base DN override is empty"));
        }

        if let Some(endpoints) = &self.endpoints {
            if endpoints.is_empty() {
                return Err(DirectoryError::configuration("endpoint override is empty"));
            }
            for endpoint in endpoints {
                let url = Url::parse(endpoint).map_err(|e| {
                    DirectoryError::configuration(format!("invalid endpoint {endpoint}: {e}"))
                })?;
                if url.scheme() != "ldap" && url.scheme() != "ldaps" {
                    return Err(DirectoryError::configuration(format!(
                        "endpoint {endpoint} must use the ldap or ldaps scheme"
                    )));
                }
                if url.host_str().is_none() {
                    return Err(DirectoryError::configuration(format!(
                        "endpoint {endpoint} has no host"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DirectoryConfig::new().validate().is_ok());
    }

    #[test]
    fn builder_sets_overrides() {
        let config = DirectoryConfig::new()
            .with_domain("example.com")
            .with_realm("EXAMPLE.COM")
            .with_base_dn("dc=example,dc=com")
            .with_endpoints(vec!["ldap://ipa.example.com:389".to_string()]);

        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.realm.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(config.base_dn.as_deref(), Some("dc=example,dc=com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_overrides_are_rejected() {
        assert!(DirectoryConfig::new().with_domain("").validate().is_err());
        assert!(DirectoryConfig::new().with_realm("").validate().is_err());
        assert!(DirectoryConfig::new().with_base_dn("").validate().is_err());
        assert!(DirectoryConfig::new()
            .with_endpoints(vec![])
            .validate()
            .is_err());
    }

    #[test]
    fn non_ldap_endpoint_is_rejected() {
        let config =
            DirectoryConfig::new().with_endpoints(vec!["http://ipa.example.com".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(DirectoryError::Configuration { .. })
        ));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = DirectoryConfig::new()
            .with_realm("EXAMPLE.COM")
            .with_endpoints(vec!["ldaps://ipa.example.com:636".to_string()]);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: DirectoryConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.realm.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(parsed.connect_timeout_secs, 30);
    }
}
