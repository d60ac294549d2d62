//! DNS autodiscovery of directory connection parameters.
//!
//! Each step is a function returning success or failure; the connection
//! composes them into an explicit resolver chain (override, else
//! discovery, else fallback where one exists, else fatal error). The
//! fatal/fallback split follows the field: domain and endpoints have no
//! fallback, realm falls back to the upper-cased domain, base DN always
//! derives from the realm.

use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

use crate::error::{DirectoryError, DirectoryResult};

/// Build a resolver from the system DNS configuration.
pub fn system_resolver() -> DirectoryResult<TokioAsyncResolver> {
    TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
        DirectoryError::configuration(format!("system DNS configuration unavailable: {e}"))
    })
}

/// Discover the local DNS domain.
///
/// Resolves the local hostname, reverse-resolves the first address to a
/// fully-qualified name, and takes the suffix after the first label.
/// Single-label names have no suffix; a non-routable placeholder suffix
/// is rejected.
pub async fn discover_domain(resolver: &TokioAsyncResolver) -> DirectoryResult<String> {
    let hostname = hostname::get()
        .map_err(|e| DirectoryError::discovery(format!("local hostname unavailable: {e}")))?
        .into_string()
        .map_err(|_| DirectoryError::discovery("local hostname is not valid UTF-8"))?;

    let addr = resolver
        .lookup_ip(hostname.as_str())
        .await
        .ok()
        .and_then(|lookup| lookup.iter().next())
        .ok_or_else(|| {
            DirectoryError::discovery(format!("failed to resolve local hostname {hostname}"))
        })?;

    let fqdn = resolver
        .reverse_lookup(addr)
        .await
        .ok()
        .and_then(|lookup| lookup.iter().next().map(|name| name.to_utf8()))
        .ok_or_else(|| {
            DirectoryError::discovery(format!("no reverse record for local address {addr}"))
        })?;

    let domain = domain_from_fqdn(&fqdn).ok_or_else(|| {
        DirectoryError::discovery(format!("failed to discover local domain from {fqdn}"))
    })?;

    debug!(domain = %domain, fqdn = %fqdn, "discovered local domain");
    Ok(domain)
}

/// Extract the domain part of a fully-qualified hostname.
///
/// Returns `None` for single-label names and for placeholder domains
/// that cannot identify a directory.
pub(crate) fn domain_from_fqdn(fqdn: &str) -> Option<String> {
    let fqdn = fqdn.trim_end_matches('.').to_lowercase();
    let (_, domain) = fqdn.split_once('.')?;

    if matches!(domain, "localhost" | "localdomain" | "localhost.localdomain") {
        return None;
    }

    Some(domain.to_string())
}

/// Resolve the realm from a discovery result, falling back to the
/// upper-cased domain. An absent TXT record is never an error.
#[must_use]
pub fn realm_or_default(discovered: Option<String>, domain: &str) -> String {
    discovered.unwrap_or_else(|| domain.to_uppercase())
}

/// Discover the kerberos realm from the `_kerberos` TXT record.
///
/// Absence is not an error; the caller falls back to the upper-cased
/// domain.
pub async fn discover_realm(resolver: &TokioAsyncResolver, domain: &str) -> Option<String> {
    let lookup = resolver.txt_lookup(format!("_kerberos.{domain}")).await.ok()?;
    let txt = lookup.iter().next()?;

    let data: Vec<u8> = txt
        .txt_data()
        .iter()
        .flat_map(|chunk| chunk.iter().copied())
        .collect();
    if data.is_empty() {
        return None;
    }

    let realm = String::from_utf8_lossy(&data).into_owned();
    debug!(realm = %realm, domain = %domain, "discovered kerberos realm");
    Some(realm)
}

/// Discover directory servers from the `_ldap._tcp` SRV record.
pub async fn discover_endpoints(
    resolver: &TokioAsyncResolver,
    domain: &str,
) -> DirectoryResult<Vec<String>> {
    let lookup = resolver
        .srv_lookup(format!("_ldap._tcp.{domain}"))
        .await
        .map_err(|e| {
            DirectoryError::discovery(format!(
                "failed to discover directory servers for {domain}: {e}"
            ))
        })?;

    let endpoints: Vec<String> = lookup
        .iter()
        .map(|srv| {
            format!(
                "ldap://{}:{}",
                srv.target().to_utf8().trim_end_matches('.'),
                srv.port()
            )
        })
        .collect();

    if endpoints.is_empty() {
        return Err(DirectoryError::discovery(format!(
            "no directory servers found for {domain}"
        )));
    }

    debug!(endpoints = %endpoints.join(" "), "discovered directory servers");
    Ok(endpoints)
}

/// Derive a base DN from a realm by prefixing each label with `dc=`.
///
/// Deterministic for a given realm; used when the root DSE does not
/// advertise exactly one default naming context.
#[must_use]
pub fn base_dn_from_realm(realm: &str) -> String {
    realm
        .to_lowercase()
        .split('.')
        .map(|label| format!("dc={label}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_suffix_after_first_label() {
        assert_eq!(
            domain_from_fqdn("host.example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            domain_from_fqdn("host.ipa.example.com."),
            Some("ipa.example.com".to_string())
        );
    }

    #[test]
    fn domain_is_lowercased() {
        assert_eq!(
            domain_from_fqdn("HOST.EXAMPLE.COM"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn single_label_name_has_no_domain() {
        assert_eq!(domain_from_fqdn("myhost"), None);
    }

    #[test]
    fn placeholder_domains_are_rejected() {
        assert_eq!(domain_from_fqdn("myhost.localhost"), None);
        assert_eq!(domain_from_fqdn("myhost.localdomain"), None);
        assert_eq!(domain_from_fqdn("myhost.localhost.localdomain"), None);
    }

    #[test]
    fn absent_realm_record_falls_back_to_uppercased_domain() {
        assert_eq!(realm_or_default(None, "example.com"), "EXAMPLE.COM");
        assert_eq!(
            realm_or_default(None, "ipa.example.com"),
            "IPA.EXAMPLE.COM"
        );
    }

    #[test]
    fn discovered_realm_wins_over_fallback() {
        assert_eq!(
            realm_or_default(Some("CORP.EXAMPLE.COM".to_string()), "example.com"),
            "CORP.EXAMPLE.COM"
        );
    }

    #[test]
    fn base_dn_derivation_is_deterministic() {
        assert_eq!(base_dn_from_realm("EXAMPLE.COM"), "dc=example,dc=com");
        assert_eq!(
            base_dn_from_realm("IPA.EXAMPLE.COM"),
            "dc=ipa,dc=example,dc=com"
        );
        assert_eq!(base_dn_from_realm("LOCAL"), "dc=local");
    }
}
