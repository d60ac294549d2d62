//! Directory connection and session management.
//!
//! One connection owns one authenticated LDAP session. Parameters not
//! supplied in the configuration are discovered in dependency order
//! (domain, realm, servers, then base DN once the session exists) and
//! are immutable afterwards; discovery never runs twice. Queries on the
//! session are issued strictly sequentially.

use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DirectoryConfig;
use crate::discovery;
use crate::entry::SearchEntryExt;
use crate::error::{DirectoryError, DirectoryResult};
use crate::schema::MATCH_ALL_FILTER;

/// An authenticated session to the directory domain.
pub struct DirectoryConnection {
    domain: String,
    realm: String,
    base_dn: String,
    endpoints: Vec<String>,
    session: Ldap,
}

impl std::fmt::Debug for DirectoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConnection")
            .field("domain", &self.domain)
            .field("realm", &self.realm)
            .field("base_dn", &self.base_dn)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl DirectoryConnection {
    /// Resolve connection parameters and open the session.
    ///
    /// Resolution order per field: explicit override, then discovery,
    /// then a domain-derived fallback where one exists (realm, base DN).
    /// Domain and server discovery failures are fatal
    /// ([`DirectoryError::Discovery`]); connect, STARTTLS and bind
    /// failures are fatal ([`DirectoryError::Connection`]). There is no
    /// retry.
    pub async fn connect(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let mut resolver: Option<TokioAsyncResolver> = None;

        let domain = match &config.domain {
            Some(domain) => domain.to_lowercase(),
            None => discovery::discover_domain(resolver_for(&mut resolver)?).await?,
        };

        let realm = match &config.realm {
            Some(realm) => realm.clone(),
            None => discovery::realm_or_default(
                discovery::discover_realm(resolver_for(&mut resolver)?, &domain).await,
                &domain,
            ),
        };

        let endpoints = match &config.endpoints {
            Some(endpoints) => endpoints.clone(),
            None => discovery::discover_endpoints(resolver_for(&mut resolver)?, &domain).await?,
        };

        let session = open_session(
            &endpoints,
            Duration::from_secs(config.connect_timeout_secs),
        )
        .await?;

        let base_dn = match &config.base_dn {
            Some(base_dn) => base_dn.clone(),
            None => match discover_base_dn(&session).await {
                Some(base_dn) => base_dn,
                None => discovery::base_dn_from_realm(&realm),
            },
        };

        info!(
            domain = %domain,
            realm = %realm,
            base_dn = %base_dn,
            endpoints = %endpoints.join(" "),
            "directory connection established"
        );

        Ok(Self {
            domain,
            realm,
            base_dn,
            endpoints,
            session,
        })
    }

    /// Search all entries under a container.
    ///
    /// `container` is relative to the base DN, or `None` for the base DN
    /// itself; `filter` defaults to match-all. Zero matches and
    /// query-level failures both return the empty list; only session
    /// establishment can fail hard.
    pub async fn search(
        &self,
        container: Option<&str>,
        filter: Option<&str>,
        attributes: &[&str],
    ) -> Vec<SearchEntry> {
        let base = join_container(&self.base_dn, container);
        let filter = effective_filter(filter);
        debug!(base = %base, filter = %filter, "directory search");

        self.query(&base, Scope::Subtree, filter, attributes).await
    }

    /// Read at most the first entry at a container DN.
    ///
    /// Same contract as [`search`](Self::search); absent entries and
    /// filtered-out entries are indistinguishable.
    pub async fn read(
        &self,
        container: Option<&str>,
        filter: Option<&str>,
        attributes: &[&str],
    ) -> Option<SearchEntry> {
        let base = join_container(&self.base_dn, container);
        let filter = effective_filter(filter);
        debug!(base = %base, filter = %filter, "directory read");

        self.query(&base, Scope::Base, filter, attributes)
            .await
            .into_iter()
            .next()
    }

    async fn query(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: &[&str],
    ) -> Vec<SearchEntry> {
        let mut session = self.session.clone();

        let result = match session.search(base, scope, filter, attributes.to_vec()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(base = %base, error = %e, "directory query failed");
                return Vec::new();
            }
        };

        match result.success() {
            Ok((entries, _)) => entries.into_iter().map(SearchEntry::construct).collect(),
            Err(e) => {
                debug!(base = %base, error = %e, "directory query returned no result");
                Vec::new()
            }
        }
    }

    /// Join relative DN components with the base DN.
    #[must_use]
    pub fn resolve_dn(&self, components: &[&str]) -> String {
        join_dn(components, &self.base_dn)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

fn resolver_for(
    slot: &mut Option<TokioAsyncResolver>,
) -> DirectoryResult<&TokioAsyncResolver> {
    Ok(match slot {
        Some(resolver) => resolver,
        None => &*slot.insert(discovery::system_resolver()?),
    })
}

/// Open a session against the first reachable endpoint and bind.
///
/// Endpoints are tried in order; connect failures move on to the next
/// one. Once a connection is established, a STARTTLS or bind failure is
/// fatal and the remaining endpoints are not tried.
async fn open_session(endpoints: &[String], timeout: Duration) -> DirectoryResult<Ldap> {
    let mut last_error: Option<ldap3::LdapError> = None;

    for endpoint in endpoints {
        // Plain ldap:// endpoints get a STARTTLS upgrade; ldaps:// is
        // already encrypted. The client speaks protocol v3 only.
        let starttls = !endpoint.starts_with("ldaps://");
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(starttls);

        let (conn, mut session) = match LdapConnAsync::with_settings(settings, endpoint).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "directory server unreachable");
                last_error = Some(e);
                continue;
            }
        };

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "directory connection driver error");
            }
        });

        // Bind with the ambient kerberos credential; the identity was
        // already obtained outside this process (delegated credential,
        // no principal or password of our own).
        let server_fqdn = server_host(endpoint)?;
        session
            .sasl_gssapi_bind(&server_fqdn)
            .await
            .map_err(|e| {
                DirectoryError::connection_with_source(
                    format!("GSSAPI bind to {endpoint} failed"),
                    e,
                )
            })?
            .success()
            .map_err(|e| {
                DirectoryError::connection_with_source(
                    format!("GSSAPI bind to {endpoint} rejected"),
                    e,
                )
            })?;

        debug!(endpoint = %endpoint, "bound to directory server");
        return Ok(session);
    }

    Err(match last_error {
        Some(e) => DirectoryError::connection_with_source(
            format!(
                "no directory server reachable among: {}",
                endpoints.join(" ")
            ),
            e,
        ),
        None => DirectoryError::connection("no directory servers configured"),
    })
}

fn server_host(endpoint: &str) -> DirectoryResult<String> {
    Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .ok_or_else(|| DirectoryError::connection(format!("endpoint {endpoint} has no host")))
}

/// Read the default naming context from the root DSE.
///
/// Used only when no base DN override is given; anything other than
/// exactly one advertised value falls back to the realm-derived DN.
async fn discover_base_dn(session: &Ldap) -> Option<String> {
    let mut session = session.clone();

    let (entries, _) = session
        .search("", Scope::Base, MATCH_ALL_FILTER, vec!["defaultnamingcontext"])
        .await
        .ok()?
        .success()
        .ok()?;

    if entries.len() != 1 {
        return None;
    }

    let entry = SearchEntry::construct(entries.into_iter().next()?);
    let values = entry.attr_values("defaultnamingcontext");
    if values.len() == 1 {
        debug!(base_dn = %values[0], "discovered base DN from root DSE");
        Some(values[0].clone())
    } else {
        None
    }
}

fn effective_filter(filter: Option<&str>) -> &str {
    match filter {
        Some(filter) if !filter.is_empty() => filter,
        _ => MATCH_ALL_FILTER,
    }
}

fn join_container(base_dn: &str, container: Option<&str>) -> String {
    match container {
        Some(container) => format!("{container},{base_dn}"),
        None => base_dn.to_string(),
    }
}

fn join_dn(components: &[&str], base_dn: &str) -> String {
    let mut parts: Vec<&str> = components.to_vec();
    parts.push(base_dn);
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_is_joined_under_base_dn() {
        assert_eq!(
            join_container("dc=example,dc=com", Some("cn=users,cn=accounts")),
            "cn=users,cn=accounts,dc=example,dc=com"
        );
        assert_eq!(join_container("dc=example,dc=com", None), "dc=example,dc=com");
    }

    #[test]
    fn dn_components_are_joined_in_order() {
        assert_eq!(
            join_dn(&["cn=dav-access", "cn=groups,cn=accounts"], "dc=example,dc=com"),
            "cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com"
        );
    }

    #[test]
    fn omitted_filter_matches_all() {
        assert_eq!(effective_filter(None), MATCH_ALL_FILTER);
        assert_eq!(effective_filter(Some("")), MATCH_ALL_FILTER);
        assert_eq!(effective_filter(Some("(uid=alice)")), "(uid=alice)");
    }

    #[test]
    fn server_host_extracts_fqdn() {
        assert_eq!(
            server_host("ldap://ipa.example.com:389").unwrap(),
            "ipa.example.com"
        );
        assert!(server_host("not a url").is_err());
    }
}
