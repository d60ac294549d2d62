//! User principal entity.
//!
//! Users are read-only snapshots of directory entries, constructible
//! only through the query functions here; every instance corresponds to
//! a record the directory actually returned.

use ldap3::SearchEntry;

use crate::connection::DirectoryConnection;
use crate::entry::SearchEntryExt;
use crate::error::DirectoryResult;
use crate::filter::{
    build_filter, build_member_of_filter, build_principal_filter, escape_dn_value, Condition,
    FilterTest,
};
use crate::principal::{DirectoryPrincipal, Principal};
use crate::schema::{
    ATTR_MEMBER_OF, GROUP_CONTAINER, GROUP_OBJECT_CLASS, PRINCIPAL_PREFIX, USER_ATTRIBUTES,
    USER_CONTAINER, USER_FIELD_MAP, USER_OBJECT_CLASS,
};

/// A user entry.
///
/// A user without a `mail` attribute does not exist as a principal; the
/// factory refuses to construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    uid: String,
    display_name: String,
    email: String,
}

impl User {
    /// Construct from a directory entry. `None` when the entry lacks a
    /// uid or an email; the display name defaults to the uid.
    fn from_entry(entry: &SearchEntry) -> Option<Self> {
        let uid = entry.attr_first("uid")?.to_string();
        let email = entry.attr_first("mail")?.to_string();
        let display_name = entry
            .attr_first("displayname")
            .unwrap_or(uid.as_str())
            .to_string();

        Some(Self {
            uid,
            display_name,
            email,
        })
    }

    fn relative_dn(uid: &str) -> String {
        format!("uid={},{USER_CONTAINER}", escape_dn_value(uid))
    }

    /// The restriction every user query carries: object class, email
    /// presence, allow-list membership, and the caller's property
    /// filter.
    fn restriction_filter(
        connection: &DirectoryConnection,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<String> {
        Ok(build_filter(
            FilterTest::AllOf,
            &[
                Condition::pair("objectClass", USER_OBJECT_CLASS),
                Condition::expr("mail=*"),
                Condition::expr(build_member_of_filter(
                    connection.base_dn(),
                    allowed_groups,
                    false,
                )),
                Condition::expr(build_principal_filter(
                    search_properties,
                    USER_FIELD_MAP,
                    test,
                )?),
            ],
        ))
    }

    /// Fetch one user by uid.
    ///
    /// `None` covers both "no such user" and "user filtered out by the
    /// allow-list"; the two are indistinguishable on purpose. `test` is
    /// explicit because user callers conventionally combine properties
    /// with [`FilterTest::AllOf`] while group callers use `AnyOf`.
    pub async fn get(
        connection: &DirectoryConnection,
        uid: &str,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<Option<Self>> {
        let filter =
            Self::restriction_filter(connection, search_properties, test, allowed_groups)?;

        Ok(connection
            .read(Some(&Self::relative_dn(uid)), Some(&filter), USER_ATTRIBUTES)
            .await
            .as_ref()
            .and_then(Self::from_entry))
    }

    /// Search users by abstract properties, in directory response order.
    pub async fn search(
        connection: &DirectoryConnection,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<Vec<Self>> {
        let filter =
            Self::restriction_filter(connection, search_properties, test, allowed_groups)?;

        Ok(connection
            .search(Some(USER_CONTAINER), Some(&filter), USER_ATTRIBUTES)
            .await
            .iter()
            .filter_map(Self::from_entry)
            .collect())
    }

    /// Principal URIs of the allowed groups this user belongs to.
    ///
    /// Two queries: the user's own membership back-references, and the
    /// allowed groups themselves (self-inclusive, so nested allowed
    /// groups resolve too). The result is the pairwise DN intersection
    /// in allowed-group query order. Duplicate membership references
    /// produce duplicate URIs; deduplication is left to the caller.
    pub async fn group_principals(
        &self,
        connection: &DirectoryConnection,
        allowed_groups: &[String],
    ) -> Vec<String> {
        let membership_filter = build_filter(
            FilterTest::AllOf,
            &[
                Condition::pair("objectClass", USER_OBJECT_CLASS),
                Condition::expr("mail=*"),
                Condition::expr(build_member_of_filter(
                    connection.base_dn(),
                    allowed_groups,
                    false,
                )),
            ],
        );

        let Some(own_entry) = connection
            .read(
                Some(&Self::relative_dn(&self.uid)),
                Some(&membership_filter),
                &["uid", ATTR_MEMBER_OF],
            )
            .await
        else {
            return Vec::new();
        };

        let group_filter = build_filter(
            FilterTest::AllOf,
            &[
                Condition::pair("objectClass", GROUP_OBJECT_CLASS),
                Condition::expr(build_member_of_filter(
                    connection.base_dn(),
                    allowed_groups,
                    true,
                )),
            ],
        );

        let allowed_entries = connection
            .search(Some(GROUP_CONTAINER), Some(&group_filter), &["cn"])
            .await;

        membership_intersection(own_entry.attr_values(ATTR_MEMBER_OF), &allowed_entries)
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl DirectoryPrincipal for User {
    fn principal_id(&self) -> &str {
        &self.uid
    }

    fn to_principal(&self) -> Principal {
        Principal {
            uri: self.principal_uri(),
            display_name: self.display_name.clone(),
            email: Some(self.email.clone()),
        }
    }
}

/// Intersect membership DNs with allowed group entries.
///
/// Emission order follows the allowed-group entries (the query order);
/// duplicate membership DNs emit duplicate principals.
fn membership_intersection(memberships: &[String], groups: &[SearchEntry]) -> Vec<String> {
    let mut principals = Vec::new();

    for group in groups {
        let Some(name) = group.attr_first("cn") else {
            continue;
        };
        for membership in memberships {
            if membership == &group.dn {
                principals.push(format!("{PRINCIPAL_PREFIX}{name}"));
            }
        }
    }

    principals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::test_support::entry;

    fn user_entry(uid: &str, display_name: Option<&str>, mail: Option<&str>) -> SearchEntry {
        let mut attrs: Vec<(&str, &[&str])> = vec![("uid", std::slice::from_ref(&uid))];
        let display_values;
        if let Some(display_name) = display_name {
            display_values = [display_name];
            attrs.push(("displayname", &display_values));
        }
        let mail_values;
        if let Some(mail) = mail {
            mail_values = [mail];
            attrs.push(("mail", &mail_values));
        }
        entry(
            &format!("uid={uid},cn=users,cn=accounts,dc=example,dc=com"),
            &attrs,
        )
    }

    #[test]
    fn factory_requires_email() {
        assert!(User::from_entry(&user_entry("alice", Some("Alice"), None)).is_none());
        assert!(User::from_entry(&user_entry("alice", Some("Alice"), Some("a@example.com"))).is_some());
    }

    #[test]
    fn display_name_defaults_to_uid() {
        let user = User::from_entry(&user_entry("alice", None, Some("a@example.com"))).unwrap();
        assert_eq!(user.display_name(), "alice");

        let named =
            User::from_entry(&user_entry("alice", Some("Alice Price"), Some("a@example.com")))
                .unwrap();
        assert_eq!(named.display_name(), "Alice Price");
    }

    #[test]
    fn principal_uri_has_single_prefix() {
        let user =
            User::from_entry(&user_entry("alice", Some("Alice"), Some("a@example.com"))).unwrap();
        let principal = user.to_principal();

        assert_eq!(principal.uri, "principals/alice");
        assert_eq!(principal.display_name, "Alice");
        assert_eq!(principal.email.as_deref(), Some("a@example.com"));
        assert!(!principal.uri.contains("principals/principals/"));
    }

    #[test]
    fn relative_dn_escapes_uid() {
        assert_eq!(
            User::relative_dn("a,b"),
            "uid=a\\,b,cn=users,cn=accounts"
        );
    }

    fn group_entry(name: &str) -> SearchEntry {
        entry(
            &format!("cn={name},cn=groups,cn=accounts,dc=example,dc=com"),
            &[("cn", &[name])],
        )
    }

    #[test]
    fn intersection_emits_exactly_matching_groups() {
        let memberships = vec![
            "cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
            "cn=unrelated,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
            "cn=staff,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
        ];
        let groups = vec![group_entry("dav-access"), group_entry("staff")];

        let principals = membership_intersection(&memberships, &groups);
        assert_eq!(
            principals,
            vec![
                "principals/dav-access".to_string(),
                "principals/staff".to_string()
            ]
        );
    }

    #[test]
    fn intersection_order_follows_group_query_order() {
        let memberships = vec![
            "cn=staff,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
            "cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
        ];
        let groups = vec![group_entry("dav-access"), group_entry("staff")];

        let principals = membership_intersection(&memberships, &groups);
        assert_eq!(
            principals,
            vec![
                "principals/dav-access".to_string(),
                "principals/staff".to_string()
            ]
        );
    }

    #[test]
    fn intersection_preserves_duplicate_memberships() {
        let memberships = vec![
            "cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
            "cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com".to_string(),
        ];
        let groups = vec![group_entry("dav-access")];

        let principals = membership_intersection(&memberships, &groups);
        assert_eq!(
            principals,
            vec![
                "principals/dav-access".to_string(),
                "principals/dav-access".to_string()
            ]
        );
    }

    #[test]
    fn intersection_with_no_overlap_is_empty() {
        let memberships =
            vec!["cn=other,cn=groups,cn=accounts,dc=example,dc=com".to_string()];
        let groups = vec![group_entry("dav-access")];

        assert!(membership_intersection(&memberships, &groups).is_empty());
    }
}
