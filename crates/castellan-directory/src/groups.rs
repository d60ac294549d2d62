//! Group principal entity.

use ldap3::SearchEntry;

use crate::connection::DirectoryConnection;
use crate::entry::SearchEntryExt;
use crate::error::DirectoryResult;
use crate::filter::{
    build_filter, build_member_of_filter, build_principal_filter, escape_dn_value,
    escape_filter_value, Condition, FilterTest,
};
use crate::principal::{DirectoryPrincipal, Principal};
use crate::schema::{
    GROUP_ATTRIBUTES, GROUP_CONTAINER, GROUP_FIELD_MAP, GROUP_OBJECT_CLASS, PRINCIPAL_PREFIX,
    USER_CONTAINER, USER_OBJECT_CLASS,
};

/// A group entry. The description stands in for a display name when the
/// directory has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    description: String,
}

impl Group {
    fn from_entry(entry: &SearchEntry) -> Option<Self> {
        let name = entry.attr_first("cn")?.to_string();
        let description = entry
            .attr_first("description")
            .unwrap_or(name.as_str())
            .to_string();

        Some(Self { name, description })
    }

    fn relative_dn(name: &str) -> String {
        format!("cn={},{GROUP_CONTAINER}", escape_dn_value(name))
    }

    /// Group queries are self-inclusive on the allow-list: an allowed
    /// group matches as itself, not only through membership, so nested
    /// allowed groups resolve.
    fn restriction_filter(
        connection: &DirectoryConnection,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<String> {
        Ok(build_filter(
            FilterTest::AllOf,
            &[
                Condition::pair("objectClass", GROUP_OBJECT_CLASS),
                Condition::expr(build_member_of_filter(
                    connection.base_dn(),
                    allowed_groups,
                    true,
                )),
                Condition::expr(build_principal_filter(
                    search_properties,
                    GROUP_FIELD_MAP,
                    test,
                )?),
            ],
        ))
    }

    /// Fetch one group by name. `None` never distinguishes absence from
    /// allow-list restriction.
    pub async fn get(
        connection: &DirectoryConnection,
        name: &str,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<Option<Self>> {
        let filter =
            Self::restriction_filter(connection, search_properties, test, allowed_groups)?;

        Ok(connection
            .read(
                Some(&Self::relative_dn(name)),
                Some(&filter),
                GROUP_ATTRIBUTES,
            )
            .await
            .as_ref()
            .and_then(Self::from_entry))
    }

    /// Search groups by abstract properties, in directory response
    /// order. Group callers conventionally pass [`FilterTest::AnyOf`]:
    /// a group is found by matching any of its display attributes.
    pub async fn search(
        connection: &DirectoryConnection,
        search_properties: &[(String, String)],
        test: FilterTest,
        allowed_groups: &[String],
    ) -> DirectoryResult<Vec<Self>> {
        let filter =
            Self::restriction_filter(connection, search_properties, test, allowed_groups)?;

        Ok(connection
            .search(Some(GROUP_CONTAINER), Some(&filter), GROUP_ATTRIBUTES)
            .await
            .iter()
            .filter_map(Self::from_entry)
            .collect())
    }

    /// Principal URIs of this group's member users, restricted by the
    /// allow-list.
    pub async fn member_principals(
        &self,
        connection: &DirectoryConnection,
        allowed_groups: &[String],
    ) -> Vec<String> {
        let own_rdn = format!("cn={}", escape_filter_value(&self.name));
        let own_dn = connection.resolve_dn(&[own_rdn.as_str(), GROUP_CONTAINER]);

        let filter = build_filter(
            FilterTest::AllOf,
            &[
                Condition::pair("objectClass", USER_OBJECT_CLASS),
                Condition::pair("memberOf", own_dn),
                Condition::expr(build_member_of_filter(
                    connection.base_dn(),
                    allowed_groups,
                    false,
                )),
            ],
        );

        connection
            .search(Some(USER_CONTAINER), Some(&filter), &["uid"])
            .await
            .iter()
            .filter_map(|entry| entry.attr_first("uid"))
            .map(|uid| format!("{PRINCIPAL_PREFIX}{uid}"))
            .collect()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl DirectoryPrincipal for Group {
    fn principal_id(&self) -> &str {
        &self.name
    }

    fn to_principal(&self) -> Principal {
        Principal {
            uri: self.principal_uri(),
            display_name: self.description.clone(),
            email: None,
        }
    }
}
