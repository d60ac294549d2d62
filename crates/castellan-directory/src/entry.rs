//! Attribute access helpers for directory entries.
//!
//! LDAP attribute names are case-insensitive but servers echo them in
//! whatever case the schema declares; lookups here ignore case so entity
//! factories do not depend on server spelling.

use ldap3::SearchEntry;

/// Case-insensitive attribute access on [`SearchEntry`].
pub trait SearchEntryExt {
    /// All values of an attribute, empty when absent.
    fn attr_values(&self, name: &str) -> &[String];

    /// First value of an attribute.
    fn attr_first(&self, name: &str) -> Option<&str>;
}

impl SearchEntryExt for SearchEntry {
    fn attr_values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map_or(&[], |(_, values)| values.as_slice())
    }

    fn attr_first(&self, name: &str) -> Option<&str> {
        self.attr_values(name).first().map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use ldap3::SearchEntry;

    /// Build an entry the way the directory would return it.
    pub fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> SearchEntry {
        SearchEntry {
            dn: dn.to_string(),
            attrs: attrs
                .iter()
                .map(|(name, values)| {
                    (
                        (*name).to_string(),
                        values.iter().map(|v| (*v).to_string()).collect(),
                    )
                })
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::entry;
    use super::*;

    #[test]
    fn attribute_lookup_ignores_case() {
        let e = entry(
            "uid=alice,cn=users,cn=accounts,dc=example,dc=com",
            &[("memberOf", &["cn=dav-access,cn=groups,cn=accounts,dc=example,dc=com"])],
        );

        assert_eq!(e.attr_values("memberof").len(), 1);
        assert_eq!(e.attr_values("MEMBEROF").len(), 1);
        assert!(e.attr_first("memberOf").is_some());
    }

    #[test]
    fn absent_attribute_is_empty() {
        let e = entry("cn=x", &[]);
        assert!(e.attr_values("mail").is_empty());
        assert_eq!(e.attr_first("mail"), None);
    }
}
