//! Directory schema constants for a FreeIPA-style tree.
//!
//! Containers are relative to the connection's base DN. The abstract
//! property names in the field maps are the ones the protocol server
//! sends; anything outside a field map is a client error.

/// Prefix for all principal URIs handed to the protocol server.
pub const PRINCIPAL_PREFIX: &str = "principals/";

pub const USER_CONTAINER: &str = "cn=users,cn=accounts";
pub const USER_OBJECT_CLASS: &str = "person";
pub const USER_ATTRIBUTES: &[&str] = &["uid", "displayname", "mail"];

pub const GROUP_CONTAINER: &str = "cn=groups,cn=accounts";
pub const GROUP_OBJECT_CLASS: &str = "groupofnames";
pub const GROUP_ATTRIBUTES: &[&str] = &["cn", "description"];

/// Abstract search property: display name.
pub const PROP_DISPLAY_NAME: &str = "{DAV:}displayname";
/// Abstract search property: email address.
pub const PROP_EMAIL: &str = "{http://sabredav.org/ns}email-address";

/// Property-to-attribute map for user searches.
pub const USER_FIELD_MAP: &[(&str, &str)] = &[
    (PROP_DISPLAY_NAME, "displayname"),
    (PROP_EMAIL, "mail"),
];

/// Property-to-attribute map for group searches. Groups carry no display
/// name attribute of their own; the description stands in for it.
pub const GROUP_FIELD_MAP: &[(&str, &str)] = &[
    (PROP_DISPLAY_NAME, "description"),
    (PROP_EMAIL, "mail"),
];

/// Back-reference attribute listing the groups an entry belongs to,
/// maintained by the directory server.
pub const ATTR_MEMBER_OF: &str = "memberOf";

/// Match-all filter used when a caller omits one.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";
