//! LDAP filter composition.
//!
//! Pure functions building filter expressions from conditions. An empty
//! result string always means "no restriction"; callers omit it rather
//! than wrapping an always-false clause.

use crate::error::{DirectoryError, DirectoryResult};
use crate::schema::GROUP_CONTAINER;

/// How a group of conditions is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterTest {
    /// All conditions must match (`&`).
    #[default]
    AllOf,
    /// Any condition may match (`|`).
    AnyOf,
}

impl FilterTest {
    fn operator(self) -> char {
        match self {
            Self::AllOf => '&',
            Self::AnyOf => '|',
        }
    }
}

/// One condition handed to [`build_filter`].
///
/// Values in `Pairs` are interpolated verbatim; the caller escapes them
/// at the point where untrusted input enters (see
/// [`escape_filter_value`]).
#[derive(Debug, Clone)]
pub enum Condition {
    /// A flat key/value list rendered as concatenated `(key=value)`
    /// clauses. An empty list renders nothing.
    Pairs(Vec<(String, String)>),
    /// A pre-formed expression, auto-wrapped in parentheses when not
    /// already wrapped. An empty string renders nothing. The expression
    /// must be parenthesis-balanced; the wrap check only inspects the
    /// first and last character.
    Expr(String),
}

impl Condition {
    /// A single `(key=value)` condition.
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Pairs(vec![(key.into(), value.into())])
    }

    /// A pre-formed expression condition.
    pub fn expr(expr: impl Into<String>) -> Self {
        Self::Expr(expr.into())
    }

    fn render(&self) -> String {
        match self {
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|(key, value)| format!("({key}={value})"))
                .collect(),
            Self::Expr(expr) if expr.is_empty() => String::new(),
            Self::Expr(expr) => {
                if expr.starts_with('(') && expr.ends_with(')') {
                    expr.clone()
                } else {
                    format!("({expr})")
                }
            }
        }
    }
}

/// Combine conditions into one AND/OR group.
///
/// Conditions that render nothing are skipped. If every condition is
/// empty the result is the empty string; otherwise the concatenation is
/// wrapped exactly once in the requested operator.
#[must_use]
pub fn build_filter(test: FilterTest, conditions: &[Condition]) -> String {
    let body: String = conditions.iter().map(Condition::render).collect();

    if body.is_empty() {
        return String::new();
    }

    format!("({}{})", test.operator(), body)
}

/// Build a filter from abstract search properties.
///
/// Each property name is mapped to its directory attribute through
/// `field_map`; an unknown name is a client error and produces no
/// partial filter. Known properties become case-insensitive substring
/// matches on the mapped attribute.
pub fn build_principal_filter(
    search_properties: &[(String, String)],
    field_map: &[(&str, &str)],
    test: FilterTest,
) -> DirectoryResult<String> {
    let mut conditions = Vec::with_capacity(search_properties.len());

    for (property, value) in search_properties {
        let attribute = field_map
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, attribute)| *attribute)
            .ok_or_else(|| {
                DirectoryError::bad_request(format!("unknown search property: {property}"))
            })?;

        conditions.push(Condition::pair(
            format!("{attribute}:caseIgnoreIA5Match:"),
            format!("*{}*", escape_filter_value(value)),
        ));
    }

    Ok(build_filter(test, &conditions))
}

/// Build a group-membership restriction filter.
///
/// One `memberOf=<group DN>` condition per allowed group, OR-combined:
/// membership in any one allowed group suffices. With `include_self`
/// (used when filtering group objects rather than users) a direct
/// `cn=<name>` condition is added so the group itself satisfies the
/// filter, not only its members. An empty allow-list yields the empty
/// string, meaning authorization is unrestricted.
#[must_use]
pub fn build_member_of_filter(base_dn: &str, group_names: &[String], include_self: bool) -> String {
    let mut conditions = Vec::with_capacity(group_names.len());

    for name in group_names {
        let escaped = escape_filter_value(name);
        conditions.push(Condition::pair(
            "memberOf",
            format!("cn={escaped},{GROUP_CONTAINER},{base_dn}"),
        ));
        if include_self {
            conditions.push(Condition::pair("cn", escaped));
        }
    }

    build_filter(FilterTest::AnyOf, &conditions)
}

/// Escape special characters in LDAP filter values (RFC 4515).
///
/// Every untrusted value interpolated into a filter passes through here.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Escape special characters in DN attribute values per RFC 4514.
///
/// DN escaping differs from filter escaping: `, + " \ < > ; =` take a
/// backslash prefix, NUL is hex-escaped, space only at the start or end
/// of the value, `#` only at the start.
#[must_use]
pub fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if i == 0 || i == last => result.push_str("\\20"),
            '#' if i == 0 => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}
