use std::collections::BTreeSet;

use crate::identity::Role;

/// Who may enter a guarded subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Any logged-in principal, whether or not its role claim decodes.
    Authenticated,
    /// Only principals whose decoded role is in the set.
    Roles(BTreeSet<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    Rest,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            Segment::Rest
        } else if raw.starts_with(':') {
            Segment::Param
        } else {
            Segment::Literal(raw.to_string())
        }
    }
}

/// A path-prefix pattern and the access it demands. `:name` matches one segment, a
/// trailing `*` matches whatever follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pattern: String,
    segments: Vec<Segment>,
    access: Access,
}

impl RouteRule {
    pub fn new(pattern: &str, access: Access) -> Self {
        let segments = split_path(pattern).into_iter().map(Segment::parse).collect();
        Self { pattern: pattern.to_string(), segments, access }
    }

    pub fn authenticated(pattern: &str) -> Self { Self::new(pattern, Access::Authenticated) }

    pub fn roles<I: IntoIterator<Item = Role>>(pattern: &str, roles: I) -> Self {
        Self::new(pattern, Access::Roles(roles.into_iter().collect()))
    }

    pub fn pattern(&self) -> &str { &self.pattern }

    pub fn access(&self) -> &Access { &self.access }

    fn specificity(&self) -> usize {
        self.segments.iter().filter(|s| !matches!(s, Segment::Rest)).count()
    }

    /// True when the rule's pattern is a segment-wise prefix of `path`.
    pub fn covers(&self, path: &str) -> bool {
        let parts = split_path(path);
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Rest => return true,
                Segment::Literal(l) => {
                    if parts.get(i).map(|p| p.eq_ignore_ascii_case(l)) != Some(true) {
                        return false;
                    }
                }
                Segment::Param => {
                    if parts.get(i).is_none() {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Static rule set. Paths no rule covers are public.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new() -> Self { Self::default() }

    pub fn rule(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RouteRule] { &self.rules }

    /// Rules covering `path`, parent before child. Equal depth keeps declaration order.
    pub fn matching(&self, path: &str) -> Vec<&RouteRule> {
        let mut hits: Vec<&RouteRule> = self.rules.iter().filter(|r| r.covers(path)).collect();
        hits.sort_by_key(|r| r.specificity());
        hits
    }
}

/// Path segments without query string, fragment, or empty pieces.
pub fn split_path(path: &str) -> Vec<&str> {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_noise() {
        assert_eq!(split_path("/app//users/?x=1#top"), vec!["app", "users"]);
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn prefix_and_param_matching() {
        let app = RouteRule::authenticated("/app");
        assert!(app.covers("/app"));
        assert!(app.covers("/app/book-list"));
        assert!(!app.covers("/apple"));
        assert!(!app.covers("/login"));

        let detail = RouteRule::roles("/app/users/:userId", [Role::Admin]);
        assert!(detail.covers("/app/users/42"));
        assert!(detail.covers("/app/users/42/extra"));
        assert!(!detail.covers("/app/users"));

        let rest = RouteRule::authenticated("/app/*");
        assert!(rest.covers("/app"));
        assert!(rest.covers("/app/anything/below"));
    }

    #[test]
    fn matching_orders_parent_first() {
        let table = RouteTable::new()
            .rule(RouteRule::roles("/app/users", [Role::Admin]))
            .rule(RouteRule::authenticated("/app"));
        let hits: Vec<&str> = table.matching("/app/users/7").iter().map(|r| r.pattern()).collect();
        assert_eq!(hits, vec!["/app", "/app/users"]);
        assert!(table.matching("/forgot-password").is_empty());
    }
}
