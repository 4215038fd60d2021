use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{Claims, Role, Session, SessionStore};

use super::rules::{Access, RouteTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No session. The requested path is dropped, not remembered.
    RedirectToLogin { to: String },
    /// Session present but not permitted here; degrade to the lowest-privilege home.
    RedirectToLanding { to: String },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool { matches!(self, GuardDecision::Allow) }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin { to } | GuardDecision::RedirectToLanding { to } => Some(to),
        }
    }
}

/// Pure navigation gate. Nothing is cached; callers pass (or let it read) the current
/// session on every navigation.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    table: RouteTable,
    login_path: String,
    landing_path: String,
}

impl RouteGuard {
    pub fn new(table: RouteTable, login_path: &str, landing_path: &str) -> Self {
        Self { table, login_path: login_path.to_string(), landing_path: landing_path.to_string() }
    }

    pub fn from_config(table: RouteTable, cfg: &ClientConfig) -> Self {
        Self::new(table, &cfg.login_path, &cfg.landing_path)
    }

    pub fn login_path(&self) -> &str { &self.login_path }

    pub fn landing_path(&self) -> &str { &self.landing_path }

    pub fn table(&self) -> &RouteTable { &self.table }

    /// Evaluate every covering rule from outermost to innermost; the first one violated
    /// decides the redirect.
    pub fn decide(&self, path: &str, session: Option<&Session>) -> GuardDecision {
        for rule in self.table.matching(path) {
            let Some(session) = session else {
                return GuardDecision::RedirectToLogin { to: self.login_path.clone() };
            };
            match rule.access() {
                Access::Authenticated => {}
                Access::Roles(allowed) => match session.role() {
                    Some(role) if allowed.contains(&role) => {}
                    _ => return GuardDecision::RedirectToLanding { to: self.landing_path.clone() },
                },
            }
        }
        GuardDecision::Allow
    }

    /// `decide` against a fresh read of the store. An unreadable store counts as logged out.
    pub fn check(&self, path: &str, store: &SessionStore) -> GuardDecision {
        let session = match store.get() {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "routing", error = %e, "session unreadable; treating as logged out");
                None
            }
        };
        self.decide(path, session.as_ref())
    }

    /// Reject rule tables that would bounce between redirects: the login path must be
    /// public and the landing path must admit every role.
    pub fn validate(&self) -> AppResult<()> {
        if !self.decide(&self.login_path, None).is_allowed() {
            return Err(AppError::config("guarded_login", format!("login path {} is guarded", self.login_path)));
        }
        for role in Role::ALL {
            let probe = Session {
                token: String::new(),
                claims: Some(Claims { subject_id: "probe".into(), role }),
            };
            if !self.decide(&self.landing_path, Some(&probe)).is_allowed() {
                return Err(AppError::config(
                    "unreachable_landing",
                    format!("landing path {} denies role {}", self.landing_path, role),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{encode_unsigned, FileStorage};
    use crate::routing::rules::RouteRule;
    use std::sync::Arc;
    use serde_json::json;

    fn guard() -> RouteGuard {
        let table = RouteTable::new()
            .rule(RouteRule::authenticated("/app"))
            .rule(RouteRule::roles("/app/users", [Role::Admin]));
        RouteGuard::new(table, "/login", "/app/book-list")
    }

    fn session(role: &str) -> Session {
        Session::from_token(encode_unsigned(&json!({"user": {"id": "u1", "role": role}})))
    }

    #[test]
    fn decision_table() {
        let g = guard();
        let user = session("user");
        let admin = session("admin");
        let login = GuardDecision::RedirectToLogin { to: "/login".into() };
        let landing = GuardDecision::RedirectToLanding { to: "/app/book-list".into() };

        let cases: Vec<(Option<&Session>, &str, GuardDecision)> = vec![
            (None, "/forgot-password", GuardDecision::Allow),
            (None, "/app/book-list", login.clone()),
            (None, "/app/users", login.clone()),
            (Some(&user), "/forgot-password", GuardDecision::Allow),
            (Some(&user), "/app/book-list", GuardDecision::Allow),
            (Some(&user), "/app/users", landing.clone()),
            (Some(&user), "/app/users/9", landing.clone()),
            (Some(&admin), "/forgot-password", GuardDecision::Allow),
            (Some(&admin), "/app/book-list", GuardDecision::Allow),
            (Some(&admin), "/app/users/9", GuardDecision::Allow),
        ];
        for (s, path, want) in cases {
            assert_eq!(g.decide(path, s), want, "path={} role={:?}", path, s.and_then(|s| s.role()));
        }
    }

    #[test]
    fn undecodable_claims_pass_auth_rules_but_not_role_rules() {
        let g = guard();
        let opaque = Session::from_token("not-a-jwt");
        assert!(g.decide("/app/reservations", Some(&opaque)).is_allowed());
        assert_eq!(g.decide("/app/users", Some(&opaque)).redirect_target(), Some("/app/book-list"));
    }

    #[test]
    fn parent_violation_wins_over_child() {
        let table = RouteTable::new()
            .rule(RouteRule::roles("/app/users", [Role::User]))
            .rule(RouteRule::roles("/app", [Role::Admin]));
        let g = RouteGuard::new(table, "/login", "/home");
        // parent (/app, admin only) is checked first and already denies a user
        assert_eq!(
            g.decide("/app/users", Some(&session("user"))),
            GuardDecision::RedirectToLanding { to: "/home".into() }
        );
    }

    #[test]
    fn check_reads_store_every_time() {
        let g = guard();
        let store = SessionStore::in_memory();
        assert!(!g.check("/app/book-list", &store).is_allowed());
        store.set(&encode_unsigned(&json!({"sub": "u1"}))).unwrap();
        assert!(g.check("/app/book-list", &store).is_allowed());
        store.clear().unwrap();
        assert_eq!(g.check("/app/book-list", &store).redirect_target(), Some("/login"));
    }

    #[test]
    fn unreadable_store_counts_as_logged_out() {
        let tmp = tempfile::tempdir().unwrap();
        let files = FileStorage::for_origin(tmp.path(), "http://localhost:3000");
        std::fs::write(files.path(), b"{ not json").unwrap();
        let store = SessionStore::new(Arc::new(files));
        assert!(store.get().is_err());
        assert_eq!(
            guard().check("/app/book-list", &store),
            GuardDecision::RedirectToLogin { to: "/login".into() }
        );
        assert!(guard().check("/forgot-password", &store).is_allowed());
    }

    #[test]
    fn validate_catches_redirect_loops() {
        assert!(guard().validate().is_ok());
        let bad_landing = RouteGuard::new(guard().table().clone(), "/login", "/app/users");
        assert_eq!(bad_landing.validate().unwrap_err().code_str(), "unreachable_landing");
        let table = RouteTable::new().rule(RouteRule::authenticated("/"));
        let bad_login = RouteGuard::new(table, "/login", "/app");
        assert_eq!(bad_login.validate().unwrap_err().code_str(), "guarded_login");
    }
}
