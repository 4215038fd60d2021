//! The library application's screens and their access rules.

use once_cell::sync::Lazy;

use crate::config::{LANDING_PATH, LOGIN_PATH};
use crate::identity::Role;

use super::rules::{split_path, RouteRule, RouteTable};

static LIBRARY_ROUTES: Lazy<RouteTable> = Lazy::new(|| {
    RouteTable::new()
        .rule(RouteRule::authenticated("/app"))
        .rule(RouteRule::roles("/app/users", [Role::Admin]))
});

/// `/app` needs any session; `/app/users` and below are admin only; the rest is public.
pub fn library_routes() -> RouteTable { LIBRARY_ROUTES.clone() }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    ForgotPassword,
    ChangePassword { reset_token: String },
    BookList,
    Reservations,
    ReservationsHistory,
    BookDetails { book_id: String },
    Users,
    UserDetail { user_id: String },
}

impl Screen {
    /// Map a location to its screen. `/` and bare `/app` are aliases handled by
    /// `canonical_path`; unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Screen> {
        let canonical = canonical_path(path);
        let parts = split_path(&canonical);
        let screen = match parts.as_slice() {
            ["login"] => Screen::Login,
            ["forgot-password"] => Screen::ForgotPassword,
            ["change-password", token] => Screen::ChangePassword { reset_token: decode(token) },
            ["app", "book-list"] => Screen::BookList,
            ["app", "reservations"] => Screen::Reservations,
            ["app", "reservations-history"] => Screen::ReservationsHistory,
            ["app", "book", id] => Screen::BookDetails { book_id: decode(id) },
            ["app", "users"] => Screen::Users,
            ["app", "users", id] => Screen::UserDetail { user_id: decode(id) },
            _ => return None,
        };
        Some(screen)
    }

    pub fn path(&self) -> String {
        match self {
            Screen::Login => LOGIN_PATH.to_string(),
            Screen::ForgotPassword => "/forgot-password".to_string(),
            Screen::ChangePassword { reset_token } => format!("/change-password/{}", urlencoding::encode(reset_token)),
            Screen::BookList => LANDING_PATH.to_string(),
            Screen::Reservations => "/app/reservations".to_string(),
            Screen::ReservationsHistory => "/app/reservations-history".to_string(),
            Screen::BookDetails { book_id } => format!("/app/book/{}", urlencoding::encode(book_id)),
            Screen::Users => "/app/users".to_string(),
            Screen::UserDetail { user_id } => format!("/app/users/{}", urlencoding::encode(user_id)),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::ForgotPassword => "Forgot Password",
            Screen::ChangePassword { .. } => "Change Password",
            Screen::BookList => "Books",
            Screen::Reservations => "Reservations",
            Screen::ReservationsHistory => "Reservation History",
            Screen::BookDetails { .. } => "Book Details",
            Screen::Users => "Users",
            Screen::UserDetail { .. } => "User Details",
        }
    }
}

/// Resolve route aliases: `/` goes to login, `/app` to the landing screen.
pub fn canonical_path(path: &str) -> String {
    let parts = split_path(path);
    match parts.as_slice() {
        [] => LOGIN_PATH.to_string(),
        ["app"] => LANDING_PATH.to_string(),
        _ => format!("/{}", parts.join("/")),
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment).map(|s| s.into_owned()).unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::guard::RouteGuard;

    #[test]
    fn parses_every_screen() {
        assert_eq!(Screen::parse("/login"), Some(Screen::Login));
        assert_eq!(Screen::parse("/"), Some(Screen::Login));
        assert_eq!(Screen::parse("/app"), Some(Screen::BookList));
        assert_eq!(Screen::parse("/change-password/abc"), Some(Screen::ChangePassword { reset_token: "abc".into() }));
        assert_eq!(Screen::parse("/app/book/66a1"), Some(Screen::BookDetails { book_id: "66a1".into() }));
        assert_eq!(Screen::parse("/app/users/u%201"), Some(Screen::UserDetail { user_id: "u 1".into() }));
        assert_eq!(Screen::parse("/app/reservations-history/"), Some(Screen::ReservationsHistory));
        assert_eq!(Screen::parse("/nowhere"), None);
    }

    #[test]
    fn path_roundtrips_through_parse() {
        let screens = [
            Screen::Login,
            Screen::ForgotPassword,
            Screen::BookList,
            Screen::Reservations,
            Screen::Users,
            Screen::UserDetail { user_id: "a/b".into() },
        ];
        for s in screens {
            assert_eq!(Screen::parse(&s.path()), Some(s.clone()), "{}", s.path());
        }
    }

    #[test]
    fn library_table_is_loop_free() {
        let g = RouteGuard::new(library_routes(), LOGIN_PATH, LANDING_PATH);
        g.validate().unwrap();
        assert!(g.decide("/change-password/tok", None).is_allowed());
        assert!(!g.decide("/app/book/1", None).is_allowed());
    }
}
