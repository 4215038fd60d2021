//! Role-gated routing: which screens a session may reach.

mod guard;
mod routes;
mod rules;

pub use guard::{GuardDecision, RouteGuard};
pub use routes::{canonical_path, library_routes, Screen};
pub use rules::{split_path, Access, RouteRule, RouteTable};
