//! Navigation boundary: where the client currently "is".
//!
//! Two ways to move:
//! - `navigate`: guarded, follows the guard's redirect (declarative redirect-on-render);
//! - `hard_navigate`: unguarded, discards every in-flight screen by bumping the generation.
//!
//! Session teardown arrives as `SessionEvent`s from the pipeline; `spawn_teardown_listener`
//! turns them into a notice plus a hard navigation to login.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::identity::SessionStore;
use crate::pipeline::SessionEvent;
use crate::routing::{canonical_path, GuardDecision, RouteGuard};

/// Blocking user-visible notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("!! {}", message);
    }
}

/// Keeps notices in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> { self.messages.lock().clone() }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Arrived { path: String },
    Redirected { from: String, to: String },
}

impl NavigationOutcome {
    pub fn path(&self) -> &str {
        match self {
            NavigationOutcome::Arrived { path } => path,
            NavigationOutcome::Redirected { to, .. } => to,
        }
    }
}

/// Proof that a screen is still the one on display. Responses that arrive after the
/// location changed must be dropped by the caller.
#[derive(Debug, Clone)]
pub struct ScreenTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl ScreenTicket {
    pub fn is_current(&self) -> bool { self.current.load(Ordering::SeqCst) == self.generation }
}

pub struct Navigator {
    guard: RouteGuard,
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    location: RwLock<String>,
    generation: Arc<AtomicU64>,
    hard_navigations: AtomicU64,
}

impl Navigator {
    pub fn new(guard: RouteGuard, store: SessionStore, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        guard.validate()?;
        let start = guard.login_path().to_string();
        Ok(Self {
            guard,
            store,
            notifier,
            location: RwLock::new(start),
            generation: Arc::new(AtomicU64::new(0)),
            hard_navigations: AtomicU64::new(0),
        })
    }

    pub fn location(&self) -> String { self.location.read().clone() }

    pub fn guard(&self) -> &RouteGuard { &self.guard }

    pub fn hard_navigations(&self) -> u64 { self.hard_navigations.load(Ordering::SeqCst) }

    pub fn ticket(&self) -> ScreenTicket {
        ScreenTicket { generation: self.generation.load(Ordering::SeqCst), current: self.generation.clone() }
    }

    /// Guarded navigation. A redirect is followed once; the requested path is not kept.
    pub fn navigate(&self, path: &str) -> NavigationOutcome {
        let requested = canonical_path(path);
        let outcome = match self.guard.check(&requested, &self.store) {
            GuardDecision::Allow => NavigationOutcome::Arrived { path: requested.clone() },
            denied => {
                let mut to = denied.redirect_target().unwrap_or(self.guard.login_path()).to_string();
                // session may have changed under us; the login path is always reachable
                if !self.guard.check(&to, &self.store).is_allowed() {
                    to = self.guard.login_path().to_string();
                }
                debug!(target: "navigation", from = %requested, to = %to, "guard redirect");
                NavigationOutcome::Redirected { from: requested.clone(), to }
            }
        };
        self.set_location(outcome.path());
        outcome
    }

    /// Unguarded jump that abandons every outstanding screen ticket.
    pub fn hard_navigate(&self, path: &str) {
        let target = canonical_path(path);
        self.hard_navigations.fetch_add(1, Ordering::SeqCst);
        info!(target: "navigation", to = %target, "hard navigation");
        self.set_location(&target);
    }

    pub fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Expired { notice, request_id } => {
                debug!(target: "navigation", %request_id, "session expired event");
                self.notifier.notify(&notice);
                self.hard_navigate(&self.guard.login_path().to_string());
            }
            SessionEvent::SignedOut => self.hard_navigate(&self.guard.login_path().to_string()),
        }
    }

    fn set_location(&self, path: &str) {
        *self.location.write() = path.to_string();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drive `nav` from session events until the channel closes.
pub fn spawn_teardown_listener(nav: Arc<Navigator>, mut rx: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => nav.handle_event(ev),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(target: "navigation", skipped = n, "session events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
