//! Command execution for the REPL. Every screen command enters its screen through the
//! navigator first; a redirect means the backend is never called.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use crate::api::{days_left, page_count, Book, LibraryClient, Reservation, UserRecord};
use crate::error::{AppResult, GENERIC_MESSAGE};
use crate::navigation::{NavigationOutcome, Navigator, ScreenTicket};
use crate::pipeline::{SessionEvent, Transport};
use crate::routing::Screen;

use super::command::{Command, HELP};
use super::output::{render_fields, render_table, terminal_width};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

struct Reply {
    text: String,
    ticket: Option<ScreenTicket>,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self { Self { text: text.into(), ticket: None } }

    fn on(ticket: ScreenTicket, text: impl Into<String>) -> Self { Self { text: text.into(), ticket: Some(ticket) } }
}

pub struct Shell<T: Transport> {
    client: LibraryClient<T>,
    nav: Navigator,
    events: broadcast::Receiver<SessionEvent>,
    width: usize,
}

impl<T: Transport> Shell<T> {
    pub fn new(client: LibraryClient<T>, nav: Navigator) -> Self {
        let events = client.events().subscribe();
        Self { client, nav, events, width: terminal_width() }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn client(&self) -> &LibraryClient<T> { &self.client }

    pub fn navigator(&self) -> &Navigator { &self.nav }

    pub fn prompt(&self) -> String {
        let who = match self.client.store().get() {
            Ok(Some(s)) => s.role().map(|r| r.as_str()).unwrap_or("?").to_string(),
            _ => "guest".to_string(),
        };
        format!("{} {}> ", who, self.nav.location())
    }

    /// Run one input line. Session events raised while it ran are applied before the
    /// output is returned, and output for a screen that is no longer current is dropped.
    pub async fn run_line(&mut self, line: &str) -> Flow {
        let cmd = match Command::parse(line) {
            Ok(Some(Command::Quit)) => return Flow::Quit,
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Flow::Continue(String::new()),
            Err(e) => return Flow::Continue(e.user_message(GENERIC_MESSAGE).to_string()),
        };
        let result = self.exec(cmd).await;
        self.drain_events();
        match result {
            Ok(Reply { ticket: Some(t), .. }) if !t.is_current() => {
                debug!(target: "cli", location = %self.nav.location(), "dropping output for a screen no longer shown");
                Flow::Continue(String::new())
            }
            Ok(reply) => Flow::Continue(reply.text),
            // the navigator already showed the expiry notice
            Err(e) if e.is_session_expired() => Flow::Continue(String::new()),
            Err(e) => Flow::Continue(format!("error: {}", e.user_message(GENERIC_MESSAGE))),
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(ev) => self.nav.handle_event(ev),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn enter(&self, screen: &Screen) -> Result<ScreenTicket, Reply> {
        match self.nav.navigate(&screen.path()) {
            NavigationOutcome::Arrived { .. } => Ok(self.nav.ticket()),
            NavigationOutcome::Redirected { from, to } => {
                Err(Reply::plain(format!("{} is not available; redirected to {}", from, to)))
            }
        }
    }

    async fn exec(&self, cmd: Command) -> AppResult<Reply> {
        macro_rules! enter {
            ($screen:expr) => {
                match self.enter(&$screen) {
                    Ok(t) => t,
                    Err(reply) => return Ok(reply),
                }
            };
        }

        match cmd {
            Command::Help => Ok(Reply::plain(HELP)),
            Command::Quit => Ok(Reply::plain("")),
            Command::Where => {
                let loc = self.nav.location();
                let title = Screen::parse(&loc).map(|s| s.title()).unwrap_or("?");
                Ok(Reply::plain(format!("{} ({})", loc, title)))
            }
            Command::Whoami => Ok(Reply::plain(match self.client.store().get()? {
                Some(s) => render_fields(&[
                    ("User", s.subject_id().unwrap_or("(unknown)").to_string()),
                    ("Role", s.role().map(|r| r.to_string()).unwrap_or_else(|| "(unknown)".into())),
                ]),
                None => "not logged in".to_string(),
            })),
            Command::Go(path) => Ok(Reply::plain(match self.nav.navigate(&path) {
                NavigationOutcome::Arrived { path } => format!("at {}", path),
                NavigationOutcome::Redirected { from, to } => format!("{} is not available; redirected to {}", from, to),
            })),
            Command::Login { email, password } => {
                enter!(Screen::Login);
                let session = self.client.login(&email, &password).await?;
                let landed = self.nav.navigate(&Screen::BookList.path());
                Ok(Reply::plain(format!(
                    "logged in as {} ({}); now at {}",
                    session.subject_id().unwrap_or("?"),
                    session.role().map(|r| r.as_str()).unwrap_or("?"),
                    landed.path()
                )))
            }
            Command::Register { email, password } => {
                enter!(Screen::Login);
                Ok(Reply::plain(self.client.register(&email, &password).await?))
            }
            Command::Logout => {
                self.client.logout()?;
                Ok(Reply::plain("logged out"))
            }
            Command::Forgot { email } => {
                let t = enter!(Screen::ForgotPassword);
                Ok(Reply::on(t, self.client.forgot_password(&email).await?))
            }
            Command::Reset { token, password } => {
                enter!(Screen::ChangePassword { reset_token: token.clone() });
                let msg = self.client.reset_password(&token, &password).await?;
                self.nav.navigate(&Screen::Login.path());
                Ok(Reply::plain(msg))
            }
            Command::Books { search, page, limit } => {
                let t = enter!(Screen::BookList);
                let result = self.client.list_books(&search, page, limit).await?;
                let rows: Vec<Vec<String>> = result.books.iter().map(book_row).collect();
                let text = format!(
                    "{}\npage {} of {} ({} books)",
                    render_table(&["id", "title", "author", "category", "available"], &rows, self.width),
                    page + 1,
                    page_count(result.total_items, limit).max(1),
                    result.total_items
                );
                Ok(Reply::on(t, text))
            }
            Command::Book(id) => {
                let t = enter!(Screen::BookDetails { book_id: id.clone() });
                let book = self.client.get_book(&id).await?;
                Ok(Reply::on(t, book_details(&book)))
            }
            Command::CreateBook(book) => {
                let t = enter!(Screen::BookList);
                Ok(Reply::on(t, self.client.create_book(&book).await?))
            }
            Command::Reserve(book_id) => {
                let t = enter!(Screen::BookList);
                Ok(Reply::on(t, self.client.reserve(&book_id).await?))
            }
            Command::Reservations => {
                let t = enter!(Screen::Reservations);
                let list = self.client.my_reservations().await?;
                Ok(Reply::on(t, reservations_table(&list, Utc::now(), self.width)))
            }
            Command::Cancel(id) => {
                let t = enter!(Screen::Reservations);
                self.client.cancel_reservation(&id).await?;
                Ok(Reply::on(t, format!("reservation {} cancelled", id)))
            }
            Command::History => {
                let t = enter!(Screen::ReservationsHistory);
                let list = self.client.reservation_history().await?;
                Ok(Reply::on(t, reservations_table(&list, Utc::now(), self.width)))
            }
            Command::Users => {
                let t = enter!(Screen::Users);
                let users = self.client.list_users().await?;
                let rows: Vec<Vec<String>> = users.iter().map(user_row).collect();
                Ok(Reply::on(t, render_table(&["id", "email", "role", "verified", "blocked"], &rows, self.width)))
            }
            Command::User(id) => {
                let t = enter!(Screen::UserDetail { user_id: id.clone() });
                let o = self.client.user_overview(&id).await?;
                let text = format!(
                    "{}\n\n{}",
                    render_fields(&[
                        ("Email", o.user.email.clone()),
                        ("Role", o.user.role.clone()),
                        ("Verified", yes_no(o.user.verified)),
                        ("Blocked", yes_no(o.user.is_blocked)),
                    ]),
                    reservations_table(&o.reservations, Utc::now(), self.width)
                );
                Ok(Reply::on(t, text))
            }
            Command::Block { user_id, blocked } => {
                let t = enter!(Screen::Users);
                Ok(Reply::on(t, self.client.set_blocked(&user_id, blocked).await?))
            }
            Command::Alert(reservation_id) => {
                let t = enter!(Screen::Users);
                Ok(Reply::on(t, self.client.send_return_alert(&reservation_id).await?))
            }
        }
    }
}

fn yes_no(b: bool) -> String { (if b { "yes" } else { "no" }).to_string() }

fn day(d: Option<DateTime<Utc>>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string())
}

fn book_row(b: &Book) -> Vec<String> {
    vec![b.id.clone(), b.title.clone(), b.author.clone(), b.category.clone(), b.available_copies.to_string()]
}

fn book_details(b: &Book) -> String {
    render_fields(&[
        ("Title", b.title.clone()),
        ("Author", b.author.clone()),
        ("Category", b.category.clone()),
        ("Description", b.description.clone().unwrap_or_default()),
        ("Available", if b.is_available() { format!("yes ({})", b.available_copies) } else { "no".to_string() }),
    ])
}

fn user_row(u: &UserRecord) -> Vec<String> {
    vec![u.id.clone(), u.email.clone(), u.role.clone(), yes_no(u.verified), yes_no(u.is_blocked)]
}

fn reservations_table(list: &[Reservation], now: DateTime<Utc>, width: usize) -> String {
    let rows: Vec<Vec<String>> = list
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.book_title.clone().unwrap_or_else(|| "-".into()),
                format!("{:?}", r.status).to_lowercase(),
                day(r.reservation_date),
                day(r.return_by_date),
                r.return_by_date.map(|d| days_left(d, now).to_string()).unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    render_table(&["id", "book", "status", "reserved", "return by", "days left"], &rows, width)
}
