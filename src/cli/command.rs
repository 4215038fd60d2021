//! Parsing of REPL input lines into typed commands.

use crate::api::{NewBook, DEFAULT_PAGE_SIZE};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Where,
    Whoami,
    Go(String),
    Login { email: String, password: String },
    Register { email: String, password: String },
    Logout,
    Forgot { email: String },
    Reset { token: String, password: String },
    /// `page` is zero-based here; users type one-based page numbers.
    Books { search: String, page: u32, limit: u32 },
    Book(String),
    CreateBook(NewBook),
    Reserve(String),
    Reservations,
    Cancel(String),
    History,
    Users,
    User(String),
    Block { user_id: String, blocked: bool },
    Alert(String),
}

pub const HELP: &str = "\
Commands:
  login <email> <password>        sign in and open the book list
  register <email> <password>     create an account
  logout                          drop the local session
  whoami                          show the signed-in user
  forgot <email>                  request a password reset email
  reset <token> <password>        set a new password with a reset token
  go <path>                       open a screen by path (e.g. /app/reservations)
  where                           show the current screen
  books [--search S] [--page N] [--limit N]
  book <id>                       book details
  create-book <title> <author> <category> <copies> [description]
  reserve <bookId>
  reservations                    active reservations
  cancel <reservationId>
  history                         returned reservations
  users                           (admin) all users
  user <id>                       (admin) user details and reservations
  block <id> | unblock <id>       (admin)
  alert <reservationId>           (admin) email a return reminder
  help | quit

Arguments containing spaces can be double-quoted.";

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> AppResult<Option<Command>> {
        let args = split_args(line)?;
        let Some((head, rest)) = args.split_first() else {
            return Ok(None);
        };
        let cmd = match (head.to_ascii_lowercase().as_str(), rest) {
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            ("where", []) => Command::Where,
            ("whoami", []) => Command::Whoami,
            ("logout", []) => Command::Logout,
            ("go", [path]) => Command::Go(path.clone()),
            ("login", [email, password]) => Command::Login { email: email.clone(), password: password.clone() },
            ("register", [email, password]) => Command::Register { email: email.clone(), password: password.clone() },
            ("forgot", [email]) => Command::Forgot { email: email.clone() },
            ("reset", [token, password]) => Command::Reset { token: token.clone(), password: password.clone() },
            ("books", flags) => parse_books(flags)?,
            ("book", [id]) => Command::Book(id.clone()),
            ("create-book", [title, author, category, copies, description @ ..]) if description.len() <= 1 => {
                Command::CreateBook(NewBook {
                    title: title.clone(),
                    author: author.clone(),
                    category: category.clone(),
                    description: description.first().cloned().unwrap_or_default(),
                    total_copies: parse_number("copies", copies)?,
                })
            }
            ("reserve", [id]) => Command::Reserve(id.clone()),
            ("reservations", []) => Command::Reservations,
            ("cancel", [id]) => Command::Cancel(id.clone()),
            ("history", []) => Command::History,
            ("users", []) => Command::Users,
            ("user", [id]) => Command::User(id.clone()),
            ("block", [id]) => Command::Block { user_id: id.clone(), blocked: true },
            ("unblock", [id]) => Command::Block { user_id: id.clone(), blocked: false },
            ("alert", [id]) => Command::Alert(id.clone()),
            (other, _) if is_known(other) => {
                return Err(AppError::user("bad_arguments", format!("wrong arguments for '{}'; type 'help'", other)))
            }
            (other, _) => return Err(AppError::user("unknown_command", format!("unknown command '{}'; type 'help'", other))),
        };
        Ok(Some(cmd))
    }
}

fn is_known(name: &str) -> bool {
    const NAMES: [&str; 20] = [
        "where", "whoami", "logout", "go", "login", "register", "forgot", "reset", "books", "book", "create-book",
        "reserve", "reservations", "cancel", "history", "users", "user", "block", "unblock", "alert",
    ];
    NAMES.contains(&name)
}

fn parse_books(flags: &[String]) -> AppResult<Command> {
    let mut search = String::new();
    let mut page = 1u32;
    let mut limit = DEFAULT_PAGE_SIZE;
    let mut it = flags.iter();
    while let Some(flag) = it.next() {
        let mut value = || {
            it.next().ok_or_else(|| AppError::user("bad_arguments", format!("{} requires a value", flag)))
        };
        match flag.as_str() {
            "--search" | "-s" => search = value()?.clone(),
            "--page" | "-p" => page = parse_number("page", value()?)?,
            "--limit" | "-l" => limit = parse_number("limit", value()?)?,
            other => return Err(AppError::user("bad_arguments", format!("unknown flag for books: {}", other))),
        }
    }
    if page == 0 || limit == 0 {
        return Err(AppError::user("bad_arguments", "page and limit start at 1"));
    }
    Ok(Command::Books { search, page: page - 1, limit })
}

fn parse_number(what: &str, raw: &str) -> AppResult<u32> {
    raw.parse().map_err(|_| AppError::user("bad_arguments", format!("{} must be a whole number, got '{}'", what, raw)))
}

/// Whitespace-separated words; double quotes group words and `\"` escapes a quote.
pub fn split_args(line: &str) -> AppResult<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.trim().chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => match chars.next() {
                Some(n) => cur.push(n),
                None => cur.push('\\'),
            },
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    out.push(std::mem::take(&mut cur));
                    in_word = false;
                }
            }
            c => {
                cur.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(AppError::user("bad_arguments", "unterminated quote"));
    }
    if in_word {
        out.push(cur);
    }
    Ok(out)
}
