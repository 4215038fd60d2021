//! Terminal front end: command parsing, table output and the interactive loop.

mod command;
pub mod output;
mod repl;
mod shell;

pub use command::{split_args, Command, HELP};
pub use output::{render_fields, render_table};
pub use repl::{parse_args, print_usage, run_repl, CliArgs};
pub use shell::{Flow, Shell};
