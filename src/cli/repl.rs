use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::pipeline::Transport;

use super::shell::{Flow, Shell};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub base_url: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub help: bool,
}

impl CliArgs {
    pub fn apply(&self, mut cfg: ClientConfig) -> AppResult<ClientConfig> {
        if let Some(u) = &self.base_url {
            cfg = cfg.with_base_url(u)?;
        }
        if let Some(d) = &self.state_dir {
            cfg = cfg.with_state_dir(d.clone());
        }
        Ok(cfg)
    }
}

pub fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--base-url <url>] [--state-dir <dir>]\n\nFlags:\n  --base-url <url>    Backend origin (env PWLIB_BASE_URL, default http://localhost:3000)\n  --state-dir <dir>   Where the session is kept (env PWLIB_STATE_DIR, default ~/.pwlibrary)\n  -h, --help          Show this help\n\nType 'help' at the prompt for commands."
    );
}

/// Flags after the program name.
pub fn parse_args(args: &[String]) -> AppResult<CliArgs> {
    let mut out = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--base-url" | "--state-dir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(AppError::user("bad_arguments", format!("{} requires a value", args[i])));
                };
                if args[i] == "--base-url" {
                    out.base_url = Some(v.clone());
                } else {
                    out.state_dir = Some(PathBuf::from(v));
                }
                i += 2;
            }
            "-h" | "--help" => {
                out.help = true;
                i += 1;
            }
            other => return Err(AppError::user("bad_arguments", format!("unknown argument: {}", other))),
        }
    }
    Ok(out)
}

/// Interactive loop. Each line runs to completion on `rt` before the next prompt.
pub fn run_repl<T: Transport>(rt: &tokio::runtime::Runtime, mut shell: Shell<T>) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("pwlibrary interpreter. Type 'help' for commands.");
    loop {
        match rl.readline(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match rt.block_on(shell.run_line(&line)) {
                    Flow::Quit => break,
                    Flow::Continue(out) if out.is_empty() => {}
                    Flow::Continue(out) => println!("{}", out),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use 'quit' to exit");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    info!(target: "cli", "bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn parses_flags() {
        let a = parse_args(&args(&["--base-url", "https://lib.example", "--state-dir", "/tmp/pw"])).unwrap();
        assert_eq!(a.base_url.as_deref(), Some("https://lib.example"));
        assert_eq!(a.state_dir, Some(PathBuf::from("/tmp/pw")));
        assert!(parse_args(&args(&["-h"])).unwrap().help);
        assert!(parse_args(&args(&["--base-url"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cfg = ClientConfig::new("http://localhost:3000", PathBuf::from("/a")).unwrap();
        let a = parse_args(&args(&["--base-url", "http://10.0.0.2:8080/"])).unwrap();
        let cfg = a.apply(cfg).unwrap();
        assert_eq!(cfg.origin(), "http://10.0.0.2:8080");
        assert_eq!(cfg.state_dir, PathBuf::from("/a"));
        let bad = parse_args(&args(&["--base-url", "ftp://x"])).unwrap();
        assert!(bad.apply(cfg).is_err());
    }
}
