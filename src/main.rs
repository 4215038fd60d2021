use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pwlibrary::api::LibraryClient;
use pwlibrary::cli::{parse_args, print_usage, run_repl, Shell};
use pwlibrary::config::ClientConfig;
use pwlibrary::identity::{FileStorage, SessionStore};
use pwlibrary::navigation::{Navigator, StderrNotifier};
use pwlibrary::pipeline::SessionEvents;
use pwlibrary::routing::{library_routes, RouteGuard};

fn main() -> anyhow::Result<()> {
    // Init logging; stderr keeps log lines apart from REPL output
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut argv: Vec<String> = std::env::args().collect();
    let program = if argv.is_empty() { "pwlibrary".to_string() } else { argv.remove(0) };
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.message());
            print_usage(&program);
            std::process::exit(2);
        }
    };
    if args.help {
        print_usage(&program);
        return Ok(());
    }

    let cfg = args.apply(ClientConfig::from_env()?)?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "pwlibrary",
        "pwlibrary starting: RUST_LOG='{}', backend='{}', state_dir='{}'",
        rust_log, cfg.base_url, cfg.state_dir.display()
    );

    let storage = FileStorage::for_origin(&cfg.state_dir, &cfg.origin());
    let store = SessionStore::new(Arc::new(storage));
    let events = SessionEvents::default();
    let client = LibraryClient::connect(&cfg, store.clone(), events)?;
    let guard = RouteGuard::from_config(library_routes(), &cfg);
    let nav = Navigator::new(guard, store.clone(), Arc::new(StderrNotifier))?;
    if store.is_authenticated() {
        // a session persisted from an earlier run resumes on the landing screen
        nav.navigate(&cfg.landing_path);
    }

    let rt = tokio::runtime::Runtime::new()?;
    run_repl(&rt, Shell::new(client, nav))
}
