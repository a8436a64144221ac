//! roomq: read configuration values from a replicated room.
//!
//! ```text
//! eval "$(roomq -n -e "$ROOM_KEY" 'api-config:api-key,database-url')"
//! ```
//!
//! The result goes to stdout only once it is fully formatted; diagnostics
//! (`-d`) and errors go to stderr. Exit code is 0 on success and 1 on any
//! failure, after teardown has run.

mod commands;
mod parse;

use std::io::Write;
use std::process;

use clap::error::ErrorKind;
use roomq_executor::{Client, Invocation, Result};
use roomq_storage::LocalBackend;
use tracing::Level;
use tracing_subscriber::fmt::time::Uptime;

use commands::build_cli;
use parse::matches_to_invocation;

fn main() {
    // Relative timestamps in debug output count from here.
    let uptime = Uptime::default();

    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    let invocation = match matches_to_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(e) => fail(e),
    };
    init_tracing(uptime, invocation.debug);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => fail(e),
    };

    match runtime.block_on(run(&invocation)) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", output).and_then(|_| stdout.flush()) {
                    fail(e);
                }
            }
        }
        Err(e) => fail(e),
    }
}

async fn run(invocation: &Invocation) -> Result<String> {
    let client = Client::new(LocalBackend::new());
    client.run_until(invocation, interrupted()).await
}

/// Completes on Ctrl-C or, on unix, SIGTERM. A handler that cannot be
/// installed never completes.
async fn interrupted() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_tracing(uptime: Uptime, debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(uptime)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("roomq: {}", error);
    process::exit(1);
}
