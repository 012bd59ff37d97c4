mod auth;
mod calendar;
mod db;
mod ipc;

use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; logs go to stderr. Keep the handle alive
    // for the life of the loop.
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?
        .log_to_stderr()
        .start()?;

    let conn = db::open_db()?;
    db::seed_demo(&conn)?;
    log::info!("classhubd {} ready", env!("CARGO_PKG_VERSION"));

    let mut state = ipc::AppState { db: conn };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; answer with a bare error envelope.
                log::warn!("dropping malformed request: {}", e);
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    Ok(())
}
