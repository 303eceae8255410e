//! `rollcall`: line-oriented JSON front end for the attendance core.
//!
//! Reads one request per stdin line and writes one reply per stdout line.
//! Configuration comes from `ROLLCALL_*` environment variables.
//!
//! A fresh database has no accounts. Send `account.bootstrap` first to create
//! the initial admin, then provision staff, students and the catalog with
//! that admin as `actorId`.

use log::{error, info};
use rollcall_api::{handle_line, ApiConfig};
use rollcall_core::db::open_db;
use rollcall_core::init_logging;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = ApiConfig::from_env();

    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("rollcall: logging disabled: {err}");
        }
    }

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_start module=cli status=error error_code=db_open_failed");
            eprintln!(
                "rollcall: cannot open database `{}`: {err}",
                config.db_path.display()
            );
            return ExitCode::FAILURE;
        }
    };
    info!("event=cli_start module=cli status=ok");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("event=stdin_read module=cli status=error error={err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&conn, &line);
        if writeln!(stdout, "{reply}").and_then(|()| stdout.flush()).is_err() {
            break;
        }
    }

    info!("event=cli_stop module=cli status=ok");
    ExitCode::SUCCESS
}
