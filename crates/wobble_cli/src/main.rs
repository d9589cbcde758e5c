//! CLI smoke entry point.
//!
//! # Responsibility
//! - Start file logging under `./logs`.
//! - Bring up storage for the environment named by `APP_ENV`.
//! - Print the resolved location and the migration ledger.

use std::process::ExitCode;
use wobble_core::db::migrations::MigrationLedger;
use wobble_core::{core_version, default_log_level, init_logging, initialize, AppEnv, DbConfig};

const LOG_DIR_NAME: &str = "logs";

fn main() -> ExitCode {
    match std::env::current_dir() {
        Ok(cwd) => {
            if let Err(err) = init_logging(default_log_level(), cwd.join(LOG_DIR_NAME)) {
                eprintln!("logging disabled: {err}");
            }
        }
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    let env = AppEnv::from_env();
    let config = DbConfig::for_env(env);
    println!("wobble_core version={}", core_version());
    println!("env={} location={}", env.as_str(), config.location());

    let db = match initialize(&config) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("storage init failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match MigrationLedger::new(db.connection()).entries() {
        Ok(entries) => {
            for entry in entries {
                println!(
                    "migration id={} file={} applied_at={}",
                    entry.id, entry.filename, entry.applied_at
                );
            }
        }
        Err(err) => {
            eprintln!("failed to read migration ledger: {err}");
            return ExitCode::FAILURE;
        }
    }

    if let Err(err) = db.close() {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
