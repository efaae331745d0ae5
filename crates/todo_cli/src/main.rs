//! Store smoke probe.
//!
//! # Responsibility
//! - Resolve the configured store from the environment and open it.
//! - Print the item count so backend wiring can be checked by hand.

use std::process::ExitCode;
use todo_core::config::{LOG_DIR_ENV, LOG_LEVEL_ENV};
use todo_core::{core_version, default_log_level, init_logging, open_store, StoreConfig};

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().into());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(err) => {
            log::error!("event=store_open module=cli status=error error={err}");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let items = store.get_all_items();
    println!("todo_core version={}", core_version());
    println!(
        "store mode={} path={} count={}",
        config.mode.as_str(),
        config.path.display(),
        items.count
    );
    ExitCode::SUCCESS
}
