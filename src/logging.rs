//! Logger initialization driven by the `LOGLEVEL` environment variable
//! (spec §6), rather than `env_logger`'s usual `RUST_LOG`.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global logger exactly once. Safe to call from multiple
/// entry points (library consumers and tests) since repeated calls are
/// no-ops after the first.
pub fn init() {
    INIT.call_once(|| {
        let level = std::env::var("LOGLEVEL").unwrap_or_else(|_| "INFO".to_string());
        let filter = map_level(&level);
        env_logger::Builder::new().filter_level(filter).init();
    });
}

fn map_level(level: &str) -> log::LevelFilter {
    match level.to_uppercase().as_str() {
        "PANIC" | "FATAL" | "ERROR" => log::LevelFilter::Error,
        "WARN" => log::LevelFilter::Warn,
        "INFO" => log::LevelFilter::Info,
        "DEBUG" => log::LevelFilter::Debug,
        "TRACE" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}
