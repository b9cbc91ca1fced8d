//! Tracing initialization for the server binary.
//!
//! # Environment Variables
//!
//! - `PARLEY_LOG`: tracing filter directive (default: `info`)
//! - `PARLEY_JSON_LOGS`: emit JSON log lines when set to `1` or `true`

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter =
        EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PARLEY_JSON_LOGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
