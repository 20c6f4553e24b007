use log::LevelFilter;

/// Environment variable holding the log filter, e.g. `QUALITY_LOG=debug`.
pub const LOG_ENV: &str = "QUALITY_LOG";

/// Install the global `env_logger`, filtering with `QUALITY_LOG` or, when it
/// is unset, `default_filter`. Returns false if a logger was already set.
pub fn init_logging(default_filter: &str) -> bool {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, default_filter))
        .try_init()
        .is_ok()
}

/// Logger for tests: output is captured by the test harness and repeated
/// calls are harmless.
pub fn init_test_logging() {
    let _ = env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, "warn"))
        .is_test(true)
        .try_init();
}
