use log::LevelFilter;

/// Install the process logger. `RUST_LOG` still wins over `level` when set.
pub fn init(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Logger for tests; safe to call from every test.
pub fn init_for_tests() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
