use std::env;
use std::io::Write;

const DEFAULT_FILTER: &str = "info";

fn resolve_filter(explicit: Option<String>, rust_log: Option<String>) -> String {
    explicit
        .or(rust_log)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the process-wide logger. Lines go to stderr as
/// `<rfc3339> <LEVEL> <target> <message>`; messages themselves are
/// `key=value` pairs.
pub fn init() {
    let filter = resolve_filter(env::var("ROLLOVER_LOG").ok(), env::var("RUST_LOG").ok());
    let _ = env_logger::Builder::new()
        .parse_filters(&filter)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {} {}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init();
}
