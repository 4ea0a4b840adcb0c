// src/utils/logging.rs
//! Logging setup for the miner binary
//!
//! Output goes to stdout through `env_logger`. `RUST_LOG` replaces the
//! built-in filters entirely when set.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Transport crates that log every frame or connection at debug level
const QUIET_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "tungstenite",
    "tokio_tungstenite",
];

/// Initializes logging for mining and the one-shot commands
///
/// Defaults to Info for the miner and Warn for the transport stack.
pub fn init_logging() {
    init_with_default(LevelFilter::Info);
}

/// Initializes logging for the benchmark
///
/// Defaults to Debug so per-round throughput lines are visible.
pub fn init_bench_logging() {
    init_with_default(LevelFilter::Debug);
}

fn init_with_default(level: LevelFilter) {
    let mut builder = common_log_config();

    match env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            for (module, module_level) in default_filters(level) {
                builder.filter(module, module_level);
            }
        }
    }

    if let Err(e) = builder.try_init() {
        log::debug!("Logger already initialised: {}", e);
    }
}

/// Filters applied when `RUST_LOG` is unset
///
/// The global level comes first; transport crates are capped at Warn.
fn default_filters(level: LevelFilter) -> Vec<(Option<&'static str>, LevelFilter)> {
    let mut filters = vec![(None, level)];
    filters.extend(
        QUIET_MODULES
            .iter()
            .map(|module| (Some(*module), level.min(LevelFilter::Warn))),
    );
    filters
}

/// Base builder: `[<unix seconds> <level> <module>:<line>] <message>` on stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_crates_are_capped_at_warn() {
        let filters = default_filters(LevelFilter::Debug);
        assert_eq!(filters[0], (None, LevelFilter::Debug));
        assert!(filters.contains(&(Some("tungstenite"), LevelFilter::Warn)));
        assert!(filters.contains(&(Some("reqwest"), LevelFilter::Warn)));
    }

    #[test]
    fn quieter_global_level_is_not_raised() {
        let filters = default_filters(LevelFilter::Error);
        assert!(filters.iter().all(|(_, level)| *level == LevelFilter::Error));
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging();
        init_bench_logging();
        log::info!("still logging");
    }
}
