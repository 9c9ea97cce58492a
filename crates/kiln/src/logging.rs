//! Logger setup.
//!
//! All crates log through the `log` facade; [`init_logging`] installs an
//! `env_logger` backend once per process. `RUST_LOG` overrides the configured
//! level.
//!
//! Every line starts with the level, so failures read
//! `ERROR: update: system ... failed: ...` on stderr. With
//! timestamps on, the time follows the level.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Once;

use serde::{Deserialize, Serialize};

static INIT: Once = Once::new();

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter, in `RUST_LOG` syntax (`info`, `kiln=debug`, ...).
    pub filter: String,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            timestamps: true,
        }
    }
}

/// Install the global logger. Later calls are ignored, as is an already
/// installed logger from elsewhere.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&config.filter);
        builder.parse_default_env();
        let timestamps = config.timestamps;
        builder.format(move |buf, record| {
            if timestamps {
                let now = buf.timestamp();
                let now: &dyn Display = &now;
                write_record(buf, record, Some(now))
            } else {
                write_record(buf, record, None)
            }
        });
        if builder.try_init().is_err() {
            eprintln!("[kiln] a logger is already installed, keeping it");
        }
    });
}

/// `LEVEL: message`, or `LEVEL: timestamp message`.
fn write_record(
    out: &mut impl Write,
    record: &log::Record<'_>,
    timestamp: Option<&dyn Display>,
) -> io::Result<()> {
    match timestamp {
        Some(timestamp) => writeln!(out, "{}: {timestamp} {}", record.level(), record.args()),
        None => writeln!(out, "{}: {}", record.level(), record.args()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig {
            filter: "warn".to_string(),
            timestamps: false,
        };
        init_logging(&config);
        init_logging(&LoggingConfig::default());
        log::warn!("logger installed");
    }

    #[test]
    fn config_fields_default_individually() {
        let config: LoggingConfig = serde_json::from_str(r#"{"filter":"debug"}"#).unwrap();
        assert_eq!(config.filter, "debug");
        assert!(config.timestamps);
    }

    #[test]
    fn error_lines_start_with_error_prefix() {
        let mut out = Vec::new();
        write_record(
            &mut out,
            &log::Record::builder()
                .level(log::Level::Error)
                .target("kiln::app")
                .args(format_args!("update: system `end_frame` failed"))
                .build(),
            None,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ERROR: update: system `end_frame` failed\n"
        );
    }

    #[test]
    fn timestamp_follows_the_level() {
        let stamp: &dyn Display = &"2026-01-01T00:00:00Z";
        let mut out = Vec::new();
        write_record(
            &mut out,
            &log::Record::builder()
                .level(log::Level::Warn)
                .args(format_args!("surface timed out"))
                .build(),
            Some(stamp),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "WARN: 2026-01-01T00:00:00Z surface timed out\n"
        );
    }
}
