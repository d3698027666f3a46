use crate::config::AppConfig;
use regex::Regex;
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Applies redaction patterns to every formatted log line.
struct RedactingWriter<W> {
    inner: W,
    patterns: Vec<(Regex, String)>,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let mut redacted = s.to_string();
        for (re, replacement) in &self.patterns {
            redacted = re.replace_all(&redacted, replacement.as_str()).to_string();
        }
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter {
    patterns: Vec<(Regex, String)>,
}

impl<'a> fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            patterns: self.patterns.clone(),
        }
    }
}

/// Most verbose level enabled in the config.
fn configured_level(config: &AppConfig) -> &'static str {
    let levels = &config.logging.levels;
    if levels.debug {
        "debug"
    } else if levels.info {
        "info"
    } else if levels.warning {
        "warn"
    } else if levels.error {
        "error"
    } else {
        "off"
    }
}

fn compile_patterns(config: &AppConfig) -> Vec<(Regex, String)> {
    let redaction = &config.logging.redaction;
    if !redaction.enabled {
        return Vec::new();
    }
    redaction
        .patterns
        .iter()
        .filter_map(|p| match Regex::new(&p.regex) {
            Ok(re) => Some((re, p.placeholder.clone())),
            Err(e) => {
                eprintln!("warning: ignoring redaction pattern {}: {}", p.name, e);
                None
            }
        })
        .collect()
}

/// Logs go to stderr so JSON results on stdout stay machine-readable.
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured_level(config)));

    let format = &config.logging.format;
    let make_writer = RedactingMakeWriter {
        patterns: compile_patterns(config),
    };

    // Layer::boxed() unifies the branch types
    let base = fmt::layer()
        .with_writer(make_writer)
        .with_target(format.show_target)
        .with_line_number(format.show_line)
        .with_thread_ids(false);
    let fmt_layer = match (format.json, format.show_time) {
        (true, _) => base.json().boxed(),
        (false, true) => base.boxed(),
        (false, false) => base.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionPattern;
    use std::io::Write;

    #[test]
    fn test_redacting_writer_replaces_matches() {
        let mut w = RedactingWriter {
            inner: Vec::new(),
            patterns: vec![(Regex::new(r"/Users/[^/\s]+").unwrap(), "/Users/<user>".into())],
        };
        let line = b"osascript failed reading /Users/alice/Music/song.m4a\n";
        assert_eq!(w.write(line).unwrap(), line.len());
        assert_eq!(
            String::from_utf8(w.inner).unwrap(),
            "osascript failed reading /Users/<user>/Music/song.m4a\n"
        );
    }

    #[test]
    fn test_configured_level_picks_most_verbose() {
        let mut cfg = AppConfig::default();
        assert_eq!(configured_level(&cfg), "warn");
        cfg.logging.levels.info = true;
        assert_eq!(configured_level(&cfg), "info");
        cfg.logging.levels = crate::config::LoggingLevelsConfig {
            debug: false,
            info: false,
            warning: false,
            error: false,
        };
        assert_eq!(configured_level(&cfg), "off");
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let mut cfg = AppConfig::default();
        cfg.logging.redaction.patterns = vec![
            RedactionPattern {
                name: "broken".into(),
                regex: "(".into(),
                placeholder: "x".into(),
            },
            RedactionPattern {
                name: "email".into(),
                regex: r"[\w.]+@[\w.]+".into(),
                placeholder: "<email>".into(),
            },
        ];
        assert_eq!(compile_patterns(&cfg).len(), 1);
        cfg.logging.redaction.enabled = false;
        assert!(compile_patterns(&cfg).is_empty());
    }
}
