//! C6 — Configuration Loader.
//!
//! Reads a directive file into a [`Config`], and implements the reload
//! sequence from §4.6: rebuild from `defaults`, re-parse, validate.

use std::fs;
use std::path::Path;

use crate::core::config::builder::ConfigBuilder;
use crate::core::config::grammar::apply_line;
use crate::core::config::record::Config;
use crate::error::{ProxyError, Result};
use crate::logging::Level;

/// Parses `path` starting from `defaults`. A syntax error anywhere aborts
/// the whole load and reports the offending line number (§4.6 Parser
/// contract).
pub fn load_from_path(path: &Path, defaults: &Config) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    let mut builder = ConfigBuilder::from_defaults(defaults);

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim_start();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        apply_line(&mut builder, line_no, trimmed)?;
    }

    builder.finish()
}

/// Implements §4.6 reload: tear down is implicit (the old `Config` is
/// simply dropped by the caller once the swap completes), rebuild from
/// `defaults`, re-parse, validate. On failure the caller must retain the
/// previous configuration unchanged — this function never mutates its
/// inputs, so that's automatic.
pub fn reload(path: &Path, defaults: &Config) -> Result<Config> {
    crate::log!(Level::Info, path = %path.display(), "reloading config file");
    load_from_path(path, defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_valid_config() {
        let file = write_temp("port 8888\nuser \"nobody\"\n");
        let cfg = load_from_path(file.path(), &Config::default()).unwrap();
        assert_eq!(cfg.port, 8888);
        assert_eq!(cfg.user.as_deref(), Some("nobody"));
    }

    #[test]
    fn s6_port_zero_is_rejected_and_previous_config_unaffected() {
        let previous = load_from_path(
            &{
                let f = write_temp("port 8080\nallow 127.0.0.1\n");
                f.path().to_path_buf()
            },
            &Config::default(),
        )
        .unwrap();

        let bad = write_temp("port 0\n");
        let result = load_from_path(bad.path(), &Config::default());
        assert!(result.is_err());
        // previous config, held by the caller, is untouched by the failed load
        assert_eq!(previous.port, 8080);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let file = write_temp("# a comment\n\n   \nport 80\n");
        let cfg = load_from_path(file.path(), &Config::default()).unwrap();
        assert_eq!(cfg.port, 80);
    }

    #[test]
    fn syntax_error_reports_line_number() {
        let file = write_temp("port 80\nbogus line here\n");
        match load_from_path(file.path(), &Config::default()) {
            Err(ProxyError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn reload_rebuilds_collections_from_scratch() {
        let file1 = write_temp("port 80\nallow 10.0.0.0/8\n");
        let first = load_from_path(file1.path(), &Config::default()).unwrap();
        assert!(!first.acl.is_empty());

        let file2 = write_temp("port 80\n");
        let second = reload(file2.path(), &Config::default()).unwrap();
        assert!(second.acl.is_empty());
    }

    #[test]
    fn timeout_zero_is_clamped_with_default_nonzero() {
        let file = write_temp("port 80\ntimeout 0\n");
        let cfg = load_from_path(file.path(), &Config::default()).unwrap();
        assert_eq!(cfg.idle_timeout, crate::core::config::record::MAX_IDLE_TIME);
    }
}
