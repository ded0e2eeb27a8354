//! C6 — directive grammar.
//!
//! A hand-written lexer and pattern-match dispatch table, in place of the
//! original's precompiled-regex table (§9: "a hand-written lexer or a
//! pattern-match table is equally valid"). Argument-class parsing
//! (`STR`/`BOOL`/`INT`/`ALNUM`/`IP`/`IPV6`/`IPMASK`/`IPV6MASK`) lives here so
//! every directive handler enforces the same constraints uniformly.

use crate::core::acl::Access;
use crate::core::config::builder::ConfigBuilder;
use crate::error::{ProxyError, Result};
use crate::logging::Level;

const MAX_LINE_LEN: usize = 1023;

fn syntax(line_no: u32, text: impl Into<String>) -> ProxyError {
    ProxyError::Syntax { line: line_no, text: text.into() }
}

/// Splits `line` into its directive name and the raw remainder, at the
/// first run of whitespace.
fn split_name(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Consumes one `STR` argument: a double-quoted string with no escapes.
fn take_str<'a>(rest: &'a str, line_no: u32) -> Result<(String, &'a str)> {
    let rest = rest.trim_start();
    let mut chars = rest.char_indices();
    match chars.next() {
        Some((0, '"')) => {}
        _ => return Err(syntax(line_no, "expected a quoted string argument")),
    }
    let body_start = 1;
    let end = rest[body_start..]
        .find('"')
        .ok_or_else(|| syntax(line_no, "unterminated quoted string"))?;
    if end == 0 {
        return Err(syntax(line_no, "quoted string argument must not be empty"));
    }
    let value = rest[body_start..body_start + end].to_string();
    let remainder = rest[body_start + end + 1..].trim_start();
    Ok((value, remainder))
}

/// Consumes one bareword token, up to the next whitespace or end of line.
fn take_word(rest: &str) -> (&str, &str) {
    let rest = rest.trim_start();
    match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
        None => (rest, ""),
    }
}

/// `BOOL` — must be one of `yes`/`on`/`no`/`off` (case-insensitive); the
/// boolean value then follows the first/second-character rule the source
/// uses: a leading `y` or a second character `n` is true, anything else
/// false.
fn parse_bool(word: &str, line_no: u32) -> Result<bool> {
    let lower = word.to_ascii_lowercase();
    if !matches!(lower.as_str(), "yes" | "on" | "no" | "off") {
        return Err(syntax(line_no, format!("invalid boolean value: {word}")));
    }
    let bytes = lower.as_bytes();
    let first_y = bytes.first() == Some(&b'y');
    let second_n = bytes.get(1) == Some(&b'n');
    Ok(first_y || second_n)
}

/// `INT` — decimal or `0x`-prefixed hexadecimal unsigned integer.
fn parse_int(word: &str, line_no: u32) -> Result<u64> {
    let parsed = if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        word.parse::<u64>()
    };
    parsed.map_err(|_| syntax(line_no, format!("invalid integer: {word}")))
}

/// `ALNUM` — `[-a-zA-Z0-9._]+`.
fn parse_alnum(word: &str, line_no: u32) -> Result<String> {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || "-._".contains(c)) {
        Ok(word.to_string())
    } else {
        Err(syntax(line_no, format!("invalid identifier: {word}")))
    }
}

fn parse_ip_word(word: &str, line_no: u32) -> Result<()> {
    word.parse::<std::net::Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| syntax(line_no, format!("invalid IPv4 address: {word}")))
}

fn parse_ipv6_word(word: &str, line_no: u32) -> Result<()> {
    word.parse::<std::net::Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| syntax(line_no, format!("invalid IPv6 address: {word}")))
}

fn level_from_name(word: &str, line_no: u32) -> Result<Level> {
    Ok(match word.to_ascii_lowercase().as_str() {
        "critical" => Level::Crit,
        "error" => Level::Err,
        "warning" => Level::Warning,
        "notice" => Level::Notice,
        "connect" => Level::Conn,
        "info" => Level::Info,
        other => return Err(syntax(line_no, format!("invalid loglevel: {other}"))),
    })
}

/// Applies one already-trimmed, non-empty, non-comment line to `builder`.
pub fn apply_line(builder: &mut ConfigBuilder, line_no: u32, line: &str) -> Result<()> {
    if line.len() > MAX_LINE_LEN {
        return Err(syntax(line_no, "line exceeds maximum length"));
    }

    // "no upstream" is the one two-word directive spelling.
    let (first, after_first) = split_name(line);
    if first.eq_ignore_ascii_case("no") {
        let (second, rest) = split_name(after_first);
        if !second.eq_ignore_ascii_case("upstream") {
            return Err(syntax(line_no, format!("unknown directive: no {second}")));
        }
        let (domain, _) = take_str(rest, line_no)?;
        builder.cfg.upstream.add_deny(&domain);
        return Ok(());
    }

    let (name, rest) = (first, after_first);
    let cfg = &mut builder.cfg;

    match name.to_ascii_lowercase().as_str() {
        "logfile" => cfg.logfile = Some(take_str(rest, line_no)?.0),
        "pidfile" => cfg.pidfile = Some(take_str(rest, line_no)?.0),
        "statfile" => cfg.statfile = Some(take_str(rest, line_no)?.0),
        "anonymous" => cfg.anonymous_headers.push(take_str(rest, line_no)?.0),
        "viaproxyname" => {
            let (value, _) = take_str(rest, line_no)?;
            crate::log!(Level::Info, value = %value, "viaproxyname set");
            cfg.viaproxyname = Some(value);
        }
        "disableviaheader" => cfg.disableviaheader = parse_bool(take_word(rest).0, line_no)?,
        "defaulterrorfile" => cfg.defaulterrorfile = Some(take_str(rest, line_no)?.0),
        "errorfile" => {
            let (code_word, rest) = take_word(rest);
            let code = parse_int(code_word, line_no)?;
            if code > 999 {
                return Err(ProxyError::OutOfRange(format!("invalid status code: {code}")));
            }
            let (page, _) = take_str(rest, line_no)?;
            cfg.error_pages.insert(code as u16, page);
        }
        "addheader" => {
            let (header_name, rest) = take_str(rest, line_no)?;
            let (header_value, _) = take_str(rest, line_no)?;
            cfg.add_headers.insert(0, (header_name, header_value));
        }
        "stathost" => {
            let (value, _) = take_str(rest, line_no)?;
            crate::log!(Level::Info, value = %value, "stathost set");
            cfg.stathost = Some(value);
        }
        "xtinyproxy" => {
            if !cfg!(feature = "xtinyproxy") {
                return Err(ProxyError::FeatureDisabled("xtinyproxy"));
            }
            cfg.xtinyproxy = parse_bool(take_word(rest).0, line_no)?;
        }
        "syslog" => {
            if !cfg!(feature = "syslog") {
                return Err(ProxyError::FeatureDisabled("syslog"));
            }
            cfg.syslog = parse_bool(take_word(rest).0, line_no)?;
        }
        "bindsame" => cfg.bindsame = parse_bool(take_word(rest).0, line_no)?,
        "port" => cfg.port = parse_int_in_range(rest, line_no, u16::MAX as u64)? as u16,
        "maxclients" => cfg.max_clients = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32,
        "maxspareservers" => {
            cfg.max_spare_servers = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32
        }
        "minspareservers" => {
            cfg.min_spare_servers = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32
        }
        "startservers" => cfg.start_servers = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32,
        "maxrequestsperchild" => {
            cfg.max_requests_per_child = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32
        }
        "timeout" => cfg.idle_timeout = parse_int_in_range(rest, line_no, u32::MAX as u64)? as u32,
        "connectport" => {
            let port = parse_int_in_range(rest, line_no, u16::MAX as u64)? as u16;
            cfg.connect_ports.add(port);
        }
        "user" => cfg.user = Some(parse_alnum(take_word(rest).0, line_no)?),
        "group" => cfg.group = Some(parse_alnum(take_word(rest).0, line_no)?),
        "listen" => {
            let (word, _) = take_word(rest);
            if parse_ip_word(word, line_no).is_err() && parse_ipv6_word(word, line_no).is_err() {
                return Err(syntax(line_no, format!("invalid listen address: {word}")));
            }
            crate::log!(Level::Info, addr = word, "listen address set");
            cfg.listen_addr = Some(word.to_string());
        }
        "bind" => {
            if cfg!(feature = "transparent") {
                return Err(ProxyError::Validation(
                    "bind cannot be combined with transparent mode".into(),
                ));
            }
            let (word, _) = take_word(rest);
            if parse_ip_word(word, line_no).is_err() && parse_ipv6_word(word, line_no).is_err() {
                return Err(syntax(line_no, format!("invalid bind address: {word}")));
            }
            cfg.bind_addr = Some(word.to_string());
        }
        "allow" | "deny" => {
            let (word, _) = take_word(rest);
            let access = if name.eq_ignore_ascii_case("allow") { Access::Allow } else { Access::Deny };
            // A malformed CIDR is RuleRejected, not a load-aborting syntax
            // error: the rule is silently dropped and loading continues.
            if let Err(err) = cfg.acl.insert(word, access) {
                crate::log!(Level::Warning, pattern = word, %err, "rejecting malformed ACL entry");
            }
        }
        "filter" => {
            require_feature("filter", line_no)?;
            cfg.filter_path = Some(take_str(rest, line_no)?.0);
        }
        "filterurls" => {
            require_feature("filter", line_no)?;
            cfg.filter_urls = parse_bool(take_word(rest).0, line_no)?;
        }
        "filterextended" => {
            require_feature("filter", line_no)?;
            cfg.filter_extended = parse_bool(take_word(rest).0, line_no)?;
        }
        "filtercasesensitive" => {
            require_feature("filter", line_no)?;
            cfg.filter_case_sensitive = parse_bool(take_word(rest).0, line_no)?;
        }
        "filterdefaultdeny" => {
            require_feature("filter", line_no)?;
            cfg.filter_default_deny = parse_bool(take_word(rest).0, line_no)?;
        }
        "reversebaseurl" => {
            require_feature("reverse-proxy", line_no)?;
            cfg.reverse_base_url = Some(take_str(rest, line_no)?.0);
        }
        "reverseonly" => {
            require_feature("reverse-proxy", line_no)?;
            cfg.reverse_only = parse_bool(take_word(rest).0, line_no)?;
        }
        "reversemagic" => {
            require_feature("reverse-proxy", line_no)?;
            cfg.reverse_magic = parse_bool(take_word(rest).0, line_no)?;
        }
        "reversepath" => {
            require_feature("reverse-proxy", line_no)?;
            let (path, rest2) = take_str(rest, line_no)?;
            let target = if rest2.trim_start().starts_with('"') {
                Some(take_str(rest2, line_no)?.0)
            } else {
                None
            };
            cfg.reverse_paths.push((path, target));
        }
        "upstream" => {
            let (hostport, rest) = take_word(rest);
            let (host, port) = hostport
                .rsplit_once(':')
                .ok_or_else(|| syntax(line_no, "upstream requires host:port"))?;
            let port: u16 = port
                .parse()
                .map_err(|_| syntax(line_no, format!("invalid upstream port: {port}")))?;
            // Host is "(IP|ALNUM)" per the directive grammar: enforced here,
            // not left to the handler that consumes the parsed value.
            if parse_ip_word(host, line_no).is_err() && parse_alnum(host, line_no).is_err() {
                return Err(syntax(line_no, format!("invalid upstream host: {host}")));
            }
            let domain = if rest.trim_start().starts_with('"') {
                Some(take_str(rest, line_no)?.0)
            } else {
                None
            };
            cfg.upstream.add_proxy(None, None, host, port, domain.as_deref());
        }
        "loglevel" => cfg.loglevel = level_from_name(take_word(rest).0, line_no)?,
        other => return Err(syntax(line_no, format!("unknown directive: {other}"))),
    }

    Ok(())
}

fn parse_int_in_range(rest: &str, line_no: u32, max: u64) -> Result<u64> {
    let (word, _) = take_word(rest);
    let value = parse_int(word, line_no)?;
    if value > max {
        return Err(ProxyError::OutOfRange(format!("{value} exceeds maximum {max}")));
    }
    Ok(value)
}

fn require_feature(name: &'static str, line_no: u32) -> Result<()> {
    let enabled = match name {
        "filter" => cfg!(feature = "filter"),
        "reverse-proxy" => cfg!(feature = "reverse-proxy"),
        "transparent" => cfg!(feature = "transparent"),
        "xtinyproxy" => cfg!(feature = "xtinyproxy"),
        "syslog" => cfg!(feature = "syslog"),
        _ => false,
    };
    if enabled {
        Ok(())
    } else {
        let _ = line_no;
        Err(ProxyError::FeatureDisabled(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    #[test]
    fn bool_first_and_second_char_rule() {
        assert!(parse_bool("yes", 1).unwrap());
        assert!(parse_bool("on", 1).unwrap());
        assert!(!parse_bool("no", 1).unwrap());
        assert!(!parse_bool("off", 1).unwrap());
        assert!(parse_bool("YES", 1).unwrap());
        assert!(parse_bool("ON", 1).unwrap());
    }

    #[test]
    fn bool_rejects_garbage() {
        assert!(parse_bool("maybe", 1).is_err());
    }

    #[test]
    fn int_decimal_and_hex() {
        assert_eq!(parse_int("42", 1).unwrap(), 42);
        assert_eq!(parse_int("0x2A", 1).unwrap(), 42);
    }

    #[test]
    fn quoted_string_round_trip() {
        let (value, rest) = take_str("\"hello world\" tail", 1).unwrap();
        assert_eq!(value, "hello world");
        assert_eq!(rest, "tail");
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        assert!(take_str("\"oops", 1).is_err());
    }

    #[test]
    fn empty_quoted_string_is_syntax_error() {
        assert!(take_str("\"\"", 1).is_err());
        let mut b = builder();
        assert!(apply_line(&mut b, 1, "logfile \"\"").is_err());
    }

    #[test]
    fn upstream_host_charset_is_enforced() {
        let mut b = builder();
        assert!(apply_line(&mut b, 1, "upstream bad!host$:3128").is_err());
        apply_line(&mut b, 2, "upstream proxy.example.com:3128").unwrap();
        apply_line(&mut b, 3, "upstream 10.0.0.1:3128").unwrap();
    }

    #[test]
    fn line_too_long_rejected() {
        let mut b = builder();
        let line = format!("logfile \"{}\"", "x".repeat(1100));
        assert!(apply_line(&mut b, 1, &line).is_err());
    }

    #[test]
    fn port_directive_sets_value() {
        let mut b = builder();
        apply_line(&mut b, 1, "port 8888").unwrap();
        assert_eq!(b.cfg.port, 8888);
    }

    #[test]
    fn malformed_acl_entry_is_rejected_not_fatal() {
        let mut b = builder();
        apply_line(&mut b, 1, "allow 10.0.0.0/garbage").unwrap();
        assert!(b.cfg.acl.is_empty());
    }

    #[test]
    fn allow_and_deny_populate_acl() {
        let mut b = builder();
        apply_line(&mut b, 1, "allow 127.0.0.1").unwrap();
        apply_line(&mut b, 2, "deny 0.0.0.0/0").unwrap();
        assert!(!b.cfg.acl.is_empty());
    }

    #[test]
    fn upstream_and_no_upstream_directives() {
        let mut b = builder();
        apply_line(&mut b, 1, "upstream p1:3128 \".a.com\"").unwrap();
        apply_line(&mut b, 2, "upstream p2:3128").unwrap();
        apply_line(&mut b, 3, "no upstream \"intra.corp\"").unwrap();

        assert!(b.cfg.upstream.lookup("x.a.com").is_some());
        assert!(b.cfg.upstream.lookup("intra.corp").is_none());
        assert!(b.cfg.upstream.lookup("other.net").is_some());
    }

    #[test]
    fn unknown_directive_is_syntax_error() {
        let mut b = builder();
        assert!(apply_line(&mut b, 1, "bogus directive").is_err());
    }

    #[test]
    fn loglevel_directive() {
        let mut b = builder();
        apply_line(&mut b, 1, "loglevel warning").unwrap();
        assert_eq!(b.cfg.loglevel, Level::Warning);
    }

    #[test]
    fn directive_name_is_case_insensitive() {
        let mut b = builder();
        apply_line(&mut b, 1, "PORT 80").unwrap();
        assert_eq!(b.cfg.port, 80);
    }
}
