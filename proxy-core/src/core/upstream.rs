//! C4 — Upstream Router.
//!
//! An ordered list of upstream-proxy rules keyed by domain suffix, CIDR, or
//! default. First-match lookup returns one upstream or "no upstream" (send
//! direct).

use std::net::Ipv4Addr;

use crate::core::address::contiguous_mask;
use crate::logging::Level;

/// A resolved upstream proxy target, returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches any destination. At most one rule may carry this selector.
    Default,
    /// Leading `.` means match sub-domains (and, for the bare `.` pattern,
    /// hosts with no dot at all).
    DomainSuffix(String),
    /// IPv4-only by design: matched against the destination host only when
    /// that host is itself an IPv4 dotted-quad literal.
    CidrV4 { ip: [u8; 4], mask: [u8; 4] },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleKind {
    Proxy { host: Option<String>, port: Option<u16>, user: Option<String>, password: Option<String> },
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    kind: RuleKind,
    selector: Selector,
}

/// The ordered upstream rule table.
#[derive(Debug, Clone, Default)]
pub struct UpstreamRouter {
    rules: Vec<Rule>,
}

fn has_default(rules: &[Rule]) -> bool {
    rules.iter().any(|r| r.selector == Selector::Default)
}

fn ipv4_mask(bits: u32) -> [u8; 4] {
    let full = contiguous_mask(bits.min(32));
    [full[0], full[1], full[2], full[3]]
}

/// Parses the right-hand side of a CIDR expression as either a dotted-quad
/// mask or a decimal prefix length.
fn parse_ipv4_mask(text: &str) -> Option<[u8; 4]> {
    if text.contains('.') {
        text.parse::<Ipv4Addr>().ok().map(|m| m.octets())
    } else {
        text.parse::<u32>().ok().filter(|&n| n <= 32).map(ipv4_mask)
    }
}

impl UpstreamRouter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a `Default` (or regular) upstream-proxy rule for `host:port`,
    /// reachable via `upstream host:port` or `upstream host:port "domain"`.
    pub fn add_proxy(
        &mut self,
        user: Option<&str>,
        password: Option<&str>,
        host: &str,
        port: u16,
        domain_or_cidr: Option<&str>,
    ) {
        if host.is_empty() || port < 1 {
            crate::log!(Level::Warning, "nonsense upstream rule: invalid host or port");
            return;
        }

        let selector = match domain_or_cidr {
            None => Selector::Default,
            Some(d) if !d.is_empty() => Selector::DomainSuffix(d.to_string()),
            Some(_) => {
                crate::log!(Level::Warning, "nonsense upstream rule: empty domain");
                return;
            }
        };

        if selector == Selector::Default && has_default(&self.rules) {
            crate::log!(Level::Warning, "duplicate default upstream");
            return;
        }

        let rule = Rule {
            kind: RuleKind::Proxy {
                host: Some(host.to_string()),
                port: Some(port),
                user: user.map(str::to_string),
                password: password.map(str::to_string),
            },
            selector,
        };
        self.insert(rule);
    }

    /// Adds a `no upstream "domain_or_cidr"` rule: a "send direct" entry
    /// for the given selector.
    pub fn add_deny(&mut self, domain_or_cidr: &str) {
        if domain_or_cidr.is_empty() {
            crate::log!(Level::Warning, "nonsense no-upstream rule: empty domain");
            return;
        }

        let selector = if let Some((left, right)) = domain_or_cidr.split_once('/') {
            match (left.parse::<Ipv4Addr>(), parse_ipv4_mask(right)) {
                (Ok(ip), Some(mask)) => Selector::CidrV4 { ip: ip.octets(), mask },
                _ => Selector::DomainSuffix(domain_or_cidr.to_string()),
            }
        } else {
            Selector::DomainSuffix(domain_or_cidr.to_string())
        };

        self.insert(Rule { kind: RuleKind::Deny, selector });
    }

    fn insert(&mut self, rule: Rule) {
        if rule.selector == Selector::Default {
            self.rules.push(rule);
        } else {
            self.rules.insert(0, rule);
        }
    }

    /// First-match lookup. Returns `None` ("no upstream", i.e. connect
    /// direct) if the matching rule is a `Deny`, if a matching `Proxy`
    /// rule has no host/port, or if nothing matches at all.
    pub fn lookup(&self, destination_host: &str) -> Option<ProxyTarget> {
        for rule in &self.rules {
            if !selector_matches(&rule.selector, destination_host) {
                continue;
            }
            return match &rule.kind {
                RuleKind::Deny => None,
                RuleKind::Proxy { host, port, user, password } => {
                    match (host, port) {
                        (Some(host), Some(port)) => Some(ProxyTarget {
                            host: host.clone(),
                            port: *port,
                            user: user.clone(),
                            password: password.clone(),
                        }),
                        _ => None,
                    }
                }
            };
        }
        None
    }
}

fn selector_matches(selector: &Selector, destination_host: &str) -> bool {
    match selector {
        Selector::Default => true,
        Selector::DomainSuffix(pattern) => domain_suffix_match(destination_host, pattern),
        Selector::CidrV4 { ip, mask } => match destination_host.parse::<Ipv4Addr>() {
            Ok(addr) => {
                let octets = addr.octets();
                (0..4).all(|i| octets[i] & mask[i] == ip[i])
            }
            Err(_) => false,
        },
    }
}

/// Replicates the original's dot-walking domain-suffix match: exact
/// case-insensitive equality, or (for a leading-dot pattern) the first
/// dot-starting tail of `host` that equals `pattern`, with `"."` itself
/// matching any host that has no dot at all.
fn domain_suffix_match(host: &str, pattern: &str) -> bool {
    if host.eq_ignore_ascii_case(pattern) {
        return true;
    }
    if !pattern.starts_with('.') {
        return false;
    }
    if pattern.len() == 1 {
        return !host.contains('.');
    }
    let mut start = 0;
    while let Some(idx) = host[start..].find('.') {
        let abs = start + idx;
        if host[abs..].eq_ignore_ascii_case(pattern) {
            return true;
        }
        start = abs + 1;
    }
    false
}
