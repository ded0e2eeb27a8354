//! C2 — Access Control List.
//!
//! An ordered list of ALLOW/DENY entries keyed by CIDR or hostname pattern.
//! Evaluation is first-match: the first entry whose selector matches the
//! peer determines the verdict, and later entries are never consulted.

use std::net::Ipv6Addr;

use crate::core::address::{contiguous_mask, parse_ip, parse_mask};
use crate::dns::HostResolver;
use crate::error::Result;
use crate::logging::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

#[derive(Debug, Clone)]
enum AclEntry {
    Numeric { access: Access, network: [u8; 16], mask: [u8; 16] },
    String { access: Access, pattern: String },
}

/// The ordered rule table. Insertion order is semantically significant.
#[derive(Debug, Clone, Default)]
pub struct AclList {
    entries: Vec<AclEntry>,
}

impl AclList {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a new ACL entry. `pattern` is interpreted, in order, as: a
    /// bare IP literal, an IP/prefix-length pair, or a hostname pattern.
    /// The list is left unchanged if `pattern` cannot be parsed as any of
    /// those.
    pub fn insert(&mut self, pattern: &str, access: Access) -> Result<()> {
        if let Ok(addr) = parse_ip(pattern) {
            self.entries.push(AclEntry::Numeric {
                access,
                network: *addr.as_bytes(),
                mask: contiguous_mask(128),
            });
            return Ok(());
        }

        if let Some((left, right)) = pattern.split_once('/') {
            let is_v6 = left.parse::<Ipv6Addr>().is_ok();
            let ip = parse_ip(left)?;
            let mask = parse_mask(right, is_v6)?;
            let mut network = [0u8; 16];
            for i in 0..16 {
                network[i] = ip.as_bytes()[i] & mask[i];
            }
            self.entries.push(AclEntry::Numeric { access, network, mask });
            return Ok(());
        }

        self.entries.push(AclEntry::String { access, pattern: pattern.to_string() });
        Ok(())
    }

    /// Checks whether a connection from `peer_ip`/`peer_host` is allowed.
    /// An empty list allows everything. Exhausting the list with no match
    /// defaults to deny, with a `LOG_NOTICE` carrying the peer's identity.
    pub fn evaluate(&self, peer_ip: &str, peer_host: &str, resolver: &dyn HostResolver) -> Access {
        if self.entries.is_empty() {
            return Access::Allow;
        }

        for entry in &self.entries {
            match entry {
                AclEntry::Numeric { access, network, mask } => {
                    if peer_ip.is_empty() {
                        continue;
                    }
                    let Ok(addr) = parse_ip(peer_ip) else {
                        continue;
                    };
                    let masked = addr.mask(mask);
                    if masked.as_bytes() == network {
                        return *access;
                    }
                }
                AclEntry::String { access, pattern } => {
                    if !pattern.starts_with('.') {
                        for resolved in resolver.resolve(pattern) {
                            if resolved.to_string() == peer_ip {
                                return *access;
                            }
                        }
                    }

                    let host_len = peer_host.len();
                    let pat_len = pattern.len();
                    if host_len >= pat_len
                        && peer_host[host_len - pat_len..].eq_ignore_ascii_case(pattern)
                    {
                        return *access;
                    }
                }
            }
        }

        crate::log!(Level::Notice, host = peer_host, ip = peer_ip, "unauthorized connection");
        Access::Deny
    }
}
