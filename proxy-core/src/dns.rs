//! The DNS contract (§6): `resolve(name) -> list<ip>` and
//! `reverse(sockaddr) -> printable ip`. Both may fail; per §7 failure is
//! treated as "no match", never as an error, so the trait returns plain
//! collections/options rather than `Result`.

use std::net::{IpAddr, SocketAddr};

/// A host resolver used by the ACL's string-entry evaluation (§4.2) to turn
/// a non-leading-dot pattern into a set of addresses to compare against the
/// peer's IP. Behind a trait so tests can avoid a real network lookup, the
/// way `proxy-core`'s other I/O-touching pieces are seamed for testing.
pub trait HostResolver: Send + Sync {
    /// Resolve `name`. An empty vector means "could not resolve" — the ACL
    /// falls through to the suffix test rather than treating this as an
    /// error (§9 Design Notes: "DNS outages must not change the allow/deny
    /// verdict for suffix-matching rules").
    fn resolve(&self, name: &str) -> Vec<IpAddr>;
}

/// Resolver backed by the system's synchronous resolver. This is the only
/// blocking call inside the core (§5); its latency is accepted as the cost
/// of doing the check.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, name: &str) -> Vec<IpAddr> {
        use std::net::ToSocketAddrs;
        // Port 0 is a placeholder: only the address half of the lookup is used.
        match (name, 0u16).to_socket_addrs() {
            Ok(iter) => iter.map(|s| s.ip()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Resolver that never resolves anything. Used in tests exercising the
/// suffix-match fallback without depending on the environment's resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl HostResolver for NullResolver {
    fn resolve(&self, _name: &str) -> Vec<IpAddr> {
        Vec::new()
    }
}

/// Canonical textual form of an address, as returned by the reverse/printable
/// side of the DNS contract.
pub fn printable_ip(addr: SocketAddr) -> String {
    addr.ip().to_string()
}
