//! C1 — Address Primitives.
//!
//! Every network address is normalized to a 16-byte big-endian value. IPv4
//! `a.b.c.d` is represented as the IPv4-mapped IPv6 form `::ffff:a.b.c.d`
//! (first 10 bytes zero, next two `0xff`, last four the dotted quad). All
//! CIDR arithmetic operates on this single 128-bit space; an IPv4 prefix
//! length `n` is internally promoted to `n + 96`.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{ProxyError, Result};

/// A 16-byte uniform address: either an IPv4-mapped IPv6 address, or a
/// native IPv6 address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 16]);

const V4_PREFIX_OFFSET: u32 = 96;
const ADDR_BITS: u32 = 128;

impl Address {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// True if this address is the IPv4-mapped-IPv6 form (`::ffff:a.b.c.d`).
    pub fn is_ipv4_mapped(&self) -> bool {
        self.0[..10] == [0u8; 10] && self.0[10] == 0xff && self.0[11] == 0xff
    }

    pub fn mask(&self, mask: &[u8; 16]) -> Address {
        let mut out = [0u8; 16];
        for i in 0..16 {
            out[i] = self.0[i] & mask[i];
        }
        Address(out)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", print_ip(*self))
    }
}

fn ipv4_mapped_bytes(v4: Ipv4Addr) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[10] = 0xff;
    bytes[11] = 0xff;
    bytes[12..16].copy_from_slice(&v4.octets());
    bytes
}

/// Parses a dotted-quad IPv4 literal or a canonical IPv6 literal into the
/// uniform 16-byte representation. Empty or malformed input fails.
pub fn parse_ip(text: &str) -> Result<Address> {
    if text.is_empty() {
        return Err(ProxyError::OutOfRange("empty address".into()));
    }
    if let Ok(v4) = text.parse::<Ipv4Addr>() {
        return Ok(Address(ipv4_mapped_bytes(v4)));
    }
    if let Ok(v6) = text.parse::<Ipv6Addr>() {
        return Ok(Address(v6.octets()));
    }
    Err(ProxyError::OutOfRange(format!("invalid address: {text}")))
}

/// Parses a decimal prefix length into a contiguous-ones mask over the
/// uniform 128-bit space. For IPv4 (`is_v6 == false`) the length is offset
/// by `+96` before the range check, so e.g. `parse_mask("24", false)`
/// yields the same mask as `parse_mask("120", true)`.
pub fn parse_mask(text: &str, is_v6: bool) -> Result<[u8; 16]> {
    let mut bits: u32 = text
        .parse()
        .map_err(|_| ProxyError::OutOfRange(format!("invalid prefix length: {text}")))?;
    if !is_v6 {
        bits += V4_PREFIX_OFFSET;
    }
    if bits > ADDR_BITS {
        return Err(ProxyError::OutOfRange(format!("prefix length out of range: {text}")));
    }
    Ok(contiguous_mask(bits))
}

/// Builds a 16-byte mask with `bits` leading ones, `128 - bits` trailing
/// zeros.
pub fn contiguous_mask(bits: u32) -> [u8; 16] {
    let mut mask = [0u8; 16];
    let mut remaining = bits;
    for byte in mask.iter_mut() {
        if remaining >= 8 {
            *byte = 0xff;
            remaining -= 8;
        } else if remaining > 0 {
            *byte = 0xffu8 << (8 - remaining);
            remaining = 0;
        } else {
            *byte = 0;
        }
    }
    mask
}

/// Canonical textual form: IPv4-mapped addresses render as dotted-quad,
/// everything else as canonical IPv6.
pub fn print_ip(addr: Address) -> String {
    if addr.is_ipv4_mapped() {
        let b = addr.0;
        Ipv4Addr::new(b[12], b[13], b[14], b[15]).to_string()
    } else {
        Ipv6Addr::from(addr.0).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_and_mapped_ipv6_parse_equal() {
        for quad in ["127.0.0.1", "0.0.0.0", "255.255.255.255", "10.1.2.3"] {
            let a = parse_ip(quad).unwrap();
            let b = parse_ip(&format!("::ffff:{quad}")).unwrap();
            assert_eq!(a, b, "{quad}");
        }
    }

    #[test]
    fn mask_monotonicity_ipv4() {
        for n in 0..=32u32 {
            let got = parse_mask(&n.to_string(), false).unwrap();
            let want = contiguous_mask(96 + n);
            assert_eq!(got, want, "prefix {n}");
        }
    }

    #[test]
    fn mask_out_of_range() {
        assert!(parse_mask("33", false).is_err());
        assert!(parse_mask("129", true).is_err());
    }

    #[test]
    fn print_ip_roundtrips_dotted_quad() {
        let addr = parse_ip("192.168.1.42").unwrap();
        assert_eq!(print_ip(addr), "192.168.1.42");
    }

    #[test]
    fn print_ip_native_v6() {
        let addr = parse_ip("2001:db8::1").unwrap();
        assert_eq!(print_ip(addr), "2001:db8::1");
    }

    #[test]
    fn empty_and_malformed_fail() {
        assert!(parse_ip("").is_err());
        assert!(parse_ip("not-an-ip").is_err());
        assert!(parse_ip("999.999.999.999").is_err());
    }

    #[test]
    fn mask_application() {
        let addr = parse_ip("192.168.1.200").unwrap();
        let mask = parse_mask("24", false).unwrap();
        let masked = addr.mask(&mask);
        assert_eq!(print_ip(masked), "192.168.1.0");
    }
}
