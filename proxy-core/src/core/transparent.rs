//! C5 — Transparent Request Builder.
//!
//! Reconstructs `(host, port, path)` and a canonical absolute URL from an
//! intercepted client socket and a partially-parsed request, for the
//! configuration where the daemon is reached via firewall redirection
//! rather than an explicit proxy setting in the client.

use crate::logging::Level;

/// The original destination of a socket that was redirected to the proxy
/// before the client ever sent a request (e.g. via `iptables REDIRECT`).
/// Behind a trait so the reconstruction algorithm can be exercised without
/// a real redirected socket; the daemon shell supplies the platform-specific
/// implementation (on Linux, a `getsockopt(SO_ORIGINAL_DST)` lookup), since
/// owning the listening socket is itself out of scope for this crate (§5).
pub trait OriginalDestination {
    fn original_destination(&self) -> Option<(String, u16)>;
}

/// The reconstructed parts of a transparently-intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransparentOutcome {
    Accepted(RequestParts),
    /// A 400 rejection; carries the detail message for the error page.
    Rejected { detail: &'static str },
}

const DEFAULT_PORT: u16 = 80;

fn build_url(host: &str, port: u16, path: &str) -> String {
    format!("http://{host}:{port}{path}")
}

/// Splits a `Host` header value into `name` and an optional port, per
/// `name[:port]`. Malformed trailing `:garbage` falls back to the default
/// port rather than failing the whole reconstruction.
fn split_host_header(value: &str) -> (String, u16) {
    match value.rsplit_once(':') {
        Some((name, port_text)) => match port_text.parse::<u16>() {
            Ok(port) if !name.is_empty() => (name.to_string(), port),
            _ => (value.to_string(), DEFAULT_PORT),
        },
        None => (value.to_string(), DEFAULT_PORT),
    }
}

/// Runs the reconstruction algorithm. `host_header` is the already-looked-up
/// `Host` header value, if any; `path` is the bare path the client sent (in
/// intercept mode the client never sends an absolute URL); `listen_bind` is
/// the configured listen address, compared literally against the resolved
/// host to reject self-connections.
pub fn build_request(
    host_header: Option<&str>,
    path: &str,
    original_destination: &dyn OriginalDestination,
    listen_bind: Option<&str>,
) -> TransparentOutcome {
    let (host, port) = match host_header {
        Some(value) => split_host_header(value),
        None => match original_destination.original_destination() {
            Some((ip, port)) => (ip, port),
            None => {
                crate::log!(Level::Err, "cannot determine destination for intercepted socket");
                return TransparentOutcome::Rejected { detail: "Unknown destination" };
            }
        },
    };

    let url = build_url(&host, port, path);

    if let Some(bind) = listen_bind {
        if bind == host {
            crate::log!(Level::Err, host = %host, "destination IP is the proxy itself");
            return TransparentOutcome::Rejected {
                detail: "You tried to connect to the machine the proxy is running on",
            };
        }
    }

    TransparentOutcome::Accepted(RequestParts { host, port, path: path.to_string(), url })
}
