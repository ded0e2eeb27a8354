//! The policy and routing core: address primitives, access control, the
//! connect-port allow-list, upstream routing, transparent-mode request
//! reconstruction, and configuration.

pub mod acl;
pub mod address;
pub mod config;
pub mod connect_port;
pub mod transparent;
pub mod upstream;

pub use acl::{Access, AclList};
pub use address::{parse_ip, parse_mask, print_ip, Address};
pub use config::Config;
pub use connect_port::ConnectPortList;
pub use transparent::{build_request, OriginalDestination, RequestParts, TransparentOutcome};
pub use upstream::{ProxyTarget, Selector, UpstreamRouter};
