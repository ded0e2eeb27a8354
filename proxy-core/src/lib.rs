#![forbid(unsafe_code)]

pub mod core;
pub mod dns;
pub mod error;
pub mod logging;

pub use core::{
    build_request, parse_ip, parse_mask, print_ip, Access, AclList, Address, Config,
    ConnectPortList, OriginalDestination, ProxyTarget, RequestParts, Selector,
    TransparentOutcome, UpstreamRouter,
};
pub use core::config::ConfigStore;
pub use dns::{HostResolver, NullResolver, SystemResolver};
pub use error::{ProxyError, Result};
pub use logging::Level;
