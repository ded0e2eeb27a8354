//! C7 — Configuration Record.
//!
//! A flat, typed container. Once loaded, consumers read it; nothing
//! mutates it in place again (reload produces a whole new record and
//! atomically swaps it in, see [`super::store`]).

use std::collections::HashMap;

use crate::core::acl::AclList;
use crate::core::connect_port::ConnectPortList;
use crate::core::upstream::UpstreamRouter;
use crate::logging::Level;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub listen_addr: Option<String>,
    pub bind_addr: Option<String>,

    pub logfile: Option<String>,
    pub pidfile: Option<String>,
    pub statfile: Option<String>,
    pub stathost: Option<String>,
    pub loglevel: Level,

    pub user: Option<String>,
    pub group: Option<String>,

    pub viaproxyname: Option<String>,
    pub disableviaheader: bool,
    pub bindsame: bool,

    pub max_clients: u32,
    pub max_spare_servers: u32,
    pub min_spare_servers: u32,
    pub start_servers: u32,
    pub max_requests_per_child: u32,
    /// `timeout` directive: idle-connection timeout in seconds. Guaranteed
    /// non-zero after a successful load (§4.6 post-load validation).
    pub idle_timeout: u32,

    pub defaulterrorfile: Option<String>,
    pub error_pages: HashMap<u16, String>,
    pub add_headers: Vec<(String, String)>,
    pub anonymous_headers: Vec<String>,

    pub xtinyproxy: bool,
    pub syslog: bool,

    pub filter_path: Option<String>,
    pub filter_urls: bool,
    pub filter_extended: bool,
    pub filter_case_sensitive: bool,
    pub filter_default_deny: bool,

    pub reverse_base_url: Option<String>,
    pub reverse_only: bool,
    pub reverse_magic: bool,
    pub reverse_paths: Vec<(String, Option<String>)>,

    pub acl: AclList,
    pub connect_ports: ConnectPortList,
    pub upstream: UpstreamRouter,
}

/// The maximum idle time a `timeout 0` directive is clamped to (§9 Open
/// Question: not specified by the filtered sources, taken from the
/// deployed defaults of the system this core was distilled from).
pub const MAX_IDLE_TIME: u32 = 120;

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 0,
            listen_addr: None,
            bind_addr: None,
            logfile: None,
            pidfile: None,
            statfile: None,
            stathost: None,
            loglevel: Level::Info,
            user: None,
            group: None,
            viaproxyname: None,
            disableviaheader: false,
            bindsame: false,
            max_clients: 100,
            max_spare_servers: 20,
            min_spare_servers: 5,
            start_servers: 10,
            max_requests_per_child: 0,
            idle_timeout: MAX_IDLE_TIME,
            defaulterrorfile: None,
            error_pages: HashMap::new(),
            add_headers: Vec::new(),
            anonymous_headers: Vec::new(),
            xtinyproxy: false,
            syslog: false,
            filter_path: None,
            filter_urls: false,
            filter_extended: false,
            filter_case_sensitive: false,
            filter_default_deny: false,
            reverse_base_url: None,
            reverse_only: false,
            reverse_magic: false,
            reverse_paths: Vec::new(),
            acl: AclList::new(),
            connect_ports: ConnectPortList::new(),
            upstream: UpstreamRouter::new(),
        }
    }
}
