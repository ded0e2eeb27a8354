//! Mutable draft used while a directive file is being parsed. Grammar
//! handlers (see [`super::grammar`]) mutate a `ConfigBuilder` line by line;
//! [`ConfigBuilder::finish`] performs the post-load validation described in
//! §4.6 and yields an immutable [`super::record::Config`].

use crate::core::config::record::{Config, MAX_IDLE_TIME};
use crate::error::{ProxyError, Result};
use crate::logging::Level;

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    pub cfg: Config,
}

impl ConfigBuilder {
    /// Starts a draft from a set of defaults, the way `reload` clones
    /// `defaults` into a fresh record before re-parsing (§4.6 Reload,
    /// step 2) without copying the policy-engine collections, which are
    /// always rebuilt from the file being (re)loaded.
    pub fn from_defaults(defaults: &Config) -> Self {
        ConfigBuilder {
            cfg: Config {
                port: defaults.port,
                listen_addr: defaults.listen_addr.clone(),
                bind_addr: defaults.bind_addr.clone(),
                logfile: defaults.logfile.clone(),
                pidfile: defaults.pidfile.clone(),
                statfile: defaults.statfile.clone(),
                stathost: defaults.stathost.clone(),
                loglevel: defaults.loglevel,
                user: defaults.user.clone(),
                group: defaults.group.clone(),
                viaproxyname: defaults.viaproxyname.clone(),
                disableviaheader: defaults.disableviaheader,
                bindsame: defaults.bindsame,
                max_clients: defaults.max_clients,
                max_spare_servers: defaults.max_spare_servers,
                min_spare_servers: defaults.min_spare_servers,
                start_servers: defaults.start_servers,
                max_requests_per_child: defaults.max_requests_per_child,
                idle_timeout: defaults.idle_timeout,
                defaulterrorfile: defaults.defaulterrorfile.clone(),
                filter_path: defaults.filter_path.clone(),
                filter_urls: defaults.filter_urls,
                filter_extended: defaults.filter_extended,
                filter_case_sensitive: defaults.filter_case_sensitive,
                filter_default_deny: defaults.filter_default_deny,
                reverse_base_url: defaults.reverse_base_url.clone(),
                reverse_only: defaults.reverse_only,
                reverse_magic: defaults.reverse_magic,
                xtinyproxy: defaults.xtinyproxy,
                syslog: defaults.syslog,
                // Rebuilt from scratch, never copied from defaults.
                error_pages: Default::default(),
                add_headers: Default::default(),
                anonymous_headers: Default::default(),
                reverse_paths: Default::default(),
                acl: Default::default(),
                connect_ports: Default::default(),
                upstream: Default::default(),
            },
        }
    }

    /// Post-load validation (§4.6). `port == 0` is fatal; a missing `user`
    /// and a zero idle timeout are warned about and patched, not fatal.
    pub fn finish(mut self) -> Result<Config> {
        if self.cfg.port == 0 {
            return Err(ProxyError::Validation("port must be set and non-zero".into()));
        }
        if self.cfg.user.is_none() {
            crate::log!(Level::Warning, "no user directive, running as current user");
        }
        if self.cfg.idle_timeout == 0 {
            crate::log!(
                Level::Warning,
                clamped_to = MAX_IDLE_TIME,
                "timeout was zero, clamping to maximum idle time"
            );
            self.cfg.idle_timeout = MAX_IDLE_TIME;
        }
        Ok(self.cfg)
    }
}
