#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use proxy_core::{
    build_request, Access, ConfigStore, OriginalDestination, SystemResolver, TransparentOutcome,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Stand-in for a real `SO_ORIGINAL_DST` lookup (out of scope per `proxy-core`'s
/// transparent-mode module): reports the address the client actually dialed,
/// which is all this demonstration loop has without a full HTTP parser.
struct SocketDestination<'a>(&'a TcpStream);

impl OriginalDestination for SocketDestination<'_> {
    fn original_destination(&self) -> Option<(String, u16)> {
        self.0.local_addr().ok().map(|addr| (addr.ip().to_string(), addr.port()))
    }
}

/// Forward HTTP/HTTPS proxy daemon. This binary is a thin shell: it owns
/// the listening socket and the signal-driven reload/shutdown loop, and
/// defers every policy decision (ACL, connect-port, upstream routing) to
/// `proxy-core`. The per-connection accept/fork worker model and the full
/// HTTP request pipeline are outside this crate's scope.
#[derive(Parser, Debug)]
#[command(author, version, about = "Forward proxy daemon")]
struct Cli {
    /// Path to the directive configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "proxyd.conf")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let store = match ConfigStore::load(&cli.config) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(port = store.current().port, "configuration loaded");

    spawn_reload_handler(store.clone());

    if let Err(err) = run_accept_loop(store).await {
        error!(%err, "accept loop exited with error");
        std::process::exit(1);
    }
}

fn spawn_reload_handler(store: Arc<ConfigStore>) {
    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(err) => {
                error!(%err, "failed to install SIGHUP handler");
                return;
            }
        };
        loop {
            hangup.recv().await;
            match store.reload() {
                Ok(()) => info!("configuration reloaded"),
                Err(err) => warn!(%err, "reload failed, keeping previous configuration"),
            }
        }
    });
}

async fn run_accept_loop(store: Arc<ConfigStore>) -> std::io::Result<()> {
    let cfg = store.current();
    let bind_addr = cfg.listen_addr.clone().unwrap_or_else(|| "0.0.0.0".to_string());
    let listener = TcpListener::bind((bind_addr.as_str(), cfg.port)).await?;
    info!(addr = %bind_addr, port = cfg.port, "listening");

    let mut shutdown = signal(SignalKind::terminate())?;
    let resolver = SystemResolver;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("received shutdown signal");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let cfg = store.current();
                let verdict = cfg.acl.evaluate(&peer.ip().to_string(), "", &resolver);
                if verdict != Access::Allow {
                    warn!(%peer, "connection rejected by access control list");
                    drop(socket);
                    continue;
                }
                info!(%peer, "connection accepted");

                // No HTTP request is actually parsed here (that worker loop is
                // out of scope), so the destination comes from the original-
                // destination stand-in rather than a `Host` header.
                let destination = SocketDestination(&socket);
                match build_request(None, "/", &destination, cfg.bind_addr.as_deref()) {
                    TransparentOutcome::Accepted(parts) => {
                        if !cfg.connect_ports.check(parts.port) {
                            warn!(%peer, port = parts.port, "destination port not in connect-port allow-list");
                            drop(socket);
                            continue;
                        }
                        match cfg.upstream.lookup(&parts.host) {
                            Some(target) => {
                                info!(%peer, host = %parts.host, upstream = %target.host, upstream_port = target.port, "routed via upstream")
                            }
                            None => info!(%peer, host = %parts.host, "routing direct, no upstream matched"),
                        }
                    }
                    TransparentOutcome::Rejected { detail } => {
                        warn!(%peer, detail, "transparent request rejected");
                    }
                }
                // Full request parsing and forwarding happen in the
                // per-connection worker, which is outside proxy-core's scope.
                drop(socket);
            }
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
