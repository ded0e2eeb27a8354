use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proxy_core::core::config::{load_from_path, Config};

fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos();
    std::env::temp_dir().join(format!("proxy-core-{nanos}-{name}.conf"))
}

#[test]
fn loads_minimal_config() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = tmp_path("minimal");
    fs::write(&path, "port 8888\nuser \"nobody\"\n")?;

    let cfg = load_from_path(&path, &Config::default())?;
    assert_eq!(cfg.port, 8888);
    assert_eq!(cfg.user.as_deref(), Some("nobody"));
    assert!(cfg.acl.is_empty());
    Ok(())
}

#[test]
fn loads_acl_and_upstream_and_connect_ports() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = tmp_path("full");
    let text = r#"
port 8080
listen 127.0.0.1
allow 127.0.0.1
allow 10.0.0.0/8
deny 0.0.0.0/0
connectport 443
connectport 563
upstream p1:3128 ".a.com"
upstream p2:3128
no upstream "intra.corp"
loglevel notice
"#;
    fs::write(&path, text)?;

    let cfg = load_from_path(&path, &Config::default())?;
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.listen_addr.as_deref(), Some("127.0.0.1"));
    assert!(!cfg.acl.is_empty());
    assert!(cfg.connect_ports.check(443));
    assert!(!cfg.connect_ports.check(80));
    assert!(cfg.upstream.lookup("x.a.com").is_some());
    assert!(cfg.upstream.lookup("intra.corp").is_none());
    assert_eq!(cfg.loglevel, proxy_core::Level::Notice);
    Ok(())
}

#[test]
fn rejects_port_zero_after_parsing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = tmp_path("badport");
    fs::write(&path, "port 0\n")?;

    let result = load_from_path(&path, &Config::default());
    assert!(result.is_err());
    Ok(())
}

#[test]
fn unknown_directive_reports_line_number() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = tmp_path("badline");
    fs::write(&path, "port 80\nnonsense here\n")?;

    match load_from_path(&path, &Config::default()) {
        Err(proxy_core::ProxyError::Syntax { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected syntax error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn feature_gated_directive_fails_when_compiled_out() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = tmp_path("xtinyproxy");
    fs::write(&path, "port 80\nxtinyproxy yes\n")?;

    match load_from_path(&path, &Config::default()) {
        Err(proxy_core::ProxyError::FeatureDisabled(name)) => assert_eq!(name, "xtinyproxy"),
        other => panic!("expected FeatureDisabled, got {other:?}"),
    }
    Ok(())
}
