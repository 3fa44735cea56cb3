//! Session lifecycle against stand-in `ssh` scripts.
#![cfg(unix)]

use qrlocal::TunnelError;
use qrlocal::config::ProviderConfig;
use qrlocal::tunnel::{Provider, ProviderRegistry, SessionConfig, SessionState, TunnelSession};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn builtin(name: &str) -> Provider {
    ProviderRegistry::builtin().unwrap().resolve(name).unwrap()
}

// All scripts are written before any of them is spawned: a fork racing an
// open write handle on another script makes exec fail with ETXTBSY.
#[tokio::test]
async fn session_lifecycle_against_stand_in_ssh() {
    let tmp = tempfile::TempDir::new().unwrap();
    let args_file = tmp.path().join("args.txt");

    let announce = write_script(
        tmp.path(),
        "announce",
        &format!(
            "printf '%s\\n' \"$@\" > '{}'\necho 'You can now access your tunnel:' >&2\necho 'https://abc-1.a.free.pinggy.link' >&2\nexec sleep 30",
            args_file.display()
        ),
    );
    let silent_exit = write_script(tmp.path(), "silent_exit", "echo 'Welcome'\nexit 0");
    let hang = write_script(tmp.path(), "hang", "exec sleep 30");
    let short_lived = write_script(
        tmp.path(),
        "short_lived",
        "echo 'Forwarding HTTP traffic from https://demo.example.test'\nsleep 1\nexit 0",
    );

    // URL on stderr, custom port, args passed through.
    let parent = CancellationToken::new();
    let session = TunnelSession::open(
        SessionConfig::new(8080, builtin("pinggy"))
            .with_timeout(Duration::from_secs(10))
            .with_ssh_program(&announce),
        &parent,
    )
    .await
    .unwrap();
    assert_eq!(session.public_url(), "https://abc-1.a.free.pinggy.link");
    assert_eq!(session.state(), SessionState::Established);

    let args = fs::read_to_string(&args_file).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert!(args.contains(&"StrictHostKeyChecking=no"));
    assert!(args.contains(&"ConnectTimeout=10"));
    assert!(args.windows(2).any(|w| w == ["-p", "443"]));
    assert!(args.windows(2).any(|w| w == ["-R", "0:localhost:8080"]));
    assert_eq!(args.last(), Some(&"a@a.pinggy.io"));

    let started = Instant::now();
    session.close().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    tokio::time::timeout(Duration::from_secs(1), session.wait())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    session.close().await.unwrap();

    // Process exits without ever printing a URL.
    let err = TunnelSession::open(
        SessionConfig::new(3000, builtin("localhost.run"))
            .with_timeout(Duration::from_secs(10))
            .with_ssh_program(&silent_exit),
        &CancellationToken::new(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, TunnelError::NoUrlProduced(_)));

    // Relay never answers: the timeout wins and the child is reaped.
    let started = Instant::now();
    let err = TunnelSession::open(
        SessionConfig::new(3000, builtin("localhost.run"))
            .with_timeout(Duration::from_millis(300))
            .with_ssh_program(&hang),
        &CancellationToken::new(),
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err, TunnelError::ConnectTimeout(Duration::from_millis(300)));
    assert!(started.elapsed() < Duration::from_secs(5));

    // Caller cancels while connecting.
    let parent = CancellationToken::new();
    let canceller = parent.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });
    let err = TunnelSession::open(
        SessionConfig::new(3000, builtin("localhost.run"))
            .with_timeout(Duration::from_secs(10))
            .with_ssh_program(&hang),
        &parent,
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err, TunnelError::Cancelled);

    // Custom provider; the relay ends the tunnel on its own.
    let custom = Provider::new(
        "example",
        &ProviderConfig {
            host: "relay.example.test".into(),
            port: Some(2222),
            user: "tunnel".into(),
            url_regex: r"https://[a-z]+\.example\.test".into(),
            remote_port: Some(80),
        },
    )
    .unwrap();
    let session = TunnelSession::open(
        SessionConfig::new(5173, custom)
            .with_timeout(Duration::from_secs(10))
            .with_ssh_program(&short_lived),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(session.public_url(), "https://demo.example.test");
    tokio::time::timeout(Duration::from_secs(5), session.wait())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    session.close().await.unwrap();
}
