use super::*;
use crate::error::TunnelError;
use std::io;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn lhr() -> Provider {
    ProviderRegistry::builtin()
        .unwrap()
        .resolve("localhost.run")
        .unwrap()
}

fn session(timeout: Duration, parent: &CancellationToken) -> TunnelSession {
    TunnelSession::new(SessionConfig::new(3000, lhr()).with_timeout(timeout), parent).unwrap()
}

fn synthetic(lines: &[&str]) -> OutputLines {
    let items: Vec<io::Result<Vec<u8>>> =
        lines.iter().map(|l| Ok(l.as_bytes().to_vec())).collect();
    Box::pin(tokio_stream::iter(items))
}

fn silent() -> OutputLines {
    Box::pin(tokio_stream::pending::<io::Result<Vec<u8>>>())
}

#[test]
fn zero_timeout_uses_default() {
    assert_eq!(effective_timeout(Duration::ZERO), DEFAULT_CONNECT_TIMEOUT);
    assert_eq!(
        effective_timeout(Duration::from_secs(7)),
        Duration::from_secs(7)
    );

    let root = CancellationToken::new();
    let zero = session(Duration::ZERO, &root);
    let thirty = session(Duration::from_secs(30), &root);
    assert_eq!(zero.timeout(), thirty.timeout());
}

#[test]
fn port_zero_is_rejected() {
    let root = CancellationToken::new();
    let err = TunnelSession::new(SessionConfig::new(0, lhr()), &root)
        .err()
        .unwrap();
    assert_eq!(err, TunnelError::InvalidPort("0".into()));
}

#[tokio::test]
async fn first_line_match_establishes_session() {
    let root = CancellationToken::new();
    let s = session(Duration::from_secs(5), &root);
    assert_eq!(s.state(), SessionState::Connecting);
    assert_eq!(s.public_url(), "");

    let url = s
        .establish(synthetic(&["Connect to https://abcd12.lhr.life or..."]))
        .await
        .unwrap()
        .to_string();

    assert_eq!(url, "https://abcd12.lhr.life");
    assert_eq!(s.public_url(), "https://abcd12.lhr.life");
    assert_eq!(s.state(), SessionState::Established);
    s.close().await.unwrap();
    assert_eq!(s.public_url(), "https://abcd12.lhr.life");
}

#[tokio::test]
async fn eof_without_match_is_no_url_produced() {
    let root = CancellationToken::new();
    let s = session(Duration::from_secs(30), &root);
    let started = Instant::now();

    let err = s
        .establish(synthetic(&["===", "Welcome to localhost.run!"]))
        .await
        .unwrap_err();

    assert!(matches!(err, TunnelError::NoUrlProduced(_)), "got: {err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(s.public_url(), "");
    assert_eq!(s.state(), SessionState::Closed);
}

#[tokio::test]
async fn silent_relay_times_out() {
    let root = CancellationToken::new();
    let s = session(Duration::from_millis(100), &root);
    let err = s.establish(silent()).await.unwrap_err();
    assert_eq!(err, TunnelError::ConnectTimeout(Duration::from_millis(100)));
}

#[tokio::test]
async fn external_cancellation_unblocks_connect() {
    let root = CancellationToken::new();
    let s = session(Duration::from_secs(30), &root);

    let trigger = root.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = s.establish(silent()).await.unwrap_err();
    assert_eq!(err, TunnelError::Cancelled);
}

#[tokio::test]
async fn close_unblocks_in_flight_connect() {
    let root = CancellationToken::new();
    let s = session(Duration::from_secs(30), &root);

    let (connect, close) = tokio::join!(s.establish(silent()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        s.close().await
    });

    assert_eq!(connect.unwrap_err(), TunnelError::Cancelled);
    assert!(close.is_ok());
}

#[tokio::test]
async fn close_before_connect_is_ok() {
    let root = CancellationToken::new();
    let s = session(Duration::ZERO, &root);
    s.close().await.unwrap();
    assert_eq!(s.state(), SessionState::Closed);

    // wait() must not hang on a session that never spawned anything
    tokio::time::timeout(Duration::from_secs(1), s.wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn close_is_idempotent() {
    let root = CancellationToken::new();
    root.cancel();
    let s = session(Duration::ZERO, &root);

    let first = s.close().await;
    let started = Instant::now();
    let second = s.close().await;

    assert_eq!(first, second);
    assert!(first.is_ok());
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn connect_after_cancel_is_cancelled() {
    let root = CancellationToken::new();
    let s = session(Duration::ZERO, &root);
    s.close().await.unwrap();
    assert_eq!(s.connect().await.unwrap_err(), TunnelError::Cancelled);
}

#[tokio::test]
async fn second_connect_is_rejected() {
    let root = CancellationToken::new();
    let s = session(Duration::ZERO, &root);
    s.close().await.unwrap();
    let _ = s.connect().await;
    assert!(matches!(
        s.connect().await.unwrap_err(),
        TunnelError::LaunchFailed(msg) if msg.contains("already started")
    ));
}

#[tokio::test]
async fn missing_ssh_binary_is_launch_failure() {
    let root = CancellationToken::new();
    let config = SessionConfig::new(3000, lhr())
        .with_ssh_program("/nonexistent/qrlocal-test-ssh")
        .with_timeout(Duration::from_secs(2));
    let err = TunnelSession::open(config, &root).await.err().unwrap();
    assert!(matches!(err, TunnelError::LaunchFailed(_)), "got: {err}");
}

#[tokio::test]
async fn close_reports_timeout_when_process_never_exits() {
    let root = CancellationToken::new();
    let bound = Duration::from_millis(100);
    let s = TunnelSession::new(
        SessionConfig::new(3000, lhr()).with_close_timeout(bound),
        &root,
    )
    .unwrap();
    let exited = s.attach_fake_process();

    let started = Instant::now();
    assert_eq!(s.close().await, Err(TunnelError::CloseTimeout(bound)));
    assert!(started.elapsed() >= bound);
    assert!(started.elapsed() < Duration::from_secs(2));

    // The outcome is memoised even once the process finally goes away.
    exited.cancel();
    assert_eq!(s.close().await, Err(TunnelError::CloseTimeout(bound)));
    assert_eq!(s.state(), SessionState::Closed);
}

#[tokio::test]
async fn close_succeeds_when_process_exits_within_bound() {
    let root = CancellationToken::new();
    let s = TunnelSession::new(
        SessionConfig::new(3000, lhr()).with_close_timeout(Duration::from_secs(2)),
        &root,
    )
    .unwrap();
    let exited = s.attach_fake_process();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        exited.cancel();
    });
    s.close().await.unwrap();
}
