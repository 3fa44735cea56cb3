use super::provider::Provider;
use std::io;
use std::pin::Pin;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::SplitStream;
use tokio_stream::{Stream, StreamExt};

/// Relay output as one stream of raw lines (newline stripped).
pub type OutputLines = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Interleave two pipes line by line, ending when both reach EOF.
pub fn merge_output<O, E>(stdout: O, stderr: E) -> OutputLines
where
    O: AsyncRead + Send + Unpin + 'static,
    E: AsyncRead + Send + Unpin + 'static,
{
    let stdout = SplitStream::new(tokio::io::AsyncBufReadExt::split(
        BufReader::new(stdout),
        b'\n',
    ));
    let stderr = SplitStream::new(tokio::io::AsyncBufReadExt::split(
        BufReader::new(stderr),
        b'\n',
    ));
    Box::pin(stdout.merge(stderr))
}

/// How the scanning phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(String),
    /// Stream ended (or failed) before any line matched.
    Exhausted(String),
}

enum ScanState {
    Scanning(oneshot::Sender<ScanOutcome>),
    Draining,
}

/// Spawn the output task: scan for the provider's URL, report the first
/// match through the returned receiver, then keep draining until EOF so the
/// relay process never blocks on a full pipe.
pub fn spawn_output_task(
    lines: OutputLines,
    provider: &Provider,
) -> (oneshot::Receiver<ScanOutcome>, JoinHandle<()>) {
    let (tx, rx) = oneshot::channel();
    let provider = provider.clone();
    let handle = tokio::spawn(run_output_task(lines, provider, tx));
    (rx, handle)
}

async fn run_output_task(
    mut lines: OutputLines,
    provider: Provider,
    found_tx: oneshot::Sender<ScanOutcome>,
) {
    let mut state = ScanState::Scanning(found_tx);

    loop {
        let next = lines.next().await;
        state = match (state, next) {
            (ScanState::Scanning(tx), Some(Ok(raw))) => {
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches('\r');
                tracing::trace!(target: "qrlocal::tunnel", provider = provider.name(), "{line}");
                match provider.extract_url(line) {
                    Some(url) => {
                        // Receiver may be gone if connect already gave up.
                        let _ = tx.send(ScanOutcome::Found(url));
                        ScanState::Draining
                    }
                    None => ScanState::Scanning(tx),
                }
            }
            (ScanState::Scanning(tx), Some(Err(e))) => {
                let _ = tx.send(ScanOutcome::Exhausted(format!("error reading output: {e}")));
                return;
            }
            (ScanState::Scanning(tx), None) => {
                let _ = tx.send(ScanOutcome::Exhausted("output ended".into()));
                return;
            }
            (ScanState::Draining, Some(Ok(raw))) => {
                tracing::debug!(
                    target: "qrlocal::tunnel",
                    provider = provider.name(),
                    "{}",
                    String::from_utf8_lossy(&raw).trim_end()
                );
                ScanState::Draining
            }
            (ScanState::Draining, Some(Err(e))) => {
                tracing::debug!(target: "qrlocal::tunnel", "relay output closed: {e}");
                return;
            }
            (ScanState::Draining, None) => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::ProviderRegistry;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lhr() -> Provider {
        ProviderRegistry::builtin()
            .unwrap()
            .resolve("localhost.run")
            .unwrap()
    }

    fn synthetic(lines: &[&str]) -> OutputLines {
        let items: Vec<io::Result<Vec<u8>>> =
            lines.iter().map(|l| Ok(l.as_bytes().to_vec())).collect();
        Box::pin(tokio_stream::iter(items))
    }

    #[tokio::test]
    async fn first_line_match_is_reported() {
        let (rx, handle) = spawn_output_task(
            synthetic(&["Connect to https://abcd12.lhr.life or..."]),
            &lhr(),
        );
        assert_eq!(
            rx.await.unwrap(),
            ScanOutcome::Found("https://abcd12.lhr.life".into())
        );
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn no_match_is_exhausted_at_eof() {
        let (rx, handle) = spawn_output_task(
            synthetic(&["Welcome to localhost.run!", "follow us on twitter"]),
            &lhr(),
        );
        assert!(matches!(rx.await.unwrap(), ScanOutcome::Exhausted(_)));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn read_error_is_exhausted() {
        let items: Vec<io::Result<Vec<u8>>> = vec![
            Ok(b"banner".to_vec()),
            Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        ];
        let (rx, _handle) = spawn_output_task(Box::pin(tokio_stream::iter(items)), &lhr());
        match rx.await.unwrap() {
            ScanOutcome::Exhausted(reason) => assert!(reason.contains("error reading output")),
            other @ ScanOutcome::Found(_) => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn drains_remaining_lines_after_match() {
        let consumed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&consumed);
        let lines = tokio_stream::iter(vec![
            "https://first.lhr.life",
            "https://second.lhr.life",
            "keepalive",
            "keepalive",
        ])
        .map(move |l| -> io::Result<Vec<u8>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(l.as_bytes().to_vec())
        });

        let (rx, handle) = spawn_output_task(Box::pin(lines), &lhr());
        assert_eq!(
            rx.await.unwrap(),
            ScanOutcome::Found("https://first.lhr.life".into())
        );
        handle.await.unwrap();
        assert_eq!(consumed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn merges_both_pipes() {
        let stdout: &[u8] = b"Welcome\n";
        let stderr: &[u8] = b"Connect to https://zz9.lhr.life now\r\n";
        let (rx, _handle) = spawn_output_task(merge_output(stdout, stderr), &lhr());
        assert_eq!(
            rx.await.unwrap(),
            ScanOutcome::Found("https://zz9.lhr.life".into())
        );
    }
}
