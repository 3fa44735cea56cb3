use super::launch::{classify_spawn_error, default_ssh_program, ssh_command};
use super::output::{OutputLines, ScanOutcome, merge_output, spawn_output_task};
use super::provider::Provider;
use crate::error::TunnelError;
use std::ffi::OsString;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Used when the caller passes a zero timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on how long `close` waits for the ssh process to go away.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Zero means "use the default".
pub fn effective_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_CONNECT_TIMEOUT
    } else {
        timeout
    }
}

/// What to connect and how long to wait for the relay.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub local_port: u16,
    pub provider: Provider,
    pub timeout: Duration,
    /// Bound on how long `close` waits for the process to exit.
    pub close_timeout: Duration,
    /// ssh client to run; tests point this at a stand-in script.
    pub ssh_program: OsString,
}

impl SessionConfig {
    pub fn new(local_port: u16, provider: Provider) -> Self {
        Self {
            local_port,
            provider,
            timeout: Duration::ZERO,
            close_timeout: CLOSE_TIMEOUT,
            ssh_program: default_ssh_program(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub fn with_ssh_program(mut self, program: impl Into<OsString>) -> Self {
        self.ssh_program = program.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Established,
    Closed,
}

/// One reverse port-forward through a relay, backed by an `ssh` child.
///
/// The child is owned by a supervisor task; the session only holds the
/// cancellation token that makes the supervisor kill it, and the `exited`
/// token the supervisor fires once the child is gone.
pub struct TunnelSession {
    local_port: u16,
    provider: Provider,
    timeout: Duration,
    close_timeout: Duration,
    ssh_program: OsString,
    public_url: OnceLock<String>,
    cancel: CancellationToken,
    exited: CancellationToken,
    started: AtomicBool,
    spawned: AtomicBool,
    close_outcome: OnceCell<Result<(), TunnelError>>,
}

impl TunnelSession {
    /// Create a session in `Connecting` without starting anything.
    ///
    /// The session's cancellation scope is a child of `parent`, so cancelling
    /// the caller's token also aborts this session.
    pub fn new(config: SessionConfig, parent: &CancellationToken) -> Result<Self, TunnelError> {
        if config.local_port == 0 {
            return Err(TunnelError::InvalidPort(config.local_port.to_string()));
        }
        Ok(Self {
            local_port: config.local_port,
            provider: config.provider,
            timeout: effective_timeout(config.timeout),
            close_timeout: config.close_timeout,
            ssh_program: config.ssh_program,
            public_url: OnceLock::new(),
            cancel: parent.child_token(),
            exited: CancellationToken::new(),
            started: AtomicBool::new(false),
            spawned: AtomicBool::new(false),
            close_outcome: OnceCell::new(),
        })
    }

    /// Create and connect. On failure the session is torn down and only the
    /// error is returned.
    pub async fn open(
        config: SessionConfig,
        parent: &CancellationToken,
    ) -> Result<Self, TunnelError> {
        let session = Self::new(config, parent)?;
        if let Err(err) = session.connect().await {
            if let Err(close_err) = session.close().await {
                warn!("tunnel cleanup after failed connect: {close_err}");
            }
            return Err(err);
        }
        Ok(session)
    }

    /// Spawn ssh and block until the relay announces a public URL, the
    /// output ends, the timeout elapses or the session is cancelled.
    pub async fn connect(&self) -> Result<&str, TunnelError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TunnelError::LaunchFailed(
                "tunnel session already started".into(),
            ));
        }
        if self.cancel.is_cancelled() {
            return Err(TunnelError::Cancelled);
        }
        let lines = self.launch()?;
        self.establish(lines).await
    }

    fn launch(&self) -> Result<OutputLines, TunnelError> {
        let mut child = ssh_command(
            &self.ssh_program,
            &self.provider,
            self.local_port,
            self.timeout,
        )
        .spawn()
        .map_err(|e| classify_spawn_error(&self.provider, &e))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(TunnelError::LaunchFailed(
                "failed to capture ssh output".into(),
            ));
        };

        info!(
            provider = self.provider.name(),
            pid = child.id(),
            local_port = self.local_port,
            "ssh tunnel process started"
        );
        self.spawned.store(true, Ordering::SeqCst);
        tokio::spawn(supervise(child, self.cancel.clone(), self.exited.clone()));
        Ok(merge_output(stdout, stderr))
    }

    /// Race URL discovery on `lines` against cancellation and the timeout.
    pub(crate) async fn establish(&self, lines: OutputLines) -> Result<&str, TunnelError> {
        let (found_rx, _output_task) = spawn_output_task(lines, &self.provider);

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(TunnelError::Cancelled),
            found = found_rx => match found {
                Ok(ScanOutcome::Found(url)) => Ok(url),
                Ok(ScanOutcome::Exhausted(reason)) => Err(TunnelError::NoUrlProduced(reason)),
                Err(_) => Err(TunnelError::NoUrlProduced("output task stopped".into())),
            },
            () = tokio::time::sleep(self.timeout) => Err(TunnelError::ConnectTimeout(self.timeout)),
        };

        match outcome {
            Ok(url) => {
                let url = self.public_url.get_or_init(|| url);
                info!(provider = self.provider.name(), url = %url, "tunnel established");
                Ok(url.as_str())
            }
            Err(err) => {
                debug!(provider = self.provider.name(), "tunnel connect failed: {err}");
                self.cancel.cancel();
                Err(err)
            }
        }
    }

    /// The relay-assigned URL; empty until the session is established.
    pub fn public_url(&self) -> &str {
        self.public_url.get().map_or("", String::as_str)
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Effective connect timeout (default already substituted).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> SessionState {
        if self.cancel.is_cancelled() || self.exited.is_cancelled() {
            SessionState::Closed
        } else if self.public_url.get().is_some() {
            SessionState::Established
        } else {
            SessionState::Connecting
        }
    }

    /// Terminate the ssh process and wait (bounded) for it to exit.
    ///
    /// Idempotent: the first outcome is kept and returned to every caller.
    pub async fn close(&self) -> Result<(), TunnelError> {
        self.close_outcome
            .get_or_init(|| async {
                self.cancel.cancel();
                if !self.spawned.load(Ordering::SeqCst) {
                    self.exited.cancel();
                }
                match tokio::time::timeout(self.close_timeout, self.exited.cancelled()).await {
                    Ok(()) => {
                        info!(provider = self.provider.name(), "tunnel closed");
                        Ok(())
                    }
                    Err(_) => {
                        warn!(provider = self.provider.name(), "ssh process did not exit in time");
                        Err(TunnelError::CloseTimeout(self.close_timeout))
                    }
                }
            })
            .await
            .clone()
    }

    /// Resolve once the ssh process has exited, on its own or via `close`.
    pub async fn wait(&self) {
        self.exited.cancelled().await;
    }

    /// Pretend a process was spawned; the caller fires the returned token in
    /// place of the supervisor.
    #[cfg(test)]
    pub(crate) fn attach_fake_process(&self) -> CancellationToken {
        self.started.store(true, Ordering::SeqCst);
        self.spawned.store(true, Ordering::SeqCst);
        self.exited.clone()
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() && self.spawned.load(Ordering::SeqCst) {
            warn!("TunnelSession dropped while still running, killing ssh process");
        }
        self.cancel.cancel();
    }
}

async fn supervise(mut child: Child, cancel: CancellationToken, exited: CancellationToken) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => info!(%status, "ssh tunnel process exited"),
            Err(e) => warn!("failed to wait for ssh tunnel process: {e}"),
        },
        () = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                warn!("failed to kill ssh tunnel process: {e}");
            }
            debug!("ssh tunnel process terminated");
        }
    }
    exited.cancel();
}
