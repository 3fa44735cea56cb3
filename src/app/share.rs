use crate::clipboard::ClipboardSink;
use crate::config::Config;
use crate::error::{ShareError, TunnelError};
use crate::network::{HostNetwork, local_url};
use crate::tunnel::{ProviderRegistry, SessionConfig, TunnelSession, default_ssh_program};
use crate::ui::Renderer;
use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{info, warn};

/// One invocation of `qrlocal <port>`.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// Port exactly as typed; validated by [`parse_port`].
    pub port: String,
    pub public: bool,
    /// Overrides `default_provider` from the config.
    pub provider: Option<String>,
    pub copy: bool,
    pub timeout: Duration,
}

/// Result of the share flow: the URL to show and, in public mode, the live
/// tunnel behind it.
pub struct Shared {
    pub url: String,
    pub is_public: bool,
    pub session: Option<TunnelSession>,
}

/// `1..=65535`, surrounding whitespace ignored.
pub fn parse_port(raw: &str) -> Result<u16, TunnelError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(TunnelError::InvalidPort(raw.to_string())),
    }
}

/// Wires port validation, local/public branching, clipboard, rendering and
/// shutdown together. Collaborators are borrowed so tests can swap them.
pub struct Share<'a> {
    config: &'a Config,
    registry: &'a ProviderRegistry,
    network: &'a dyn HostNetwork,
    clipboard: &'a dyn ClipboardSink,
    renderer: &'a Renderer,
    ssh_program: OsString,
}

impl<'a> Share<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a ProviderRegistry,
        network: &'a dyn HostNetwork,
        clipboard: &'a dyn ClipboardSink,
        renderer: &'a Renderer,
    ) -> Self {
        Self {
            config,
            registry,
            network,
            clipboard,
            renderer,
            ssh_program: default_ssh_program(),
        }
    }

    pub fn with_ssh_program(mut self, program: impl Into<OsString>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Validate, check the listener and produce the URL (opening a tunnel in
    /// public mode). Cancelling `cancel` aborts a tunnel that is still
    /// connecting.
    pub async fn establish(
        &self,
        request: &ShareRequest,
        cancel: &CancellationToken,
    ) -> Result<Shared, ShareError> {
        let port = parse_port(&request.port)?;

        if !self.network.is_port_active(port).await {
            return Err(ShareError::PortInactive { port });
        }

        if !request.public {
            let ip = self
                .network
                .local_ip()
                .await
                .map_err(|e| ShareError::LocalAddress(format!("{e:#}")))?;
            return Ok(Shared {
                url: local_url(ip, port),
                is_public: false,
                session: None,
            });
        }

        if !self.network.is_online().await {
            return Err(TunnelError::Offline.into());
        }
        if !self.network.has_ssh() {
            return Err(ShareError::SshMissing);
        }

        let name = request
            .provider
            .as_deref()
            .unwrap_or(&self.config.default_provider);
        let provider = self.registry.resolve(name)?;

        self.renderer
            .print_info(&format!("Creating public tunnel via {}...", provider.name()));

        let session_config = SessionConfig::new(port, provider)
            .with_timeout(request.timeout)
            .with_ssh_program(self.ssh_program.clone());
        let session = TunnelSession::open(session_config, cancel).await?;

        self.renderer.print_success("Tunnel established!");
        Ok(Shared {
            url: session.public_url().to_string(),
            is_public: true,
            session: Some(session),
        })
    }

    /// Clipboard failures are reported and otherwise ignored.
    pub fn copy_url(&self, url: &str) -> bool {
        match self.clipboard.write_text(url) {
            Ok(()) => {
                self.renderer.print_success("URL copied to clipboard!");
                true
            }
            Err(e) => {
                warn!("clipboard write failed: {e:#}");
                self.renderer
                    .print_error(&format!("Failed to copy URL to clipboard: {e:#}"));
                false
            }
        }
    }

    /// Full flow: establish, copy, render, then keep a tunnel open until the
    /// user interrupts or the relay drops it.
    pub async fn run(&self, request: &ShareRequest) -> Result<(), ShareError> {
        self.run_until(request, shutdown_signal()).await
    }

    /// [`Share::run`] driven by an explicit shutdown future.
    ///
    /// `shutdown` is watched from before the listener check until the tunnel
    /// is closed, so an interrupt in any phase ends the run.
    pub async fn run_until<S>(&self, request: &ShareRequest, shutdown: S) -> Result<(), ShareError>
    where
        S: Future<Output = io::Result<()>> + Send + 'static,
    {
        let interrupt = CancellationToken::new();
        let _watcher = AbortOnDropHandle::new(tokio::spawn({
            let interrupt = interrupt.clone();
            async move {
                match shutdown.await {
                    Ok(()) => interrupt.cancel(),
                    Err(e) => warn!("failed to listen for shutdown signal: {e}"),
                }
            }
        }));

        let establish = self.establish(request, &interrupt);
        tokio::pin!(establish);
        let first = tokio::select! {
            biased;
            () = interrupt.cancelled() => None,
            shared = &mut establish => Some(shared),
        };
        let shared = match first {
            Some(shared) => shared?,
            None => {
                // A connecting tunnel sees the cancellation and cleans up.
                if let Ok(Shared {
                    session: Some(session),
                    ..
                }) = establish.await
                    && let Err(e) = session.close().await
                {
                    warn!("tunnel cleanup after interrupt: {e}");
                }
                return Err(TunnelError::Cancelled.into());
            }
        };

        if request.copy {
            self.copy_url(&shared.url);
        }

        self.renderer
            .render_output(&shared.url, shared.is_public)
            .map_err(|e| ShareError::Render(format!("{e:#}")))?;

        match shared.session {
            Some(session) => self.hold_open(session, interrupt.cancelled()).await,
            None => Ok(()),
        }
    }

    /// Block until `shutdown` resolves or the tunnel process exits, then
    /// close the session.
    pub async fn hold_open(
        &self,
        session: TunnelSession,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ShareError> {
        self.renderer
            .print_info("Press Ctrl+C to stop the tunnel and exit...");

        // A session opened under the same token also exits on shutdown;
        // checking shutdown first keeps that a graceful stop.
        let dropped = tokio::select! {
            biased;
            () = shutdown => {
                self.renderer.print_info("Shutting down gracefully...");
                false
            }
            () = session.wait() => {
                info!(url = session.public_url(), "tunnel process exited");
                true
            }
        };

        if let Err(e) = session.close().await {
            self.renderer
                .print_error(&format!("Error during cleanup: {e}"));
            return Err(e.into());
        }
        if dropped {
            return Err(ShareError::TunnelDropped);
        }
        self.renderer.print_success("Tunnel closed. Goodbye!");
        Ok(())
    }
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
