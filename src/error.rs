use std::time::Duration;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `qrlocal`.
///
/// Each subsystem defines its own error variant. Callers can match on these
/// to decide what to tell the user; application glue continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum QrLocalError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Tunnel ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Tunnel(#[from] TunnelError),

    // ── Share orchestration ──────────────────────────────────────────────
    #[error(transparent)]
    Share(#[from] ShareError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QrLocalError {
    /// Actionable follow-up shown under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some(
                "Check the config file, or regenerate it with `qrlocal config init --force`.",
            ),
            Self::Tunnel(inner) => inner.hint(),
            Self::Share(inner) => inner.hint(),
            Self::Other(_) => None,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Tunnel errors ───────────────────────────────────────────────────────────

/// Terminal outcomes of a tunnel operation. None of these are retried.
///
/// Payloads are plain strings so the type stays `Clone`; a session memoises
/// its close outcome and hands the same value to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TunnelError {
    #[error("invalid port number: {0} (must be 1-65535)")]
    InvalidPort(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("no internet connection")]
    Offline,

    #[error("unable to connect to tunneling service {provider}: {reason}")]
    TunnelUnreachable { provider: String, reason: String },

    #[error("failed to start SSH tunnel: {0}")]
    LaunchFailed(String),

    #[error("SSH connection closed without providing URL ({0})")]
    NoUrlProduced(String),

    #[error("timeout waiting for tunnel URL after {}s", .0.as_secs())]
    ConnectTimeout(Duration),

    #[error("tunnel cancelled")]
    Cancelled,

    #[error("timeout waiting for tunnel cleanup after {}s", .0.as_secs())]
    CloseTimeout(Duration),
}

impl TunnelError {
    /// Next step to suggest to the user, if there is an obvious one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPort(_) => Some("Pass the port your server listens on, e.g. `qrlocal 3000`."),
            Self::UnknownProvider(_) => {
                Some("Use 'qrlocal providers' to see available providers.")
            }
            Self::Offline => Some(
                "Public tunnels require an internet connection. Try qrlocal without --public to share on your local network.",
            ),
            Self::TunnelUnreachable { .. } => {
                Some("Please check your internet connection, or try another --provider.")
            }
            Self::LaunchFailed(_) => Some("Make sure an OpenSSH client is installed and on PATH."),
            Self::NoUrlProduced(_) | Self::ConnectTimeout(_) => {
                Some("This might be a temporary issue. Please try again in a moment.")
            }
            Self::Cancelled | Self::CloseTimeout(_) => None,
        }
    }
}

// ─── Share errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("No service is listening on port {port}")]
    PortInactive { port: u16 },

    #[error("Failed to determine local IP address: {0}")]
    LocalAddress(String),

    #[error("no ssh client found on PATH")]
    SshMissing,

    #[error("Failed to generate QR code: {0}")]
    Render(String),

    #[error("Tunnel connection closed by the relay")]
    TunnelDropped,

    #[error(transparent)]
    Tunnel(#[from] TunnelError),
}

impl ShareError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PortInactive { .. } => {
                Some("Make sure your server is running before sharing it.")
            }
            Self::LocalAddress(_) => Some("Check that this machine is connected to a network."),
            Self::SshMissing => Some(
                "Public tunnels need the OpenSSH client. Install it, or share on your local network without --public.",
            ),
            Self::Render(_) => None,
            Self::TunnelDropped => Some("Run qrlocal again to open a new tunnel."),
            Self::Tunnel(inner) => inner.hint(),
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, QrLocalError>;
