use super::provider::{Provider, SSH_DEFAULT_PORT};
use crate::error::TunnelError;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Platform name of the OpenSSH client binary.
pub fn default_ssh_program() -> OsString {
    if cfg!(windows) {
        "ssh.exe".into()
    } else {
        "ssh".into()
    }
}

/// Arguments for a non-interactive reverse forward to `provider`.
///
/// ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null
///     -o LogLevel=ERROR -o ConnectTimeout=<secs> [-p <port>]
///     -R <bind>:localhost:<local_port> <user>@<host>
pub fn ssh_args(provider: &Provider, local_port: u16, timeout: Duration) -> Vec<String> {
    let mut args = vec![
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", timeout.as_secs().max(1)),
    ];

    if provider.port() != SSH_DEFAULT_PORT {
        args.push("-p".into());
        args.push(provider.port().to_string());
    }

    args.push("-R".into());
    args.push(provider.remote_forward(local_port));
    args.push(provider.destination());
    args
}

pub(crate) fn ssh_command(
    program: &OsString,
    provider: &Provider,
    local_port: u16,
    timeout: Duration,
) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(ssh_args(provider, local_port, timeout))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

const NETWORK_ERROR_PATTERNS: &[&str] = &[
    "no such host",
    "connection refused",
    "network is unreachable",
    "no route to host",
    "connection timed out",
    "i/o timeout",
];

/// Best-effort: does this spawn failure look like a network problem?
pub fn is_network_error(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::NetworkDown
    ) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    NETWORK_ERROR_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

pub(crate) fn classify_spawn_error(provider: &Provider, err: &io::Error) -> TunnelError {
    if is_network_error(err) {
        TunnelError::TunnelUnreachable {
            provider: provider.name().to_string(),
            reason: err.to_string(),
        }
    } else {
        TunnelError::LaunchFailed(err.to_string())
    }
}
