//! Public URLs through SSH reverse port-forwarding.
//!
//! A [`TunnelSession`] runs the system `ssh` client against a relay
//! ([`Provider`]), scans the client's merged output for the URL the relay
//! assigns, and keeps the process alive until it is closed.

mod launch;
mod output;
mod provider;
mod session;

#[cfg(test)]
mod tests;

pub use launch::{default_ssh_program, is_network_error, ssh_args};
pub use output::{OutputLines, ScanOutcome, merge_output, spawn_output_task};
pub use provider::{Provider, ProviderRegistry, SSH_DEFAULT_PORT};
pub use session::{
    CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, SessionConfig, SessionState, TunnelSession,
    effective_timeout,
};
