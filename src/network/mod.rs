//! Host network probes: local listener check, LAN address and internet
//! reachability.

use anyhow::{Context, Result, bail};
use std::future::Future;
use std::ffi::OsStr;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};

/// Well-known endpoint used by the connectivity probe.
pub const PROBE_ADDR: &str = "1.1.1.1:443";
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything the share flow needs to know about the host's network.
///
/// `SystemNetwork` talks to the real host; tests substitute fixed answers.
pub trait HostNetwork: Send + Sync {
    /// Does anything accept TCP connections on `127.0.0.1:<port>`?
    fn is_port_active(&self, port: u16) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Address other devices on the LAN can reach this machine at.
    fn local_ip(&self) -> Pin<Box<dyn Future<Output = Result<IpAddr>> + Send + '_>>;

    /// Best-effort internet reachability check.
    fn is_online(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Is an ssh client available on `PATH`?
    fn has_ssh(&self) -> bool;
}

pub struct SystemNetwork;

impl HostNetwork for SystemNetwork {
    fn is_port_active(&self, port: u16) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(is_port_active(port))
    }

    fn local_ip(&self) -> Pin<Box<dyn Future<Output = Result<IpAddr>> + Send + '_>> {
        Box::pin(local_ip())
    }

    fn is_online(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(is_online())
    }

    fn has_ssh(&self) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        find_executable(&crate::tunnel::default_ssh_program(), &path).is_some()
    }
}

pub async fn is_port_active(port: u16) -> bool {
    matches!(
        tokio::time::timeout(PORT_CHECK_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}

/// Short TCP connect to a public anycast address. False on DNS failure,
/// refusal or timeout; a pass does not guarantee the relay is reachable.
pub async fn is_online() -> bool {
    let reachable = matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(PROBE_ADDR)).await,
        Ok(Ok(_))
    );
    tracing::debug!(reachable, "connectivity probe");
    reachable
}

/// Pick the interface address the OS would route public traffic through.
/// Connecting a UDP socket sends nothing; it only resolves the route.
pub async fn local_ip() -> Result<IpAddr> {
    match routed_ip().await {
        Ok(ip) if !ip.is_unspecified() && !ip.is_loopback() => Ok(ip),
        Ok(ip) => {
            tracing::debug!(%ip, "route lookup gave unusable address, trying hostname");
            hostname_ip().await
        }
        Err(e) => {
            tracing::debug!("route lookup failed: {e:#}, trying hostname");
            hostname_ip().await
        }
    }
}

async fn routed_ip() -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Failed to bind probe socket")?;
    socket
        .connect("8.8.8.8:80")
        .await
        .context("No route to the internet")?;
    Ok(socket.local_addr()?.ip())
}

async fn hostname_ip() -> Result<IpAddr> {
    let host = hostname::get()
        .context("Failed to read hostname")?
        .to_string_lossy()
        .into_owned();
    let addrs = tokio::net::lookup_host((host.as_str(), 0))
        .await
        .with_context(|| format!("Failed to resolve hostname {host}"))?;
    for addr in addrs {
        let ip = addr.ip();
        if ip.is_ipv4() && !ip.is_loopback() {
            return Ok(ip);
        }
    }
    bail!("no suitable local IP address found")
}

/// `http://<ip>:<port>`, bracketing IPv6 addresses.
pub fn local_url(ip: IpAddr, port: u16) -> String {
    format!("http://{}", SocketAddr::new(ip, port))
}

/// First entry of the `PATH`-style list `search_path` holding an executable
/// file named `binary`.
pub fn find_executable(binary: &OsStr, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
