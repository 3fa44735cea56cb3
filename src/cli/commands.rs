use clap::{Args, Parser, Subcommand};

/// `qrlocal` - Share a local service with a scannable QR code.
#[derive(Parser, Debug)]
#[command(name = "qrlocal")]
#[command(version)]
#[command(
    about = "Generate QR codes for sharing local services",
    long_about = "qrlocal generates QR codes for local network addresses or public URLs via SSH tunnels."
)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub share: ShareArgs,

    /// Path to config file (default: ~/.qrlocal/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Log tunnel diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Default)]
pub struct ShareArgs {
    /// Port of the local service to share (1-65535)
    #[arg(required = true)]
    pub port: Option<String>,

    /// Create a public URL via SSH tunnel
    #[arg(long)]
    pub public: bool,

    /// Tunnel provider (default from config)
    #[arg(long, value_name = "NAME")]
    pub provider: Option<String>,

    /// Copy the generated URL to system clipboard
    #[arg(long)]
    pub copy: bool,

    /// Suppress all output except URL and QR code
    #[arg(short, long)]
    pub quiet: bool,

    /// Seconds to wait for the tunnel URL (default from config)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage qrlocal configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List available tunnel providers
    Providers,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create a config file with default settings
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show,
}
