#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod network;
pub mod tunnel;
pub mod ui;

pub use cli::{Cli, Commands, ConfigCommands};
pub use config::Config;
pub use error::{QrLocalError, ShareError, TunnelError};
