#![warn(clippy::all, clippy::pedantic)]

use clap::Parser;
use qrlocal::ui::Renderer;
use qrlocal::{Cli, Config, QrLocalError, app};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the QR code on stdout.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to install log subscriber: {e}");
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            app::report_error(&Renderer::new(cli.share.quiet), &err);
            return ExitCode::FAILURE;
        }
    };

    let renderer = Renderer::new(cli.share.quiet || config.quiet_mode);
    match app::dispatch(cli, config, &renderer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            app::report_error(&renderer, &err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&str>) -> Result<Config, QrLocalError> {
    let path = Config::resolve_path(explicit)?;
    Ok(Config::load(&path)?)
}
