use crate::cli::{Cli, Commands, ConfigCommands};
use crate::clipboard::SystemClipboard;
use crate::config::Config;
use crate::error::{QrLocalError, Result};
use crate::network::SystemNetwork;
use crate::tunnel::ProviderRegistry;
use crate::ui::Renderer;
use anyhow::{Context, anyhow};
use std::time::Duration;

use super::share::{Share, ShareRequest};
use super::status::{render_config, render_providers};

pub async fn dispatch(cli: Cli, config: Config, renderer: &Renderer) -> Result<()> {
    match cli.command {
        Some(Commands::Config {
            command: ConfigCommands::Init { force },
        }) => init_config(&config, force),
        Some(Commands::Config {
            command: ConfigCommands::Show,
        }) => {
            print!("{}", render_config(&config));
            Ok(())
        }
        Some(Commands::Providers) => {
            let registry = ProviderRegistry::from_config(&config)?;
            print!("{}", render_providers(&config, &registry));
            Ok(())
        }
        None => {
            let port = cli
                .share
                .port
                .ok_or_else(|| anyhow!("missing <PORT>; run `qrlocal --help` for usage"))?;
            let request = ShareRequest {
                port,
                public: cli.share.public,
                provider: cli.share.provider,
                copy: cli.share.copy || config.copy_to_clipboard,
                timeout: Duration::from_secs(
                    cli.share.timeout.unwrap_or(config.tunnel_timeout_secs),
                ),
            };
            let registry = ProviderRegistry::from_config(&config)?;
            Share::new(
                &config,
                &registry,
                &SystemNetwork,
                &SystemClipboard,
                renderer,
            )
            .run(&request)
            .await?;
            Ok(())
        }
    }
}

fn init_config(config: &Config, force: bool) -> Result<()> {
    let path = &config.config_path;
    if config.exists() && !force {
        println!("Config file already exists at {}", path.display());
        let overwrite = dialoguer::Confirm::new()
            .with_prompt("Overwrite?")
            .default(false)
            .interact()
            .context("Failed to read confirmation (use --force in non-interactive shells)")?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::init(path)?;
    println!(
        "{}",
        crate::ui::style::success(format!("✓ Config file created at {}", path.display()))
    );
    Ok(())
}

/// Tell the user what went wrong and what to try next. Quiet mode still
/// prints the bare error so a failure is never silent.
pub fn report_error(renderer: &Renderer, err: &QrLocalError) {
    if renderer.is_quiet() {
        eprintln!("Error: {err}");
        return;
    }
    renderer.print_error(&err.to_string());
    if let Some(hint) = err.hint() {
        renderer.print_info(hint);
    }
}
