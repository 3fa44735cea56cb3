use crate::config::Config;
use crate::tunnel::ProviderRegistry;
use crate::ui::style;
use std::fmt::Write;

/// `qrlocal config show`
pub fn render_config(config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Config file: {}",
        style::value(config.config_path.display())
    );
    if !config.exists() {
        let _ = writeln!(out, "{}", style::dim("(using defaults, no config file found)"));
    }
    out.push('\n');

    let _ = writeln!(out, "Default Provider:   {}", config.default_provider);
    let _ = writeln!(out, "Copy to Clipboard:  {}", config.copy_to_clipboard);
    let _ = writeln!(out, "Quiet Mode:         {}", config.quiet_mode);
    let _ = writeln!(out, "Tunnel Timeout:     {}s", config.tunnel_timeout_secs);
    out.push('\n');

    let _ = writeln!(out, "Built-in Providers:");
    for name in config.providers.keys() {
        let _ = writeln!(out, "  - {name}");
    }

    if !config.custom_providers.is_empty() {
        let _ = writeln!(out, "\nCustom Providers:");
        for name in config.custom_providers.keys() {
            let _ = writeln!(out, "  - {name}");
        }
    }
    out
}

/// `qrlocal providers`
pub fn render_providers(config: &Config, registry: &ProviderRegistry) -> String {
    let (custom, builtin): (Vec<String>, Vec<String>) = registry
        .list()
        .into_iter()
        .partition(|name| config.is_custom_provider(name));

    let mut out = String::from("Available Tunnel Providers:\n\n");
    write_section(&mut out, "Built-in Providers:", &builtin, config, registry);
    if !custom.is_empty() {
        out.push('\n');
        write_section(&mut out, "Custom Providers:", &custom, config, registry);
    }
    let _ = write!(
        out,
        "\nUsage: {}\n",
        style::yellow("qrlocal <port> --public --provider <name>")
    );
    out
}

fn write_section(
    out: &mut String,
    title: &str,
    names: &[String],
    config: &Config,
    registry: &ProviderRegistry,
) {
    let _ = writeln!(out, "{title}");
    for name in names {
        let Ok(provider) = registry.resolve(name) else {
            continue;
        };
        let marker = if *name == config.default_provider {
            format!(" {}", style::accent("(default)"))
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "  {:<15} {}:{}{marker}",
            name,
            provider.destination(),
            provider.port()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn providers_listing_marks_default_and_custom() {
        let mut config = Config::default();
        config.default_provider = "pinggy".into();
        config.custom_providers.insert(
            "bore".into(),
            ProviderConfig {
                host: "relay.example.com".into(),
                port: Some(2222),
                user: "me".into(),
                url_regex: "https://x".into(),
                remote_port: Some(80),
            },
        );
        let registry = ProviderRegistry::from_config(&config).unwrap();
        let out = console::strip_ansi_codes(&render_providers(&config, &registry)).into_owned();

        assert!(out.contains("a@a.pinggy.io:443 (default)"));
        assert!(out.contains("nokey@localhost.run:22"));
        let custom_at = out.find("Custom Providers:").unwrap();
        assert!(out[custom_at..].contains("me@relay.example.com:2222"));
    }

    #[test]
    fn config_show_mentions_missing_file() {
        let config = Config::default();
        let out = console::strip_ansi_codes(&render_config(&config)).into_owned();
        assert!(out.contains("using defaults"));
        assert!(out.contains("Default Provider:   localhost.run"));
        assert!(!out.contains("Custom Providers"));
    }
}
