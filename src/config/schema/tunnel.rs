use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One relay endpoint as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub host: String,
    /// ssh port of the relay. Unset means 22, or the built-in's port when
    /// the entry overrides a built-in provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub user: String,
    pub url_regex: String,
    /// Port requested on the relay side of `-R`. `0` asks the relay to
    /// allocate one dynamically. Unset falls back like `port`, else 80.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
}

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_REMOTE_PORT: u16 = 80;

impl ProviderConfig {
    fn builtin(host: &str, port: u16, user: &str, remote_port: u16, url_regex: &str) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
            user: user.into(),
            url_regex: url_regex.into(),
            remote_port: Some(remote_port),
        }
    }

    pub fn ssh_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    pub fn bind_port(&self) -> u16 {
        self.remote_port.unwrap_or(DEFAULT_REMOTE_PORT)
    }

    /// Copy of this entry with unset ports taken from `base`.
    pub fn inherit_ports(&self, base: &ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            port: self.port.or(base.port),
            remote_port: self.remote_port.or(base.remote_port),
            ..self.clone()
        }
    }
}

/// Relays that work without any configuration.
pub fn builtin_providers() -> BTreeMap<String, ProviderConfig> {
    BTreeMap::from([
        (
            "localhost.run".to_string(),
            ProviderConfig::builtin(
                "localhost.run",
                22,
                "nokey",
                80,
                r"https://[a-zA-Z0-9]+\.lhr\.life",
            ),
        ),
        (
            "pinggy".to_string(),
            ProviderConfig::builtin(
                "a.pinggy.io",
                443,
                "a",
                0,
                r"https://[a-zA-Z0-9-]+\.a\.free\.pinggy\.link",
            ),
        ),
        (
            "serveo".to_string(),
            ProviderConfig::builtin(
                "serveo.net",
                22,
                "serveo",
                80,
                r"Forwarding HTTP traffic from (https://[a-zA-Z0-9-]+\.(?:serveo\.net|serveousercontent\.com))",
            ),
        ),
        (
            "tunnelto".to_string(),
            ProviderConfig::builtin(
                "tunnel.us.tunnel.to",
                22,
                "tunnel",
                80,
                r"https://[a-zA-Z0-9-]+\.tunnel\.to",
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinggy_requests_dynamic_port() {
        let builtins = builtin_providers();
        assert_eq!(builtins["pinggy"].bind_port(), 0);
        assert_eq!(builtins["pinggy"].ssh_port(), 443);
        assert_eq!(builtins["localhost.run"].bind_port(), 80);
    }

    #[test]
    fn provider_config_toml_defaults() {
        let cfg: ProviderConfig = toml::from_str(
            "host = \"relay.example\"\nuser = \"me\"\nurl_regex = \"https://x\"\n",
        )
        .unwrap();
        assert_eq!(cfg.port, None);
        assert_eq!(cfg.ssh_port(), 22);
        assert_eq!(cfg.bind_port(), 80);
    }

    #[test]
    fn unset_ports_inherit_from_base() {
        let builtins = builtin_providers();
        let cfg: ProviderConfig = toml::from_str(
            "host = \"eu.pinggy.io\"\nuser = \"a\"\nurl_regex = \"https://x\"\n",
        )
        .unwrap();
        let merged = cfg.inherit_ports(&builtins["pinggy"]);
        assert_eq!(merged.host, "eu.pinggy.io");
        assert_eq!(merged.ssh_port(), 443);
        assert_eq!(merged.bind_port(), 0);

        let explicit = ProviderConfig {
            remote_port: Some(8080),
            ..cfg
        };
        assert_eq!(explicit.inherit_ports(&builtins["pinggy"]).bind_port(), 8080);
    }
}
