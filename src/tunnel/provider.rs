use crate::config::{Config, ProviderConfig, builtin_providers};
use crate::error::{ConfigError, TunnelError};
use regex::Regex;
use std::collections::BTreeMap;

/// Default port of the ssh protocol; no `-p` flag is passed for it.
pub const SSH_DEFAULT_PORT: u16 = 22;

/// Immutable descriptor of one relay endpoint.
///
/// The URL pattern is compiled when the provider is built, so a session can
/// never fail on a bad pattern.
#[derive(Debug, Clone)]
pub struct Provider {
    name: String,
    host: String,
    port: u16,
    user: String,
    remote_port: u16,
    url_pattern: Regex,
}

impl Provider {
    pub fn new(name: impl Into<String>, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let name = name.into();
        let url_pattern = Regex::new(&config.url_regex).map_err(|e| {
            ConfigError::Validation(format!("invalid URL regex for provider {name}: {e}"))
        })?;
        Ok(Self {
            name,
            host: config.host.clone(),
            port: config.ssh_port(),
            user: config.user.clone(),
            remote_port: config.bind_port(),
            url_pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Port bound on the relay side; `0` means the relay picks one.
    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    pub fn url_pattern(&self) -> &Regex {
        &self.url_pattern
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `-R` argument forwarding the relay's bind port to `localhost:<local_port>`.
    pub fn remote_forward(&self, local_port: u16) -> String {
        format!("{}:localhost:{local_port}", self.remote_port)
    }

    /// Find the public URL in one line of relay output.
    ///
    /// The first capture group wins when the pattern has one that matched;
    /// otherwise the whole match is the URL.
    pub fn extract_url(&self, line: &str) -> Option<String> {
        let caps = self.url_pattern.captures(line)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }
}

/// Lookup table of relay providers: user configuration first, then the
/// compiled-in defaults.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    configured: BTreeMap<String, Provider>,
    builtin: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let builtins = builtin_providers();
        let mut configured = BTreeMap::new();
        for (name, cfg) in &config.custom_providers {
            configured.insert(name.clone(), Provider::new(name.clone(), cfg)?);
        }
        // Built-in section shadows custom entries of the same name, and an
        // override of a built-in keeps the ports it leaves unset.
        for (name, cfg) in &config.providers {
            let cfg = match canonical_builtin_name(name).and_then(|c| builtins.get(c)) {
                Some(base) => cfg.inherit_ports(base),
                None => cfg.clone(),
            };
            configured.insert(name.clone(), Provider::new(name.clone(), &cfg)?);
        }
        Ok(Self {
            configured,
            builtin: Self::compile_builtins()?,
        })
    }

    /// Registry with only the compiled-in providers.
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self {
            configured: BTreeMap::new(),
            builtin: Self::compile_builtins()?,
        })
    }

    fn compile_builtins() -> Result<BTreeMap<String, Provider>, ConfigError> {
        builtin_providers()
            .iter()
            .map(|(name, cfg)| Ok((name.clone(), Provider::new(name.clone(), cfg)?)))
            .collect()
    }

    pub fn resolve(&self, name: &str) -> Result<Provider, TunnelError> {
        if let Some(provider) = self.configured.get(name) {
            return Ok(provider.clone());
        }
        canonical_builtin_name(name)
            .and_then(|canonical| self.builtin.get(canonical))
            .cloned()
            .ok_or_else(|| TunnelError::UnknownProvider(name.to_string()))
    }

    /// Every resolvable provider name, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .builtin
            .keys()
            .chain(self.configured.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn canonical_builtin_name(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "localhost.run" | "localhostrun" => Some("localhost.run"),
        "pinggy" | "pinggy.io" => Some("pinggy"),
        "serveo" | "serveo.net" => Some("serveo"),
        "tunnelto" | "tunnel.to" => Some("tunnelto"),
        _ => None,
    }
}
