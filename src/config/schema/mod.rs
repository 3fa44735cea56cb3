mod loader;
mod tunnel;

pub use tunnel::{ProviderConfig, builtin_providers};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to config.toml - resolved at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Provider used by `--public` when `--provider` is not given.
    pub default_provider: String,
    pub copy_to_clipboard: bool,
    pub quiet_mode: bool,

    /// How long to wait for the relay to announce a public URL; `0` means
    /// the built-in default.
    pub tunnel_timeout_secs: u64,

    /// Settings for the built-in providers. Entries here shadow the
    /// compiled-in defaults of the same name.
    pub providers: BTreeMap<String, ProviderConfig>,

    /// User-defined relays.
    pub custom_providers: BTreeMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            default_provider: "localhost.run".into(),
            copy_to_clipboard: false,
            quiet_mode: false,
            tunnel_timeout_secs: 30,
            providers: builtin_providers(),
            custom_providers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a provider section by exact name, built-in section first.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers
            .get(name)
            .or_else(|| self.custom_providers.get(name))
    }

    pub fn is_custom_provider(&self, name: &str) -> bool {
        !self.providers.contains_key(name) && self.custom_providers.contains_key(name)
    }
}
