use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use xf_backend::xtream::{DEFAULT_PLAYLIST_TYPE, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use xf_backend::ClientOptions;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `servers.json`, `output/` and `debug/`.
    /// Relative paths resolve against the working directory.
    pub data_dir: String,
    /// Maximum number of body bytes kept in one debug dump.
    pub debug_cap_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "xtream_data32".to_string(),
            debug_cap_bytes: 500_000,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connect and per-read timeout, in seconds.
    pub timeout_secs: u64,
    /// `type` parameter sent to `get.php`.
    pub playlist_type: String,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            playlist_type: DEFAULT_PLAYLIST_TYPE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Width of the download / save progress bars.
    pub progress_width: usize,
    /// Colored output. `NO_COLOR` in the environment always disables it.
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            progress_width: 40,
            color: true,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "error".to_string(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.network.timeout_secs.max(1)),
            user_agent: self.network.user_agent.clone(),
            playlist_type: self.network.playlist_type.clone(),
        }
    }

    /// Data directory: the command-line override, else the configured one.
    pub fn resolve_data_dir(&self, cli_override: Option<&str>) -> PathBuf {
        PathBuf::from(cli_override.unwrap_or(&self.storage.data_dir))
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("xfitcher").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.storage.data_dir, "xtream_data32");
        assert_eq!(cfg.storage.debug_cap_bytes, 500_000);
        assert_eq!(cfg.network.timeout_secs, 20);
        assert_eq!(cfg.network.playlist_type, "m3u_plus");
        assert_eq!(cfg.ui.progress_width, 40);
        assert!(cfg.ui.color);
        assert_eq!(cfg.log.filter, "error");
    }

    #[test]
    fn parse_empty_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[storage]
data_dir = "/sdcard/xtream"

[network]
timeout_secs = 5
playlist_type = "m3u"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.storage.data_dir, "/sdcard/xtream");
        assert_eq!(cfg.storage.debug_cap_bytes, 500_000);
        assert_eq!(cfg.network.timeout_secs, 5);
        assert_eq!(cfg.network.playlist_type, "m3u");
        assert!(cfg.network.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn parse_ui_and_log() {
        let toml_str = r#"
[ui]
progress_width = 20
color = false

[log]
filter = "xf_backend=debug"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.ui.progress_width, 20);
        assert!(!cfg.ui.color);
        assert_eq!(cfg.log.filter, "xf_backend=debug");
    }

    #[test]
    fn client_options_follow_network_section() {
        let mut cfg = Config::default();
        cfg.network.timeout_secs = 0;
        cfg.network.playlist_type = "m3u".to_string();
        let opts = cfg.client_options();
        assert_eq!(opts.timeout, Duration::from_secs(1));
        assert_eq!(opts.playlist_type, "m3u");
    }

    #[test]
    fn data_dir_override_wins() {
        let cfg = Config::default();
        assert_eq!(cfg.resolve_data_dir(None), PathBuf::from("xtream_data32"));
        assert_eq!(
            cfg.resolve_data_dir(Some("/tmp/x")),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn config_path_ends_with_app_dir() {
        let path = config_path();
        assert!(path.to_string_lossy().ends_with("xfitcher/config.toml"));
    }
}
