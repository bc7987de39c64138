use folio_overrides::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Bearer token for the override API, read from the environment
pub const TOKEN_ENV: &str = "FOLIO_API_TOKEN";

/// Folio configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the site's HTML pages
    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    /// Origin of the override API, e.g. `https://example.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Offline override snapshot (`{overrides, sectionOrders}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_file: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_site_dir() -> String {
    "site".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_site_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.site_dir)
    }

    pub fn get_overrides_file(&self, cwd: &str) -> Option<PathBuf> {
        self.overrides_file
            .as_ref()
            .map(|file| PathBuf::from(cwd).join(file))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_dir: default_site_dir(),
            api_base_url: None,
            overrides_file: None,
            engine: EngineConfig::default(),
        }
    }
}
