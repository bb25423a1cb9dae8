use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub paths: PathsConfig,
    /// Free-form values handed to every template as globals
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub tagline: Option<String>,
    pub base_url: String,
    /// syntect theme used to generate the code highlighting stylesheet
    pub syntax_theme: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Quire".into(),
            tagline: None,
            base_url: "http://localhost:3000/".into(),
            syntax_theme: "InspiredGitHub".into(),
        }
    }
}

/// Where content is read from and where the batch build writes to.
/// Relative paths resolve against the working directory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub blog: PathBuf,
    pub docs: PathBuf,
    /// `.star` scripts published as reference pages
    pub reference: PathBuf,
    pub static_dir: PathBuf,
    /// Extra `.css`/`.js` files folded into the bundles
    pub assets: PathBuf,
    pub pages: PathBuf,
    pub theme: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            blog: "_posts".into(),
            docs: "_docs".into(),
            reference: "sdk".into(),
            static_dir: "static".into(),
            assets: "site".into(),
            pages: "pages".into(),
            theme: "theme".into(),
            output: "dist".into(),
        }
    }
}
