use anyhow::Result;
use clap::ArgMatches;
use clap::parser::ValueSource;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./quire.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuireConfig {
    /// How the site is output
    pub serve: ServeConfig,
    /// Site configuration (from quire-core)
    #[serde(flatten)]
    pub site: quire_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServeConfig {
    /// Serve on demand instead of writing the output directory
    pub dev: bool,
    /// Host for dev server
    pub host: String,
    /// Port for dev server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            dev: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// True when the user typed the argument, as opposed to clap filling in its
/// default.
fn given(args: &ArgMatches, id: &str) -> bool {
    matches!(args.value_source(id), Some(ValueSource::CommandLine))
}

impl QuireConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (QUIRE_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_FILE);

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        let config_path = Path::new(config_file);
        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        } else if given(args, "config") {
            anyhow::bail!("configuration file not found: {}", config_path.display());
        }

        // 3. Add environment variables with QUIRE_ prefix
        builder = builder.add_source(
            Environment::with_prefix("QUIRE")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .try_parsing(true),
        );

        // 4. Override with CLI arguments (highest priority)
        if args.get_flag("dev") {
            builder = builder.set_override("serve.dev", true)?;
        }
        if args.get_flag("open") {
            builder = builder.set_override("serve.open", true)?;
        }
        if given(args, "dev-port") {
            if let Some(&port) = args.get_one::<u16>("dev-port") {
                builder = builder.set_override("serve.port", i64::from(port))?;
            }
        }
        if given(args, "host") {
            if let Some(host) = args.get_one::<String>("host") {
                builder = builder.set_override("serve.host", host.as_str())?;
            }
        }

        // Build and deserialize
        let config = builder.build()?;
        let quire_config: QuireConfig = config.try_deserialize()?;

        Ok(quire_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn load(argv: &[&str]) -> Result<QuireConfig> {
        let matches = crate::cli().try_get_matches_from(argv)?;
        QuireConfig::load(&matches)
    }

    #[test]
    fn test_default_config() {
        let config = QuireConfig::default();
        assert!(!config.serve.dev);
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.site.paths.output, PathBuf::from("dist"));
    }

    #[test]
    fn test_cli_args_override() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("quire.toml");

        let config = load(&[
            "quire",
            "--dev",
            "--dev-port",
            "8080",
            "--config",
            missing.to_str().unwrap(),
        ]);
        // An explicitly named config file has to exist
        assert!(config.is_err());

        std::fs::write(&missing, "").unwrap();
        let config = load(&["quire", "--dev", "--dev-port", "8080", "--config", missing.to_str().unwrap()]).unwrap();
        assert!(config.serve.dev);
        assert_eq!(config.serve.port, 8080);
        // Should still have defaults for non-overridden values
        assert_eq!(config.serve.host, "127.0.0.1");
    }

    #[test]
    fn test_file_values_beat_flag_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("quire.toml");
        std::fs::write(
            &file,
            "[serve]\nport = 4000\n\n[site]\ntitle = \"Ocuroot\"\n\n[paths]\noutput = \"public\"\n",
        )
        .unwrap();

        let config = load(&["quire", "--config", file.to_str().unwrap()]).unwrap();
        assert_eq!(config.serve.port, 4000);
        assert_eq!(config.site.site.title, "Ocuroot");
        assert_eq!(config.site.paths.output, PathBuf::from("public"));
        assert_eq!(config.site.paths.blog, PathBuf::from("_posts"));
    }
}
