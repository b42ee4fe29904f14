//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        Self::load_with_root(&paths::root_config_path())
    }

    /// Same as [`ConfigLoader::load`] but reads the root layer from `path`
    pub fn load_with_root(path: &Path) -> Result<Config> {
        let mut config = Self::load_defaults();

        if path.exists() {
            let root_config = Self::load_file(path)?;
            config = Self::merge_config(config, root_config);
        }

        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration by loading and checking for errors
    pub fn validate(path: &Path) -> Result<()> {
        let config = Self::load_with_root(path).context("Failed to load merged configuration")?;

        if config.namespace.is_empty() {
            return Err(anyhow::anyhow!("namespace must not be empty"));
        }
        if let Some(kubeconfig) = &config.kubeconfig {
            if !kubeconfig.exists() {
                return Err(anyhow::anyhow!(
                    "kubeconfig {} does not exist",
                    kubeconfig.display()
                ));
            }
        }

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Merge two configurations, with `other` taking precedence
    fn merge_config(base: Config, other: Config) -> Config {
        Config {
            kubeconfig: other.kubeconfig.or(base.kubeconfig),
            context: other.context.or(base.context),
            namespace: other.namespace,
            field_manager: other.field_manager.or(base.field_manager),
            dry_run: other.dry_run,
            informer: other.informer,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides_from(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
        if let Some(kubeconfig) = lookup("KUBECONFIG").filter(|v| !v.is_empty()) {
            // KUBECONFIG may hold a list; the first entry wins, like kubectl's merge order
            if let Some(first) = std::env::split_paths(&kubeconfig).next() {
                config.kubeconfig = Some(first);
            }
        }

        if let Some(context) = lookup("K8S_HANDLER_CONTEXT").filter(|v| !v.is_empty()) {
            config.context = Some(context);
        }

        if let Some(namespace) = lookup("K8S_HANDLER_NAMESPACE").filter(|v| !v.is_empty()) {
            config.namespace = namespace;
        }

        if let Some(dry_run) = lookup("K8S_HANDLER_DRY_RUN") {
            if let Ok(val) = dry_run.parse::<bool>() {
                config.dry_run = val;
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.informer.resync_seconds, 60);
    }

    #[test]
    fn test_merge_config_keeps_base_options() {
        let base = Config {
            field_manager: Some("base".to_string()),
            ..Default::default()
        };
        let other = Config {
            namespace: "test-ns".to_string(),
            dry_run: true,
            ..Default::default()
        };

        let merged = ConfigLoader::merge_config(base, other);
        assert!(merged.dry_run);
        assert_eq!(merged.namespace, "test-ns");
        assert_eq!(merged.field_manager.as_deref(), Some("base"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("K8S_HANDLER_NAMESPACE", "from-env"),
            ("K8S_HANDLER_DRY_RUN", "true"),
            ("K8S_HANDLER_CONTEXT", "kind-dev"),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::apply_overrides_from(Config::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.namespace, "from-env");
        assert!(config.dry_run);
        assert_eq!(config.context.as_deref(), Some("kind-dev"));
    }

    #[test]
    fn test_env_overrides_ignore_invalid_bool() {
        let config = ConfigLoader::apply_overrides_from(Config::default(), |key| {
            (key == "K8S_HANDLER_DRY_RUN").then(|| "yes".to_string())
        });
        assert!(!config.dry_run);
    }

    #[test]
    fn test_save_then_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");
        let config = Config {
            namespace: "apps".to_string(),
            field_manager: Some("k8sh".to_string()),
            ..Default::default()
        };

        ConfigLoader::save(&config, &path).unwrap();
        let loaded = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_file_missing() {
        let err = ConfigLoader::load_file(Path::new("/nonexistent/k8s-handler.yaml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_validate_rejects_missing_kubeconfig() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "kubeconfig: /nonexistent/kubeconfig\n").unwrap();

        // KUBECONFIG from the environment would override the file value
        if std::env::var("KUBECONFIG").is_err() {
            assert!(ConfigLoader::validate(&path).is_err());
        }
    }
}
