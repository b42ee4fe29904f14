//! Configuration for handlers and the `k8sh` binary
//!
//! A single YAML file layered over built-in defaults, with environment
//! variable overrides on top.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, InformerConfig};

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "kubeconfig" => Ok(config
            .kubeconfig
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()),
        "context" => Ok(config.context.clone().unwrap_or_default()),
        "namespace" => Ok(config.namespace.clone()),
        "fieldManager" => Ok(config.field_manager.clone().unwrap_or_default()),
        "dryRun" => Ok(config.dry_run.to_string()),
        "informer.resyncSeconds" => Ok(config.informer.resync_seconds.to_string()),
        "informer.namespace" => Ok(config.informer.namespace.clone()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
    match key {
        "kubeconfig" => config.kubeconfig = optional(value).map(Into::into),
        "context" => config.context = optional(value),
        "namespace" => {
            if value.is_empty() {
                return Err(anyhow::anyhow!("namespace must not be empty"));
            }
            config.namespace = value.to_string();
        }
        "fieldManager" => config.field_manager = optional(value),
        "dryRun" => {
            config.dry_run = value
                .parse()
                .context("dryRun must be 'true' or 'false'")?;
        }
        "informer.resyncSeconds" => {
            config.informer.resync_seconds = value
                .parse()
                .context("informer.resyncSeconds must be a number")?;
        }
        "informer.namespace" => config.informer.namespace = value.to_string(),
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}
