//! Kubernetes client module
//!
//! Builds the [`Client`] every handler talks through.
//!
//! Kubeconfig resolution:
//! 1. `kubeconfig` from the config file (or `KUBECONFIG`, first entry)
//! 2. In-cluster service account
//! 3. `~/.kube/config`
//!
//! HTTP/HTTPS proxies are picked up from the standard environment variables
//! through kube's `http-proxy`/`socks5` features.

use crate::config::Config;
use anyhow::{Context, Result};
use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};

/// Build a client from the loaded configuration
pub async fn create_client(config: &Config) -> Result<Client> {
    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };

    let client_config = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context("Failed to load kubeconfig")?
        }
        None if config.context.is_some() => kube::Config::from_kubeconfig(&options)
            .await
            .context("Failed to load kubeconfig")?,
        None => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    tracing::debug!(cluster = %client_config.cluster_url, "creating client");
    Client::try_from(client_config).context("Failed to create Kubernetes client")
}

/// Name of the context the client will use, if a kubeconfig is involved
pub fn current_context(config: &Config) -> Option<String> {
    if let Some(context) = &config.context {
        return Some(context.clone());
    }
    let kubeconfig = match &config.kubeconfig {
        Some(path) => Kubeconfig::read_from(path).ok()?,
        None => Kubeconfig::read().ok()?,
    };
    kubeconfig.current_context
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
- name: staging
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: staging
  context:
    cluster: staging
    user: admin
users:
- name: admin
  user:
    token: abc
"#;

    fn kubeconfig_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_current_context_from_file() {
        let file = kubeconfig_file();
        let config = Config {
            kubeconfig: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(current_context(&config).as_deref(), Some("staging"));
    }

    #[test]
    fn test_current_context_override() {
        let file = kubeconfig_file();
        let config = Config {
            kubeconfig: Some(file.path().to_path_buf()),
            context: Some("prod".into()),
            ..Default::default()
        };
        assert_eq!(current_context(&config).as_deref(), Some("prod"));
    }

    #[tokio::test]
    async fn test_create_client_from_file() {
        let file = kubeconfig_file();
        let config = Config {
            kubeconfig: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(create_client(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_client_missing_file() {
        let config = Config {
            kubeconfig: Some("/nonexistent/kubeconfig".into()),
            ..Default::default()
        };
        let Err(err) = create_client(&config).await else {
            panic!("client built from a missing kubeconfig");
        };
        assert!(err.to_string().contains("/nonexistent/kubeconfig"));
    }
}
