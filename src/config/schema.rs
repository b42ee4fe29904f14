//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit kubeconfig file; falls back to in-cluster / KUBECONFIG / ~/.kube/config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of current-context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Namespace handlers operate in when the object carries none
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Field manager sent with create/update/patch requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,

    /// Start every handler in dry-run mode
    #[serde(default = "default_false")]
    pub dry_run: bool,

    /// Informer configuration
    #[serde(default)]
    pub informer: InformerConfig,
}

/// Informer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InformerConfig {
    /// Resync period in seconds, 0 disables resync
    #[serde(default = "default_resync_seconds")]
    pub resync_seconds: u64,

    /// Namespace the informer list-and-watches, empty means all namespaces
    #[serde(default)]
    pub namespace: String,
}

// Default value functions
fn default_namespace() -> String {
    "default".to_string()
}

fn default_false() -> bool {
    false
}

fn default_resync_seconds() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            namespace: default_namespace(),
            field_manager: None,
            dry_run: default_false(),
            informer: InformerConfig::default(),
        }
    }
}

impl Default for InformerConfig {
    fn default() -> Self {
        Self {
            resync_seconds: default_resync_seconds(),
            namespace: String::new(),
        }
    }
}
