//! Typed handlers
//!
//! A [`Handler`] wraps one kind (see [`ManagedResource`]) in one namespace and
//! turns each operation into exactly one API call. Operations accept the
//! object in any of the shapes [`ResourceInput`](crate::input::ResourceInput)
//! and [`Target`](crate::input::Target) cover.
//!
//! ```no_run
//! use k8s_handler::handler::DeploymentHandler;
//! use std::path::Path;
//!
//! # async fn example(client: kube::Client) -> k8s_handler::Result<()> {
//! let handler = DeploymentHandler::new(client, "apps");
//! let deploy = handler.apply(Path::new("deploy.yaml")).await?;
//! handler.delete(&deploy).await?;
//! # Ok(())
//! # }
//! ```

mod informer;
mod operations;
mod patch;
mod resource;
mod watch;

pub use informer::{Informer, InformerCache, InformerHandler, Lister};
pub use resource::*;
pub use watch::{WatchDispatcher, WatchHandler};

pub(crate) use watch::{Existence, watch_loop};

use crate::config::{Config, InformerConfig};
use crate::error::{Error, Result};
use crate::options::{HandlerOptions, SharedOptions};
use kube::{Api, Client};
use std::marker::PhantomData;
use std::time::Duration;

pub(crate) const DEFAULT_NAMESPACE: &str = "default";

/// Handler for one kind of Kubernetes object
pub struct Handler<K> {
    client: Client,
    namespace: String,
    options: SharedOptions,
    informer: InformerConfig,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Handler<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            namespace: self.namespace.clone(),
            options: self.options.clone(),
            informer: self.informer.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for Handler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<K: ManagedResource> Handler<K> {
    /// Create a handler working in `namespace` (empty means `default`)
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: normalize_namespace(namespace),
            options: SharedOptions::default(),
            informer: InformerConfig::default(),
            _kind: PhantomData,
        }
    }

    /// Build the client from `config` and create a handler in its namespace
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = crate::kube::create_client(config)
            .await
            .map_err(Error::Config)?;
        let mut handler = Self::new(client, &config.namespace);
        handler.informer = config.informer.clone();
        handler.options.update(|o| {
            if config.dry_run {
                o.enable_dry_run();
            }
            if let Some(manager) = &config.field_manager {
                o.set_field_manager(manager);
            }
        });
        Ok(handler)
    }

    /// A copy working in another namespace
    pub fn with_namespace(&self, namespace: &str) -> Self {
        let mut copy = self.clone();
        copy.namespace = normalize_namespace(namespace);
        copy
    }

    /// A copy whose mutating calls are all sent as dry-run
    pub fn with_dry_run(&self) -> Self {
        let copy = self.clone();
        copy.options.update(HandlerOptions::enable_dry_run);
        copy
    }

    /// Timeout in seconds for list and watch calls
    pub fn set_timeout(&self, seconds: u32) {
        self.options.update(|o| o.set_timeout(seconds));
    }

    pub fn set_limit(&self, limit: u32) {
        self.options.update(|o| o.set_limit(limit));
    }

    pub fn set_force_delete(&self, force: bool) {
        self.options.update(|o| o.set_force_delete(force));
    }

    /// `background`, `foreground` or `orphan`; anything else means background
    pub fn set_propagation_policy(&self, policy: &str) {
        self.options.update(|o| o.set_propagation_policy(policy));
    }

    pub fn set_field_manager(&self, manager: &str) {
        self.options.update(|o| o.set_field_manager(manager));
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Api for the handler's namespace
    pub fn api(&self) -> Api<K> {
        K::api(self.client.clone(), &self.namespace)
    }

    /// Snapshot of the current request options
    pub fn options(&self) -> HandlerOptions {
        self.options.snapshot()
    }

    /// Informer over this kind with the configured resync period and
    /// namespace (all namespaces unless configured)
    pub fn informer(&self) -> Informer<K> {
        Informer::new(self.client.clone())
            .with_namespace(&self.informer.namespace)
            .with_resync_period(Duration::from_secs(self.informer.resync_seconds))
    }

    /// Use `config` for informers created from this handler
    pub fn set_informer_config(&mut self, config: InformerConfig) {
        self.informer = config;
    }

    fn api_in(&self, namespace: &str) -> Api<K> {
        K::api(self.client.clone(), namespace)
    }

    /// Api for the object's own namespace, falling back to the handler's
    fn api_for(&self, obj: &K) -> Api<K> {
        self.api_in(object_namespace(obj).unwrap_or(&self.namespace))
    }
}

fn normalize_namespace(namespace: &str) -> String {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        namespace.to_string()
    }
}

fn object_namespace<K: kube::Resource>(obj: &K) -> Option<&str> {
    obj.meta().namespace.as_deref().filter(|ns| !ns.is_empty())
}

fn name_of<K: kube::Resource>(obj: &K) -> Result<String> {
    obj.meta()
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(Error::MissingName)
}

/// Drop fields the server owns so the object can be resubmitted
fn strip_server_fields<K: kube::Resource>(obj: &mut K) {
    let meta = obj.meta_mut();
    meta.resource_version = None;
    meta.uid = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    #[test]
    fn test_normalize_namespace() {
        assert_eq!(normalize_namespace(""), "default");
        assert_eq!(normalize_namespace("kube-system"), "kube-system");
    }

    #[test]
    fn test_name_of() {
        let mut cm = ConfigMap::default();
        assert!(matches!(name_of(&cm), Err(Error::MissingName)));
        cm.metadata.name = Some(String::new());
        assert!(matches!(name_of(&cm), Err(Error::MissingName)));
        cm.metadata.name = Some("settings".into());
        assert_eq!(name_of(&cm).unwrap(), "settings");
    }

    #[test]
    fn test_strip_server_fields() {
        let mut cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".into()),
                resource_version: Some("42".into()),
                uid: Some("d1f3".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        strip_server_fields(&mut cm);
        assert_eq!(cm.metadata.name.as_deref(), Some("settings"));
        assert!(cm.metadata.resource_version.is_none());
        assert!(cm.metadata.uid.is_none());
    }

    #[test]
    fn test_object_namespace_ignores_empty() {
        let mut cm = ConfigMap::default();
        assert_eq!(object_namespace(&cm), None);
        cm.metadata.namespace = Some(String::new());
        assert_eq!(object_namespace(&cm), None);
        cm.metadata.namespace = Some("apps".into());
        assert_eq!(object_namespace(&cm), Some("apps"));
    }
}
