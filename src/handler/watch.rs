//! Watch with unconditional reconnect
//!
//! A watch keeps one event stream open and hands each event to a
//! [`WatchHandler`]. When the server closes the stream (watch timeout, dropped
//! connection) it is reopened straight away and the existence of the watched
//! objects is looked up again. The loop never ends on its own; drop the
//! future to stop watching.

use super::{Handler, ManagedResource};
use crate::error::Result;
use crate::input::Target;
use futures::StreamExt;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Callbacks for watch events
pub trait WatchHandler<K> {
    fn on_add(&mut self, obj: &K);
    fn on_modify(&mut self, obj: &K);
    fn on_delete(&mut self, obj: &K);
}

/// `(on_add, on_modify, on_delete)` closures
impl<K, A, M, D> WatchHandler<K> for (A, M, D)
where
    A: FnMut(&K),
    M: FnMut(&K),
    D: FnMut(&K),
{
    fn on_add(&mut self, obj: &K) {
        (self.0)(obj)
    }

    fn on_modify(&mut self, obj: &K) {
        (self.1)(obj)
    }

    fn on_delete(&mut self, obj: &K) {
        (self.2)(obj)
    }
}

/// Routes watch events to a handler.
///
/// Tracks whether the watched objects are known to exist, so the `Added`
/// events replayed on every reconnect do not fire `on_add` again.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchDispatcher {
    exists: bool,
}

impl WatchDispatcher {
    pub fn new(exists: bool) -> Self {
        Self { exists }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn dispatch<K, H>(&mut self, event: WatchEvent<K>, handler: &mut H)
    where
        H: WatchHandler<K> + ?Sized,
    {
        match event {
            WatchEvent::Added(obj) => {
                if !self.exists {
                    handler.on_add(&obj);
                }
                self.exists = true;
            }
            WatchEvent::Modified(obj) => {
                handler.on_modify(&obj);
                self.exists = true;
            }
            WatchEvent::Deleted(obj) => {
                handler.on_delete(&obj);
                self.exists = false;
            }
            WatchEvent::Bookmark(bookmark) => {
                debug!(resource_version = %bookmark.metadata.resource_version, "watch bookmark");
            }
            WatchEvent::Error(err) => {
                debug!(error = ?err, "watch error event");
            }
        }
    }
}

/// How a watch finds out whether its objects exist
#[derive(Debug, Clone)]
pub(crate) enum Existence {
    Name(String),
    Selector(ListParams),
}

impl Existence {
    pub(crate) fn name(name: &str) -> Self {
        Existence::Name(name.to_string())
    }

    pub(crate) fn labels(selector: &str) -> Self {
        Existence::Selector(ListParams::default().labels(selector).limit(1))
    }

    pub(crate) fn fields(selector: &str) -> Self {
        Existence::Selector(ListParams::default().fields(selector).limit(1))
    }

    async fn check<K>(&self, api: &Api<K>) -> Result<bool>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        match self {
            Existence::Name(name) => Ok(api.get_opt(name).await?.is_some()),
            Existence::Selector(params) => Ok(!api.list(params).await?.items.is_empty()),
        }
    }
}

/// Open a watch on `api` and dispatch events forever.
///
/// Existence is checked again after every (re)connect, so an object removed
/// and re-created while disconnected still fires `on_add`. Failing to open
/// the stream or to check existence is returned; stream errors and closes
/// trigger a reconnect.
pub(crate) async fn watch_loop<K, H>(
    api: &Api<K>,
    params: &WatchParams,
    existence: &Existence,
    handler: &mut H,
) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    H: WatchHandler<K> + ?Sized,
{
    loop {
        let mut stream = Box::pin(api.watch(params, "0").await?);
        let mut dispatcher = WatchDispatcher::new(existence.check(api).await?);
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => dispatcher.dispatch(event, handler),
                Err(err) => {
                    warn!(error = %err, "watch stream failed");
                    break;
                }
            }
        }
        debug!(
            resource = %api.resource_url(),
            "watch channel closed, reconnect"
        );
    }
}

impl<K: ManagedResource> Handler<K> {
    /// Watch a single object, addressed by name or by the object itself
    pub async fn watch<H>(&self, target: impl Into<Target<K>>, handler: H) -> Result<()>
    where
        H: WatchHandler<K>,
    {
        let (namespace, name) = self.resolve(target.into())?;
        self.with_namespace(&namespace)
            .watch_by_name(&name, handler)
            .await
    }

    pub async fn watch_by_name<H>(&self, name: &str, mut handler: H) -> Result<()>
    where
        H: WatchHandler<K>,
    {
        let params = self
            .options
            .snapshot()
            .watch_params()
            .fields(&format!("metadata.name={}", name));
        watch_loop(&self.api(), &params, &Existence::name(name), &mut handler).await
    }

    pub async fn watch_by_label<H>(&self, selector: &str, mut handler: H) -> Result<()>
    where
        H: WatchHandler<K>,
    {
        let params = self.options.snapshot().watch_params().labels(selector);
        watch_loop(&self.api(), &params, &Existence::labels(selector), &mut handler).await
    }

    pub async fn watch_by_field<H>(&self, selector: &str, mut handler: H) -> Result<()>
    where
        H: WatchHandler<K>,
    {
        let params = self.options.snapshot().watch_params().fields(selector);
        watch_loop(&self.api(), &params, &Existence::fields(selector), &mut handler).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        pub Callbacks {}
        impl WatchHandler<ConfigMap> for Callbacks {
            fn on_add(&mut self, obj: &ConfigMap);
            fn on_modify(&mut self, obj: &ConfigMap);
            fn on_delete(&mut self, obj: &ConfigMap);
        }
    }

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_added_fires_once_when_absent() {
        let mut callbacks = MockCallbacks::new();
        callbacks.expect_on_add().with(always()).times(1).return_const(());

        let mut dispatcher = WatchDispatcher::new(false);
        dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut callbacks);
        // replayed on reconnect
        dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut callbacks);
        assert!(dispatcher.exists());
    }

    #[test]
    fn test_added_suppressed_when_existing() {
        let mut callbacks = MockCallbacks::new();
        callbacks.expect_on_add().times(0);

        let mut dispatcher = WatchDispatcher::new(true);
        dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut callbacks);
    }

    #[test]
    fn test_delete_then_add_fires_again() {
        let mut callbacks = MockCallbacks::new();
        callbacks.expect_on_delete().times(1).return_const(());
        callbacks.expect_on_add().times(1).return_const(());

        let mut dispatcher = WatchDispatcher::new(true);
        dispatcher.dispatch(WatchEvent::Deleted(config_map("a")), &mut callbacks);
        assert!(!dispatcher.exists());
        dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut callbacks);
        assert!(dispatcher.exists());
    }

    #[test]
    fn test_modified_marks_existing() {
        let mut callbacks = MockCallbacks::new();
        callbacks
            .expect_on_modify()
            .withf(|cm: &ConfigMap| cm.metadata.name.as_deref() == Some("a"))
            .times(1)
            .return_const(());
        callbacks.expect_on_add().times(0);

        let mut dispatcher = WatchDispatcher::default();
        dispatcher.dispatch(WatchEvent::Modified(config_map("a")), &mut callbacks);
        dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut callbacks);
    }

    #[test]
    fn test_closure_tuple_handler() {
        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut deleted = Vec::new();
        {
            let mut handler = (
                |cm: &ConfigMap| added.push(cm.metadata.name.clone()),
                |cm: &ConfigMap| modified.push(cm.metadata.name.clone()),
                |cm: &ConfigMap| deleted.push(cm.metadata.name.clone()),
            );
            let mut dispatcher = WatchDispatcher::default();
            dispatcher.dispatch(WatchEvent::Added(config_map("a")), &mut handler);
            dispatcher.dispatch(WatchEvent::Modified(config_map("a")), &mut handler);
            dispatcher.dispatch(WatchEvent::Deleted(config_map("a")), &mut handler);
        }
        assert_eq!(added, vec![Some("a".to_string())]);
        assert_eq!(modified, vec![Some("a".to_string())]);
        assert_eq!(deleted, vec![Some("a".to_string())]);
    }
}
