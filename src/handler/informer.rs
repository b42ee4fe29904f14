//! Informer and lister
//!
//! An [`Informer`] runs list-and-watch through kube's reflector, keeping a
//! read-only cache that [`Lister`] serves from. Events are delivered as
//! add/update/delete callbacks, and every cached object is re-delivered as an
//! update once per resync period.

use super::ManagedResource;
use crate::error::Result;
use futures::StreamExt;
use kube::runtime::reflector::{self, ObjectRef, Store, store::Writer};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, ResourceExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, warn};

pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(60);

/// Callbacks for informer events
pub trait InformerHandler<K> {
    fn on_add(&mut self, obj: &K);
    fn on_update(&mut self, old: &K, new: &K);
    fn on_delete(&mut self, obj: &K);
}

/// `(on_add, on_update, on_delete)` closures
impl<K, A, U, D> InformerHandler<K> for (A, U, D)
where
    A: FnMut(&K),
    U: FnMut(&K, &K),
    D: FnMut(&K),
{
    fn on_add(&mut self, obj: &K) {
        (self.0)(obj)
    }

    fn on_update(&mut self, old: &K, new: &K) {
        (self.1)(old, new)
    }

    fn on_delete(&mut self, obj: &K) {
        (self.2)(obj)
    }
}

/// Read access to an informer's cache
#[derive(Clone)]
pub struct Lister<K: ManagedResource> {
    store: Store<K>,
}

impl<K: ManagedResource> Lister<K> {
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<Arc<K>> {
        self.store.state()
    }

    pub fn list_by_namespace(&self, namespace: &str) -> Vec<Arc<K>> {
        self.store
            .state()
            .into_iter()
            .filter(|obj| obj.namespace().as_deref() == Some(namespace))
            .collect()
    }

    /// Cached object by namespace and name; pass an empty namespace for
    /// cluster-scoped kinds
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<K>> {
        let mut key = ObjectRef::new(name);
        if !namespace.is_empty() {
            key = key.within(namespace);
        }
        self.store.get(&key)
    }

    /// Wait until the first list has been loaded.
    /// Returns false if the informer was dropped before that.
    pub async fn wait_for_cache_sync(&self) -> bool {
        self.store.wait_until_ready().await.is_ok()
    }
}

/// Previous state of every object seen, used to pair updates with the old
/// object and to detect deletes missed while disconnected
pub struct InformerCache<K: ManagedResource> {
    objects: HashMap<ObjectRef<K>, K>,
    relisted: Option<HashSet<ObjectRef<K>>>,
    synced: bool,
}

impl<K: ManagedResource> Default for InformerCache<K> {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            relisted: None,
            synced: false,
        }
    }
}

impl<K: ManagedResource> InformerCache<K> {
    /// True once the first full list has completed
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn apply<H>(&mut self, event: watcher::Event<K>, handler: &mut H)
    where
        H: InformerHandler<K> + ?Sized,
    {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
            }
            watcher::Event::InitApply(obj) => {
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(ObjectRef::from_obj(&obj));
                }
                self.upsert(obj, handler);
            }
            watcher::Event::InitDone => {
                if let Some(seen) = self.relisted.take() {
                    let gone: Vec<_> = self
                        .objects
                        .keys()
                        .filter(|key| !seen.contains(*key))
                        .cloned()
                        .collect();
                    for key in gone {
                        if let Some(obj) = self.objects.remove(&key) {
                            handler.on_delete(&obj);
                        }
                    }
                }
                self.synced = true;
            }
            watcher::Event::Apply(obj) => self.upsert(obj, handler),
            watcher::Event::Delete(obj) => {
                self.objects.remove(&ObjectRef::from_obj(&obj));
                handler.on_delete(&obj);
            }
        }
    }

    /// Re-deliver every cached object as an unchanged update
    pub fn resync<H>(&self, handler: &mut H)
    where
        H: InformerHandler<K> + ?Sized,
    {
        for obj in self.objects.values() {
            handler.on_update(obj, obj);
        }
    }

    fn upsert<H>(&mut self, obj: K, handler: &mut H)
    where
        H: InformerHandler<K> + ?Sized,
    {
        let key = ObjectRef::from_obj(&obj);
        match self.objects.get(&key) {
            Some(old) => handler.on_update(old, &obj),
            None => handler.on_add(&obj),
        }
        self.objects.insert(key, obj);
    }
}

/// List-and-watch over one kind
pub struct Informer<K: ManagedResource> {
    client: Client,
    namespace: Option<String>,
    config: watcher::Config,
    resync: Duration,
    reader: Store<K>,
    writer: Writer<K>,
}

impl<K: ManagedResource> Informer<K> {
    pub fn new(client: Client) -> Self {
        let (reader, writer) = reflector::store();
        Self {
            client,
            namespace: None,
            config: watcher::Config::default(),
            resync: DEFAULT_RESYNC_PERIOD,
            reader,
            writer,
        }
    }

    /// Only watch `namespace`; empty means all namespaces
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
        self
    }

    /// A zero period disables resync
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync = period;
        self
    }

    pub fn with_labels(mut self, selector: &str) -> Self {
        self.config = self.config.labels(selector);
        self
    }

    pub fn with_fields(mut self, selector: &str) -> Self {
        self.config = self.config.fields(selector);
        self
    }

    /// Watched namespace, `None` for all namespaces
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn resync_period(&self) -> Duration {
        self.resync
    }

    pub fn lister(&self) -> Lister<K> {
        Lister::new(self.reader.clone())
    }

    /// Run until `shutdown` resolves or the watch stream ends
    pub async fn run<H, F>(self, mut handler: H, shutdown: F) -> Result<()>
    where
        H: InformerHandler<K>,
        F: Future<Output = ()>,
    {
        let api = match &self.namespace {
            Some(ns) => K::api(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let stream = reflector::reflector(self.writer, watcher(api, self.config).default_backoff());
        let mut stream = std::pin::pin!(stream);
        let mut shutdown = std::pin::pin!(shutdown);

        let resync_enabled = !self.resync.is_zero();
        // interval_at panics on a zero period
        let period = if resync_enabled {
            self.resync
        } else {
            Duration::from_secs(3600)
        };
        let mut resync = interval_at(Instant::now() + period, period);

        let mut cache = InformerCache::default();
        info!(kind = %K::KIND, "Waiting for informer caches to sync");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(kind = %K::KIND, "informer shutting down");
                    return Ok(());
                }
                _ = resync.tick() => {
                    if resync_enabled && cache.is_synced() {
                        cache.resync(&mut handler);
                    }
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        let was_synced = cache.is_synced();
                        cache.apply(event, &mut handler);
                        if !was_synced && cache.is_synced() {
                            info!(kind = %K::KIND, objects = cache.len(), "informer caches synced");
                        }
                    }
                    Some(Err(err)) => warn!(kind = %K::KIND, error = %err, "informer watch error"),
                    None => {
                        if !cache.is_synced() {
                            error!(kind = %K::KIND, "informer stream ended before caches synced");
                        }
                        return Ok(());
                    }
                },
            }
        }
    }
}
