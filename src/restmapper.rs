//! REST mapping
//!
//! Resolves a group/version/kind to the resource path and scope the API
//! server uses for it. Kinds with a typed handler are known up front; anything
//! else is looked up once through single-kind discovery and cached.

use crate::error::{Error, Result};
use crate::models::RESOURCE_REGISTRY;
use kube::Client;
use kube::api::DynamicObject;
use kube::core::{GroupVersionKind, GroupVersionResource};
use kube::discovery::{ApiResource, Scope, oneshot::pinned_kind};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Resolved resource and scope for one kind
#[derive(Debug, Clone)]
pub struct Mapping {
    pub api_resource: ApiResource,
    pub namespaced: bool,
}

impl Mapping {
    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource::gvr(
            &self.api_resource.group,
            &self.api_resource.version,
            &self.api_resource.plural,
        )
    }
}

/// Discovery-backed GVK to GVR mapper, shared by clones
#[derive(Clone)]
pub struct RestMapper {
    client: Client,
    cache: Arc<RwLock<HashMap<GroupVersionKind, Mapping>>>,
}

impl RestMapper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: Arc::new(RwLock::new(builtin_mappings())),
        }
    }

    /// Mapping for `gvk`, discovering it on first use
    pub async fn mapping(&self, gvk: &GroupVersionKind) -> Result<Mapping> {
        if let Some(mapping) = self.cached(gvk) {
            return Ok(mapping);
        }

        debug!(
            group = %gvk.group,
            version = %gvk.version,
            kind = %gvk.kind,
            "discovering resource"
        );
        let (api_resource, caps) =
            pinned_kind(&self.client, gvk)
                .await
                .map_err(|source| Error::Discovery {
                    api_version: api_version_of(gvk),
                    kind: gvk.kind.clone(),
                    source,
                })?;
        let mapping = Mapping {
            api_resource,
            namespaced: matches!(caps.scope, Scope::Namespaced),
        };
        self.insert(gvk.clone(), mapping.clone());
        Ok(mapping)
    }

    pub async fn gvk_to_gvr(&self, gvk: &GroupVersionKind) -> Result<GroupVersionResource> {
        Ok(self.mapping(gvk).await?.gvr())
    }

    pub async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool> {
        Ok(self.mapping(gvk).await?.namespaced)
    }

    /// GVR of the object's kind
    pub async fn find_gvr(&self, obj: &DynamicObject) -> Result<GroupVersionResource> {
        let gvk = find_gvk(obj)?;
        self.gvk_to_gvr(&gvk).await
    }

    /// Seed or override a mapping, e.g. for a CRD created moments ago
    pub fn insert(&self, gvk: GroupVersionKind, mapping: Mapping) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gvk, mapping);
    }

    fn cached(&self, gvk: &GroupVersionKind) -> Option<Mapping> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(gvk)
            .cloned()
    }
}

impl std::fmt::Debug for RestMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("RestMapper")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

/// GVK from the object's apiVersion and kind
pub fn find_gvk(obj: &DynamicObject) -> Result<GroupVersionKind> {
    let types = obj.types.as_ref().ok_or(Error::MissingGvk)?;
    if types.api_version.is_empty() || types.kind.is_empty() {
        return Err(Error::MissingGvk);
    }
    Ok(gvk_from_api_version(&types.api_version, &types.kind))
}

/// Split `group/version` (or a bare core `version`) into a GVK
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    GroupVersionKind::gvk(group, version, kind)
}

fn api_version_of(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

fn builtin_mappings() -> HashMap<GroupVersionKind, Mapping> {
    RESOURCE_REGISTRY
        .iter()
        .map(|entry| {
            let gvk = entry.resource_kind.gvk();
            let mut api_resource = ApiResource::from_gvk_with_plural(&gvk, entry.plural);
            api_resource.api_version = entry.resource_kind.api_version();
            (
                gvk,
                Mapping {
                    api_resource,
                    namespaced: entry.namespaced,
                },
            )
        })
        .collect()
}
