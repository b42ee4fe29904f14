//! Kinds with a typed handler
//!
//! Each kind gets a [`ManagedResource`] impl through `impl_managed!`, which also
//! lets the typed object be passed straight to handler operations.
//!
//! ## Adding a New Kind
//!
//! 1. Add the variant and registry entry in `src/models/resource_kind.rs`
//! 2. Add an `impl_managed!` line below, `namespaced` or `cluster`
//! 3. Add a `XxxHandler` alias at the bottom of this file

use crate::input::{ResourceInput, Target};
use crate::models::ResourceKind;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, RoleBinding};
use kube::api::PropagationPolicy;
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Handler;

/// A typed Kubernetes object a [`Handler`] can manage
pub trait ManagedResource:
    Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: ResourceKind;

    /// Api scoped to `namespace`; cluster-scoped kinds ignore it
    fn api(client: Client, namespace: &str) -> Api<Self>;

    /// Propagation policy forced on every delete of this kind.
    ///
    /// Jobs and CronJobs would otherwise orphan their pods.
    fn delete_propagation() -> Option<PropagationPolicy> {
        match Self::KIND {
            ResourceKind::Job | ResourceKind::CronJob => Some(PropagationPolicy::Background),
            _ => None,
        }
    }
}

macro_rules! impl_managed {
    (@input $type:ty) => {
        impl From<$type> for ResourceInput<$type> {
            fn from(obj: $type) -> Self {
                ResourceInput::Object(obj)
            }
        }

        impl From<&$type> for ResourceInput<$type> {
            fn from(obj: &$type) -> Self {
                ResourceInput::Object(obj.clone())
            }
        }

        impl From<$type> for Target<$type> {
            fn from(obj: $type) -> Self {
                Target::Input(ResourceInput::Object(obj))
            }
        }

        impl From<&$type> for Target<$type> {
            fn from(obj: &$type) -> Self {
                Target::Input(ResourceInput::Object(obj.clone()))
            }
        }
    };
    ($type:ty, $kind:expr, namespaced) => {
        impl ManagedResource for $type {
            const KIND: ResourceKind = $kind;

            fn api(client: Client, namespace: &str) -> Api<Self> {
                Api::namespaced(client, namespace)
            }
        }
        impl_managed!(@input $type);
    };
    ($type:ty, $kind:expr, cluster) => {
        impl ManagedResource for $type {
            const KIND: ResourceKind = $kind;

            fn api(client: Client, _namespace: &str) -> Api<Self> {
                Api::all(client)
            }
        }
        impl_managed!(@input $type);
    };
}

// apps/v1
impl_managed!(Deployment, ResourceKind::Deployment, namespaced);
impl_managed!(DaemonSet, ResourceKind::DaemonSet, namespaced);

// batch/v1
impl_managed!(Job, ResourceKind::Job, namespaced);
impl_managed!(CronJob, ResourceKind::CronJob, namespaced);

// core/v1
impl_managed!(Namespace, ResourceKind::Namespace, cluster);
impl_managed!(ConfigMap, ResourceKind::ConfigMap, namespaced);
impl_managed!(PersistentVolume, ResourceKind::PersistentVolume, cluster);
impl_managed!(
    PersistentVolumeClaim,
    ResourceKind::PersistentVolumeClaim,
    namespaced
);
impl_managed!(Service, ResourceKind::Service, namespaced);
impl_managed!(Node, ResourceKind::Node, cluster);
impl_managed!(ServiceAccount, ResourceKind::ServiceAccount, namespaced);

// rbac.authorization.k8s.io/v1
impl_managed!(RoleBinding, ResourceKind::RoleBinding, namespaced);
impl_managed!(ClusterRole, ResourceKind::ClusterRole, cluster);

// networking.k8s.io/v1
impl_managed!(Ingress, ResourceKind::Ingress, namespaced);

pub type DeploymentHandler = Handler<Deployment>;
pub type DaemonSetHandler = Handler<DaemonSet>;
pub type JobHandler = Handler<Job>;
pub type CronJobHandler = Handler<CronJob>;
pub type NamespaceHandler = Handler<Namespace>;
pub type ConfigMapHandler = Handler<ConfigMap>;
pub type PersistentVolumeHandler = Handler<PersistentVolume>;
pub type PersistentVolumeClaimHandler = Handler<PersistentVolumeClaim>;
pub type ServiceHandler = Handler<Service>;
pub type NodeHandler = Handler<Node>;
pub type ServiceAccountHandler = Handler<ServiceAccount>;
pub type RoleBindingHandler = Handler<RoleBinding>;
pub type ClusterRoleHandler = Handler<ClusterRole>;
pub type IngressHandler = Handler<Ingress>;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_kind_matches<K: ManagedResource>() {
        assert_eq!(K::kind(&()), K::KIND.as_str());
        assert_eq!(K::api_version(&()), K::KIND.api_version());
        assert_eq!(K::plural(&()), K::KIND.plural());
    }

    #[test]
    fn test_registry_matches_openapi_metadata() {
        assert_kind_matches::<Deployment>();
        assert_kind_matches::<DaemonSet>();
        assert_kind_matches::<Job>();
        assert_kind_matches::<CronJob>();
        assert_kind_matches::<Namespace>();
        assert_kind_matches::<ConfigMap>();
        assert_kind_matches::<PersistentVolume>();
        assert_kind_matches::<PersistentVolumeClaim>();
        assert_kind_matches::<Service>();
        assert_kind_matches::<Node>();
        assert_kind_matches::<ServiceAccount>();
        assert_kind_matches::<RoleBinding>();
        assert_kind_matches::<ClusterRole>();
        assert_kind_matches::<Ingress>();
    }

    #[test]
    fn test_delete_propagation() {
        assert!(matches!(
            Job::delete_propagation(),
            Some(PropagationPolicy::Background)
        ));
        assert!(matches!(
            CronJob::delete_propagation(),
            Some(PropagationPolicy::Background)
        ));
        assert!(Deployment::delete_propagation().is_none());
    }
}
