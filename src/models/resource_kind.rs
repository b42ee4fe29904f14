//! Resource kind definitions
//!
//! A centralized enum for every kind with a typed handler, so the rest of the
//! crate never matches on bare kind strings.

use kube::core::GroupVersionKind;
use std::fmt;
use std::str::FromStr;

/// Enumeration of all kinds with a typed handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    // apps/v1
    Deployment,
    DaemonSet,
    // batch/v1
    Job,
    CronJob,
    // core/v1
    Namespace,
    ConfigMap,
    PersistentVolume,
    PersistentVolumeClaim,
    Service,
    Node,
    ServiceAccount,
    // rbac.authorization.k8s.io/v1
    RoleBinding,
    ClusterRole,
    // networking.k8s.io/v1
    Ingress,
}

impl ResourceKind {
    /// Get the kind name as it appears in manifests
    pub fn as_str(&self) -> &'static str {
        self.entry().kind
    }

    /// API group, empty for the core group
    pub fn group(&self) -> &'static str {
        self.entry().group
    }

    pub fn version(&self) -> &'static str {
        self.entry().version
    }

    /// Lowercase plural used in REST paths
    pub fn plural(&self) -> &'static str {
        self.entry().plural
    }

    pub fn is_namespaced(&self) -> bool {
        self.entry().namespaced
    }

    /// Command aliases accepted on the command line
    pub fn aliases(&self) -> &'static [&'static str] {
        self.entry().command_aliases
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        let entry = self.entry();
        if entry.group.is_empty() {
            entry.version.to_string()
        } else {
            format!("{}/{}", entry.group, entry.version)
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        let entry = self.entry();
        GroupVersionKind::gvk(entry.group, entry.version, entry.kind)
    }

    /// Get all kinds
    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Deployment,
            ResourceKind::DaemonSet,
            ResourceKind::Job,
            ResourceKind::CronJob,
            ResourceKind::Namespace,
            ResourceKind::ConfigMap,
            ResourceKind::PersistentVolume,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::Service,
            ResourceKind::Node,
            ResourceKind::ServiceAccount,
            ResourceKind::RoleBinding,
            ResourceKind::ClusterRole,
            ResourceKind::Ingress,
        ]
    }

    /// Resolve a kind name or command alias, case-insensitively
    pub fn from_alias(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        RESOURCE_REGISTRY
            .iter()
            .find(|entry| {
                entry.kind.eq_ignore_ascii_case(&lower)
                    || entry.command_aliases.iter().any(|&alias| alias == lower)
            })
            .map(|entry| entry.resource_kind)
    }

    fn entry(&self) -> &'static ResourceEntry {
        RESOURCE_REGISTRY
            .iter()
            .find(|entry| entry.resource_kind == *self)
            .unwrap_or_else(|| unreachable!("{:?} missing from RESOURCE_REGISTRY", self))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

/// Registry entry for a resource kind
pub struct ResourceEntry {
    pub resource_kind: ResourceKind,
    pub kind: &'static str,
    pub group: &'static str,
    pub version: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
    pub command_aliases: &'static [&'static str],
}

/// Registry of all kinds with a typed handler
///
/// To add a new kind:
/// 1. Add a variant to [`ResourceKind`] and an entry here
/// 2. Add the `impl_managed!` line in src/handler/resource.rs
/// 3. Add the arm to `with_typed_handler!` in src/cli/commands.rs
pub const RESOURCE_REGISTRY: &[ResourceEntry] = &[
    ResourceEntry {
        resource_kind: ResourceKind::Deployment,
        kind: "Deployment",
        group: "apps",
        version: "v1",
        plural: "deployments",
        namespaced: true,
        command_aliases: &["deployment", "deployments", "deploy"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::DaemonSet,
        kind: "DaemonSet",
        group: "apps",
        version: "v1",
        plural: "daemonsets",
        namespaced: true,
        command_aliases: &["daemonset", "daemonsets", "ds"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::Job,
        kind: "Job",
        group: "batch",
        version: "v1",
        plural: "jobs",
        namespaced: true,
        command_aliases: &["job", "jobs"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::CronJob,
        kind: "CronJob",
        group: "batch",
        version: "v1",
        plural: "cronjobs",
        namespaced: true,
        command_aliases: &["cronjob", "cronjobs", "cj"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::Namespace,
        kind: "Namespace",
        group: "",
        version: "v1",
        plural: "namespaces",
        namespaced: false,
        command_aliases: &["namespace", "namespaces", "ns"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::ConfigMap,
        kind: "ConfigMap",
        group: "",
        version: "v1",
        plural: "configmaps",
        namespaced: true,
        command_aliases: &["configmap", "configmaps", "cm"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::PersistentVolume,
        kind: "PersistentVolume",
        group: "",
        version: "v1",
        plural: "persistentvolumes",
        namespaced: false,
        command_aliases: &["persistentvolume", "persistentvolumes", "pv"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::PersistentVolumeClaim,
        kind: "PersistentVolumeClaim",
        group: "",
        version: "v1",
        plural: "persistentvolumeclaims",
        namespaced: true,
        command_aliases: &["persistentvolumeclaim", "persistentvolumeclaims", "pvc"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::Service,
        kind: "Service",
        group: "",
        version: "v1",
        plural: "services",
        namespaced: true,
        command_aliases: &["service", "services", "svc"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::Node,
        kind: "Node",
        group: "",
        version: "v1",
        plural: "nodes",
        namespaced: false,
        command_aliases: &["node", "nodes", "no"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::ServiceAccount,
        kind: "ServiceAccount",
        group: "",
        version: "v1",
        plural: "serviceaccounts",
        namespaced: true,
        command_aliases: &["serviceaccount", "serviceaccounts", "sa"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::RoleBinding,
        kind: "RoleBinding",
        group: "rbac.authorization.k8s.io",
        version: "v1",
        plural: "rolebindings",
        namespaced: true,
        command_aliases: &["rolebinding", "rolebindings", "rb"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::ClusterRole,
        kind: "ClusterRole",
        group: "rbac.authorization.k8s.io",
        version: "v1",
        plural: "clusterroles",
        namespaced: false,
        command_aliases: &["clusterrole", "clusterroles", "cr"],
    },
    ResourceEntry {
        resource_kind: ResourceKind::Ingress,
        kind: "Ingress",
        group: "networking.k8s.io",
        version: "v1",
        plural: "ingresses",
        namespaced: true,
        command_aliases: &["ingress", "ingresses", "ing"],
    },
];

/// Get all kinds with their command aliases, for help text
pub fn get_all_commands() -> Vec<(&'static str, &'static [&'static str])> {
    RESOURCE_REGISTRY
        .iter()
        .map(|e| (e.kind, e.command_aliases))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(ResourceKind::Deployment.as_str(), "Deployment");
        assert_eq!(
            ResourceKind::PersistentVolumeClaim.as_str(),
            "PersistentVolumeClaim"
        );
    }

    #[test]
    fn test_from_alias() {
        assert_eq!(
            ResourceKind::from_alias("deploy"),
            Some(ResourceKind::Deployment)
        );
        assert_eq!(
            ResourceKind::from_alias("Deployment"),
            Some(ResourceKind::Deployment)
        );
        assert_eq!(
            ResourceKind::from_alias("PVC"),
            Some(ResourceKind::PersistentVolumeClaim)
        );
        assert_eq!(ResourceKind::from_alias("pods"), None);
    }

    #[test]
    fn test_api_version() {
        assert_eq!(ResourceKind::ConfigMap.api_version(), "v1");
        assert_eq!(ResourceKind::CronJob.api_version(), "batch/v1");
        assert_eq!(
            ResourceKind::ClusterRole.api_version(),
            "rbac.authorization.k8s.io/v1"
        );
    }

    #[test]
    fn test_every_kind_has_an_entry() {
        for kind in ResourceKind::all() {
            // entry() panics when a variant is missing from the registry
            assert!(!kind.plural().is_empty());
        }
        assert_eq!(ResourceKind::all().len(), RESOURCE_REGISTRY.len());
    }

    #[test]
    fn test_cluster_scoped_kinds() {
        let cluster: Vec<_> = ResourceKind::all()
            .iter()
            .filter(|k| !k.is_namespaced())
            .map(|k| k.as_str())
            .collect();
        assert_eq!(
            cluster,
            vec!["Namespace", "PersistentVolume", "Node", "ClusterRole"]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ResourceKind::Ingress), "Ingress");
        let s: String = ResourceKind::Job.into();
        assert_eq!(s, "Job");
    }
}
