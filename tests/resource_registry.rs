//! Resource registry tests
//!
//! Command aliases and kind metadata the CLI and REST mapper rely on.

use k8s_handler::models::RESOURCE_REGISTRY;
use k8s_handler::{ResourceKind, get_all_commands};

#[test]
fn test_get_all_commands() {
    let commands = get_all_commands();
    assert_eq!(commands.len(), ResourceKind::all().len());

    for kind in ["Deployment", "CronJob", "PersistentVolumeClaim", "Ingress"] {
        assert!(
            commands.iter().any(|(name, _)| *name == kind),
            "{} should be in command registry",
            kind
        );
    }
}

#[test]
fn test_every_alias_resolves_to_its_kind() {
    for entry in RESOURCE_REGISTRY {
        for alias in entry.command_aliases {
            assert_eq!(
                ResourceKind::from_alias(alias),
                Some(entry.resource_kind),
                "alias {} should resolve to {}",
                alias,
                entry.kind
            );
        }
    }
}

#[test]
fn test_aliases_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for (_, aliases) in get_all_commands() {
        for alias in aliases {
            assert!(seen.insert(*alias), "duplicate alias {}", alias);
        }
    }
}

#[test]
fn test_kind_parses_from_cli_argument() {
    assert_eq!("deploy".parse::<ResourceKind>(), Ok(ResourceKind::Deployment));
    assert_eq!("SA".parse::<ResourceKind>(), Ok(ResourceKind::ServiceAccount));
    assert!("pod".parse::<ResourceKind>().is_err());
}

#[test]
fn test_gvk() {
    let gvk = ResourceKind::RoleBinding.gvk();
    assert_eq!(gvk.group, "rbac.authorization.k8s.io");
    assert_eq!(gvk.version, "v1");
    assert_eq!(gvk.kind, "RoleBinding");
}
