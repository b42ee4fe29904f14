//! Resource subcommand handlers

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use k8s_handler::dynamic::manifest_objects;
use k8s_handler::{DynamicHandler, Handler, ManagedResource, PatchType, ResourceKind};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, RoleBinding};
use kube::api::DynamicObject;
use kube::{Client, ResourceExt};
use serde::Serialize;
use std::path::PathBuf;

/// Resource subcommands
#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    /// Create or update every object in a manifest
    Apply {
        #[arg(short = 'f', long = "filename")]
        file: PathBuf,
    },
    /// Create every object in a manifest
    Create {
        #[arg(short = 'f', long = "filename")]
        file: PathBuf,
    },
    /// Delete the objects in a manifest, or one object by kind and name
    Delete {
        #[arg(short = 'f', long = "filename", conflicts_with_all = ["kind", "name"])]
        file: Option<PathBuf>,
        kind: Option<ResourceKind>,
        name: Option<String>,
    },
    /// Print one object as YAML
    Get { kind: ResourceKind, name: String },
    /// Print every object of a kind as YAML
    List {
        kind: ResourceKind,
        /// Label selector (e.g., "app=nginx")
        #[arg(short = 'l', long, default_value = "")]
        selector: String,
        /// List across all namespaces
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },
    /// Print add/modify/delete events until interrupted
    Watch {
        kind: ResourceKind,
        name: Option<String>,
        #[arg(short = 'l', long, conflicts_with = "name")]
        selector: Option<String>,
    },
    /// Patch one object with a patch document
    Patch {
        kind: ResourceKind,
        name: String,
        #[arg(short = 'f', long = "filename")]
        file: PathBuf,
        /// strategic, merge or json
        #[arg(long = "type", default_value = "strategic")]
        patch_type: PatchType,
    },
    /// List the kinds with a typed handler
    Kinds,
}

/// Connection and request settings shared by every command
pub struct Session {
    pub client: Client,
    pub namespace: String,
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

impl Session {
    fn handler<K: ManagedResource>(&self) -> Handler<K> {
        let handler = Handler::new(self.client.clone(), &self.namespace);
        if let Some(manager) = &self.field_manager {
            handler.set_field_manager(manager);
        }
        if self.dry_run {
            handler.with_dry_run()
        } else {
            handler
        }
    }

    fn dynamic(&self) -> DynamicHandler {
        let handler = DynamicHandler::new(self.client.clone(), &self.namespace);
        if let Some(manager) = &self.field_manager {
            handler.set_field_manager(manager);
        }
        if self.dry_run {
            handler.with_dry_run()
        } else {
            handler
        }
    }
}

/// Run `$body` with `$handler` bound to the typed handler for `$kind`
macro_rules! with_typed_handler {
    ($session:expr, $kind:expr, |$handler:ident| $body:expr) => {
        match $kind {
            ResourceKind::Deployment => {
                let $handler = $session.handler::<Deployment>();
                $body
            }
            ResourceKind::DaemonSet => {
                let $handler = $session.handler::<DaemonSet>();
                $body
            }
            ResourceKind::Job => {
                let $handler = $session.handler::<Job>();
                $body
            }
            ResourceKind::CronJob => {
                let $handler = $session.handler::<CronJob>();
                $body
            }
            ResourceKind::Namespace => {
                let $handler = $session.handler::<Namespace>();
                $body
            }
            ResourceKind::ConfigMap => {
                let $handler = $session.handler::<ConfigMap>();
                $body
            }
            ResourceKind::PersistentVolume => {
                let $handler = $session.handler::<PersistentVolume>();
                $body
            }
            ResourceKind::PersistentVolumeClaim => {
                let $handler = $session.handler::<PersistentVolumeClaim>();
                $body
            }
            ResourceKind::Service => {
                let $handler = $session.handler::<Service>();
                $body
            }
            ResourceKind::Node => {
                let $handler = $session.handler::<Node>();
                $body
            }
            ResourceKind::ServiceAccount => {
                let $handler = $session.handler::<ServiceAccount>();
                $body
            }
            ResourceKind::RoleBinding => {
                let $handler = $session.handler::<RoleBinding>();
                $body
            }
            ResourceKind::ClusterRole => {
                let $handler = $session.handler::<ClusterRole>();
                $body
            }
            ResourceKind::Ingress => {
                let $handler = $session.handler::<Ingress>();
                $body
            }
        }
    };
}

/// Handle resource subcommands
pub async fn handle_command(session: &Session, cmd: ResourceCommand) -> Result<()> {
    match cmd {
        ResourceCommand::Apply { file } => {
            let applied = session
                .dynamic()
                .apply_manifest_file(&file)
                .await
                .with_context(|| format!("Failed to apply {}", file.display()))?;
            for obj in &applied {
                println!("{} applied", describe(obj));
            }
        }
        ResourceCommand::Create { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let handler = session.dynamic();
            for obj in manifest_objects(&data)? {
                let label = describe(&obj);
                handler
                    .create(obj)
                    .await
                    .with_context(|| format!("Failed to create {}", label))?;
                println!("{} created", label);
            }
        }
        ResourceCommand::Delete { file, kind, name } => match (file, kind, name) {
            (Some(file), _, _) => {
                session
                    .dynamic()
                    .delete_manifest_file(&file)
                    .await
                    .with_context(|| format!("Failed to delete {}", file.display()))?;
                println!("{} deleted", file.display());
            }
            (None, Some(kind), Some(name)) => {
                with_typed_handler!(session, kind, |handler| delete(handler, &name).await)?;
                println!("{}/{} deleted", kind, name);
            }
            _ => bail!("delete needs -f <file> or <kind> <name>"),
        },
        ResourceCommand::Get { kind, name } => {
            with_typed_handler!(session, kind, |handler| get(handler, &name).await)?;
        }
        ResourceCommand::List {
            kind,
            selector,
            all_namespaces,
        } => {
            with_typed_handler!(session, kind, |handler| {
                list(handler, &selector, all_namespaces).await
            })?;
        }
        ResourceCommand::Watch {
            kind,
            name,
            selector,
        } => {
            with_typed_handler!(session, kind, |handler| {
                watch(handler, name.as_deref(), selector.as_deref().unwrap_or("")).await
            })?;
        }
        ResourceCommand::Patch {
            kind,
            name,
            file,
            patch_type,
        } => {
            with_typed_handler!(session, kind, |handler| {
                patch(handler, &name, file.clone(), patch_type).await
            })?;
        }
        ResourceCommand::Kinds => display_kinds(),
    }

    Ok(())
}

async fn delete<K: ManagedResource>(handler: Handler<K>, name: &str) -> Result<()> {
    handler
        .delete(name)
        .await
        .with_context(|| format!("Failed to delete {}/{}", K::KIND, name))
}

async fn get<K: ManagedResource>(handler: Handler<K>, name: &str) -> Result<()> {
    let obj = handler
        .get(name)
        .await
        .with_context(|| format!("Failed to get {}/{}", K::KIND, name))?;
    print_yaml(&obj)
}

async fn list<K: ManagedResource>(
    handler: Handler<K>,
    selector: &str,
    all_namespaces: bool,
) -> Result<()> {
    let items = if all_namespaces {
        handler.list_all().await
    } else {
        handler.list(selector).await
    }
    .with_context(|| format!("Failed to list {}", K::KIND))?;

    for (i, obj) in items.iter().enumerate() {
        if i > 0 {
            println!("---");
        }
        print_yaml(obj)?;
    }
    Ok(())
}

async fn watch<K: ManagedResource>(
    handler: Handler<K>,
    name: Option<&str>,
    selector: &str,
) -> Result<()> {
    let callbacks = (
        |obj: &K| print_event("ADDED", obj),
        |obj: &K| print_event("MODIFIED", obj),
        |obj: &K| print_event("DELETED", obj),
    );
    match name {
        Some(name) => handler.watch_by_name(name, callbacks).await,
        None => handler.watch_by_label(selector, callbacks).await,
    }
    .with_context(|| format!("Failed to watch {}", K::KIND))
}

async fn patch<K: ManagedResource>(
    handler: Handler<K>,
    name: &str,
    file: PathBuf,
    patch_type: PatchType,
) -> Result<()> {
    let original = handler
        .get(name)
        .await
        .with_context(|| format!("Failed to get {}/{}", K::KIND, name))?;
    let patched = handler
        .patch(&original, file, patch_type)
        .await
        .with_context(|| format!("Failed to patch {}/{}", K::KIND, name))?;
    print_yaml(&patched)
}

fn print_yaml<T: Serialize>(obj: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(obj).context("Failed to serialize object")?;
    print!("{}", yaml);
    Ok(())
}

fn print_event<K: ManagedResource>(event: &str, obj: &K) {
    match obj.namespace() {
        Some(ns) => println!("{:<9} {}/{} -n {}", event, K::KIND, obj.name_any(), ns),
        None => println!("{:<9} {}/{}", event, K::KIND, obj.name_any()),
    }
}

fn describe(obj: &DynamicObject) -> String {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("?");
    format!("{}/{}", kind, obj.name_any())
}

/// Print the kind registry
pub fn display_kinds() {
    println!(
        "{:<24} {:<32} {:<11} ALIASES",
        "KIND", "APIVERSION", "NAMESPACED"
    );
    for kind in ResourceKind::all() {
        println!(
            "{:<24} {:<32} {:<11} {}",
            kind.as_str(),
            kind.api_version(),
            kind.is_namespaced(),
            kind.aliases().join(",")
        );
    }
}
