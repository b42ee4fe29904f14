//! Unstructured handler
//!
//! [`DynamicHandler`] works on [`DynamicObject`]s of any kind, including
//! custom resources. The kind of each object is read from its
//! apiVersion/kind and resolved through the [`RestMapper`]; operations that
//! only get a name need [`DynamicHandler::with_gvk`] first.

mod manifest;
mod operations;

pub use manifest::manifest_objects;

use crate::error::{Error, Result};
use crate::handler::DEFAULT_NAMESPACE;
use crate::input::{read_file, yaml_to_json};
use crate::options::{HandlerOptions, SharedOptions};
use crate::restmapper::RestMapper;
use kube::Client;
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// An object handed to the dynamic handler
#[derive(Debug, Clone)]
pub enum DynamicInput {
    /// Object name; the kind comes from `with_gvk`
    Name(String),
    File(PathBuf),
    Bytes(Vec<u8>),
    Object(DynamicObject),
    Map(Map<String, Value>),
}

impl DynamicInput {
    /// Convert any serializable object, typed k8s-openapi structs included
    pub fn from_resource<T: Serialize>(obj: &T) -> Result<Self> {
        match serde_json::to_value(obj)? {
            Value::Object(map) => Ok(DynamicInput::Map(map)),
            _ => Err(Error::InvalidInput("object does not serialize to a map")),
        }
    }

    /// The object this input describes, or `None` for a bare name
    pub(crate) fn into_object(self) -> Result<Option<DynamicObject>> {
        let value = match self {
            DynamicInput::Name(_) => return Ok(None),
            DynamicInput::Object(obj) => return Ok(Some(obj)),
            DynamicInput::File(path) => yaml_to_json(&read_file(&path)?)?,
            DynamicInput::Bytes(data) => yaml_to_json(&data)?,
            DynamicInput::Map(map) => Value::Object(map),
        };
        if !value.is_object() {
            return Err(Error::InvalidInput("manifest is not an object"));
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Like `into_object`, but a name is an error
    pub(crate) fn require_object(self) -> Result<DynamicObject> {
        self.into_object()?
            .ok_or(Error::InvalidInput("expected an object, got a name"))
    }
}

impl From<&str> for DynamicInput {
    fn from(name: &str) -> Self {
        DynamicInput::Name(name.to_string())
    }
}

impl From<String> for DynamicInput {
    fn from(name: String) -> Self {
        DynamicInput::Name(name)
    }
}

impl From<&Path> for DynamicInput {
    fn from(path: &Path) -> Self {
        DynamicInput::File(path.to_path_buf())
    }
}

impl From<PathBuf> for DynamicInput {
    fn from(path: PathBuf) -> Self {
        DynamicInput::File(path)
    }
}

impl From<Vec<u8>> for DynamicInput {
    fn from(data: Vec<u8>) -> Self {
        DynamicInput::Bytes(data)
    }
}

impl From<&[u8]> for DynamicInput {
    fn from(data: &[u8]) -> Self {
        DynamicInput::Bytes(data.to_vec())
    }
}

impl From<DynamicObject> for DynamicInput {
    fn from(obj: DynamicObject) -> Self {
        DynamicInput::Object(obj)
    }
}

impl From<&DynamicObject> for DynamicInput {
    fn from(obj: &DynamicObject) -> Self {
        DynamicInput::Object(obj.clone())
    }
}

impl From<Map<String, Value>> for DynamicInput {
    fn from(map: Map<String, Value>) -> Self {
        DynamicInput::Map(map)
    }
}

/// Handler for objects of any kind
#[derive(Clone)]
pub struct DynamicHandler {
    client: Client,
    namespace: String,
    gvk: Option<GroupVersionKind>,
    mapper: RestMapper,
    options: SharedOptions,
}

impl std::fmt::Debug for DynamicHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicHandler")
            .field("namespace", &self.namespace)
            .field("gvk", &self.gvk)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DynamicHandler {
    pub fn new(client: Client, namespace: &str) -> Self {
        let mapper = RestMapper::new(client.clone());
        Self {
            client,
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace.to_string()
            },
            gvk: None,
            mapper,
            options: SharedOptions::default(),
        }
    }

    /// A copy that addresses objects by name as `gvk`
    pub fn with_gvk(&self, gvk: GroupVersionKind) -> Self {
        let mut copy = self.clone();
        copy.gvk = Some(gvk);
        copy
    }

    pub fn with_namespace(&self, namespace: &str) -> Self {
        let mut copy = self.clone();
        if !namespace.is_empty() {
            copy.namespace = namespace.to_string();
        } else {
            copy.namespace = DEFAULT_NAMESPACE.to_string();
        }
        copy
    }

    pub fn with_dry_run(&self) -> Self {
        let copy = self.clone();
        copy.options.update(HandlerOptions::enable_dry_run);
        copy
    }

    pub fn set_timeout(&self, seconds: u32) {
        self.options.update(|o| o.set_timeout(seconds));
    }

    pub fn set_limit(&self, limit: u32) {
        self.options.update(|o| o.set_limit(limit));
    }

    pub fn set_force_delete(&self, force: bool) {
        self.options.update(|o| o.set_force_delete(force));
    }

    pub fn set_propagation_policy(&self, policy: &str) {
        self.options.update(|o| o.set_propagation_policy(policy));
    }

    pub fn set_field_manager(&self, manager: &str) {
        self.options.update(|o| o.set_field_manager(manager));
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn gvk(&self) -> Option<&GroupVersionKind> {
        self.gvk.as_ref()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn mapper(&self) -> &RestMapper {
        &self.mapper
    }

    pub fn options(&self) -> HandlerOptions {
        self.options.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    #[test]
    fn test_string_is_a_name() {
        assert!(matches!(DynamicInput::from("web"), DynamicInput::Name(n) if n == "web"));
        assert!(DynamicInput::from("web").into_object().unwrap().is_none());
        assert!(matches!(
            DynamicInput::from("web").require_object(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bytes_decode_to_dynamic_object() {
        let input = DynamicInput::from(
            &b"apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: w1\nspec:\n  size: 3\n"
                [..],
        );
        let obj = input.require_object().unwrap();
        let types = obj.types.unwrap();
        assert_eq!(types.api_version, "example.com/v1");
        assert_eq!(types.kind, "Widget");
        assert_eq!(obj.metadata.name.as_deref(), Some("w1"));
        assert_eq!(obj.data["spec"]["size"], 3);
    }

    #[test]
    fn test_scalar_manifest_rejected() {
        let input = DynamicInput::from(&b"just a string"[..]);
        assert!(matches!(input.require_object(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_from_resource_keeps_type_meta() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let obj = DynamicInput::from_resource(&cm)
            .unwrap()
            .require_object()
            .unwrap();
        let types = obj.types.unwrap();
        assert_eq!(types.api_version, "v1");
        assert_eq!(types.kind, "ConfigMap");
    }
}
