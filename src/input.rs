//! Resource input normalization
//!
//! Every handler operation accepts the target object as a file path, raw
//! YAML/JSON bytes, a typed object or a generic JSON map. This module turns
//! any of those into the one representation the API call needs.

use crate::error::{Error, Result};
use kube::Resource;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// An object handed to create/update/apply/patch
#[derive(Debug, Clone)]
pub enum ResourceInput<K> {
    /// YAML or JSON manifest on disk
    File(PathBuf),
    /// YAML or JSON manifest in memory
    Bytes(Vec<u8>),
    Object(K),
    /// Unstructured object, e.g. built with `serde_json::json!`
    Map(Map<String, Value>),
}

/// An object handed to get/delete.
///
/// A plain string is a name and is never read as a file path; use a `Path`
/// to read a manifest from disk.
#[derive(Debug, Clone)]
pub enum Target<K> {
    Name(String),
    Input(ResourceInput<K>),
}

impl<K> From<&Path> for ResourceInput<K> {
    fn from(path: &Path) -> Self {
        ResourceInput::File(path.to_path_buf())
    }
}

impl<K> From<PathBuf> for ResourceInput<K> {
    fn from(path: PathBuf) -> Self {
        ResourceInput::File(path)
    }
}

impl<K> From<&PathBuf> for ResourceInput<K> {
    fn from(path: &PathBuf) -> Self {
        ResourceInput::File(path.clone())
    }
}

impl<K> From<Vec<u8>> for ResourceInput<K> {
    fn from(data: Vec<u8>) -> Self {
        ResourceInput::Bytes(data)
    }
}

impl<K> From<&[u8]> for ResourceInput<K> {
    fn from(data: &[u8]) -> Self {
        ResourceInput::Bytes(data.to_vec())
    }
}

impl<K> From<Map<String, Value>> for ResourceInput<K> {
    fn from(map: Map<String, Value>) -> Self {
        ResourceInput::Map(map)
    }
}

impl<K> From<&str> for Target<K> {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl<K> From<String> for Target<K> {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl<K> From<&String> for Target<K> {
    fn from(name: &String) -> Self {
        Target::Name(name.clone())
    }
}

impl<K> From<ResourceInput<K>> for Target<K> {
    fn from(input: ResourceInput<K>) -> Self {
        Target::Input(input)
    }
}

impl<K> From<&Path> for Target<K> {
    fn from(path: &Path) -> Self {
        Target::Input(path.into())
    }
}

impl<K> From<PathBuf> for Target<K> {
    fn from(path: PathBuf) -> Self {
        Target::Input(path.into())
    }
}

impl<K> From<Vec<u8>> for Target<K> {
    fn from(data: Vec<u8>) -> Self {
        Target::Input(data.into())
    }
}

impl<K> From<&[u8]> for Target<K> {
    fn from(data: &[u8]) -> Self {
        Target::Input(data.into())
    }
}

impl<K> From<Map<String, Value>> for Target<K> {
    fn from(map: Map<String, Value>) -> Self {
        Target::Input(map.into())
    }
}

impl<K> ResourceInput<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    /// Decode the input into `K`, rejecting manifests of another kind
    pub fn into_object(self) -> Result<K> {
        match self {
            ResourceInput::File(path) => decode(yaml_to_json(&read_file(&path)?)?),
            ResourceInput::Bytes(data) => decode(yaml_to_json(&data)?),
            ResourceInput::Object(obj) => Ok(obj),
            ResourceInput::Map(map) => decode(Value::Object(map)),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a single YAML (or JSON) document into a JSON value.
///
/// Empty input yields `Value::Null`.
pub fn yaml_to_json(data: &[u8]) -> Result<Value> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_slice(data)?)
}

/// Split a multi-document YAML stream, skipping empty documents
pub fn split_documents(data: &[u8]) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(data) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Decode a JSON value into `K` after checking its apiVersion/kind
pub fn decode<K>(value: Value) -> Result<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    check_kind::<K>(&value)?;
    Ok(serde_json::from_value(value)?)
}

fn check_kind<K>(value: &Value) -> Result<()>
where
    K: Resource<DynamicType = ()>,
{
    let expected_kind = K::kind(&());
    let expected_version = K::api_version(&());

    let kind = value.get("kind").and_then(Value::as_str);
    let api_version = value.get("apiVersion").and_then(Value::as_str);

    let kind_ok = kind.is_none_or(|k| k == expected_kind);
    let version_ok = api_version.is_none_or(|v| v == expected_version);
    if kind_ok && version_ok {
        return Ok(());
    }

    Err(Error::KindMismatch {
        expected: format!("{}/{}", expected_version, expected_kind),
        found: format!(
            "{}/{}",
            api_version.unwrap_or_default(),
            kind.unwrap_or_default()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use serde_json::json;

    #[test]
    fn test_yaml_to_json_accepts_json() {
        let value = yaml_to_json(br#"{"kind": "ConfigMap", "data": {"a": "1"}}"#).unwrap();
        assert_eq!(value["data"]["a"], "1");
    }

    #[test]
    fn test_yaml_to_json_empty() {
        assert!(yaml_to_json(b"  \n").unwrap().is_null());
    }

    #[test]
    fn test_split_documents_skips_empty() {
        let docs = split_documents(
            b"---\napiVersion: v1\nkind: ConfigMap\n---\n---\napiVersion: v1\nkind: Secret\n",
        )
        .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"], "Secret");
    }

    #[test]
    fn test_decode_rejects_other_kind() {
        let err = decode::<ConfigMap>(json!({"apiVersion": "v1", "kind": "Secret"})).unwrap_err();
        match err {
            Error::KindMismatch { expected, found } => {
                assert_eq!(expected, "v1/ConfigMap");
                assert_eq!(found, "v1/Secret");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_without_type_meta() {
        let cm: ConfigMap = decode(json!({"metadata": {"name": "bare"}})).unwrap();
        assert_eq!(cm.metadata.name.as_deref(), Some("bare"));
    }

    #[test]
    fn test_read_file_error_carries_path() {
        let err = read_file(Path::new("/nonexistent/cm.yaml")).unwrap_err();
        assert!(matches!(err, Error::ReadFile { ref path, .. } if path.ends_with("cm.yaml")));
    }
}
