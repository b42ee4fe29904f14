//! Patch construction
//!
//! Raw patch documents are submitted as-is with the requested semantics.
//! Structured input is treated as the desired object: the difference from
//! the original is computed here and submitted instead.
//!
//! A strategic diff that touches a list is sent as a merge patch. Strategic
//! merge folds keyed lists (containers, env, ports) into the live list, so
//! items dropped from the desired object would otherwise survive.

use crate::error::{Error, Result};
use kube::api::Patch;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Patch semantics understood by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchType {
    /// `application/strategic-merge-patch+json`, built-in kinds only
    #[default]
    Strategic,
    /// `application/merge-patch+json` (RFC 7386)
    Merge,
    /// `application/json-patch+json` (RFC 6902)
    Json,
}

impl PatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchType::Strategic => "strategic",
            PatchType::Merge => "merge",
            PatchType::Json => "json",
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strategic" | "strategic-merge" | "strategicmergepatch" => Ok(PatchType::Strategic),
            "merge" | "json-merge" | "mergepatch" => Ok(PatchType::Merge),
            "json" | "json-patch" | "jsonpatch" => Ok(PatchType::Json),
            _ => Err(format!("Unknown patch type: {}", s)),
        }
    }
}

/// Compute the RFC 7386 merge patch that turns `original` into `modified`.
///
/// Keys missing from `modified` become `null`; nested objects are diffed
/// recursively; everything else (including arrays) is replaced wholesale.
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(orig), Value::Object(modi)) => Value::Object(diff_objects(orig, modi)),
        _ => modified.clone(),
    }
}

fn diff_objects(
    original: &Map<String, Value>,
    modified: &Map<String, Value>,
) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in original.keys() {
        if !modified.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, new) in modified {
        match original.get(key) {
            Some(old) if old == new => {}
            Some(Value::Object(old)) if new.is_object() => {
                if let Value::Object(new) = new {
                    patch.insert(key.clone(), Value::Object(diff_objects(old, new)));
                }
            }
            _ => {
                patch.insert(key.clone(), new.clone());
            }
        }
    }

    patch
}

/// True for patches the API server would treat as a no-op
pub fn is_empty_patch(patch: &Value) -> bool {
    match patch {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(ops) => ops.is_empty(),
        _ => false,
    }
}

/// Wrap a raw patch document. `None` means there is nothing to send.
pub fn raw_patch(patch: Value, patch_type: PatchType) -> Result<Option<Patch<Value>>> {
    if is_empty_patch(&patch) {
        return Ok(None);
    }
    let patch = match patch_type {
        PatchType::Strategic => Patch::Strategic(patch),
        PatchType::Merge => Patch::Merge(patch),
        PatchType::Json => {
            if !patch.is_array() {
                return Err(Error::InvalidPatch(
                    "a JSON patch must be an array of operations".to_string(),
                ));
            }
            Patch::Json(serde_json::from_value::<json_patch::Patch>(patch)?)
        }
    };
    Ok(Some(patch))
}

/// Diff `original` against `modified` and wrap the result.
/// `None` means the two objects are identical.
pub fn diff_patch(
    original: &Value,
    modified: &Value,
    patch_type: PatchType,
) -> Result<Option<Patch<Value>>> {
    match patch_type {
        PatchType::Json => {
            let ops = json_patch::diff(original, modified);
            if ops.0.is_empty() {
                return Ok(None);
            }
            Ok(Some(Patch::Json(ops)))
        }
        PatchType::Merge => raw_patch(create_merge_patch(original, modified), PatchType::Merge),
        PatchType::Strategic => {
            let patch = create_merge_patch(original, modified);
            if contains_array(&patch) {
                raw_patch(patch, PatchType::Merge)
            } else {
                raw_patch(patch, PatchType::Strategic)
            }
        }
    }
}

fn contains_array(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.values().any(contains_array),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_removed_key_is_null() {
        let patch = create_merge_patch(
            &json!({"data": {"a": "1", "b": "2"}}),
            &json!({"data": {"a": "1"}}),
        );
        assert_eq!(patch, json!({"data": {"b": null}}));
    }

    #[test]
    fn test_merge_patch_replaces_arrays() {
        let patch = create_merge_patch(
            &json!({"spec": {"ports": [80], "type": "ClusterIP"}}),
            &json!({"spec": {"ports": [80, 443], "type": "ClusterIP"}}),
        );
        assert_eq!(patch, json!({"spec": {"ports": [80, 443]}}));
    }

    #[test]
    fn test_merge_patch_identical_is_empty() {
        let obj = json!({"metadata": {"name": "a", "labels": {"x": "y"}}});
        assert!(is_empty_patch(&create_merge_patch(&obj, &obj)));
    }

    #[test]
    fn test_merge_patch_type_change() {
        let patch = create_merge_patch(&json!({"a": {"b": 1}}), &json!({"a": "flat"}));
        assert_eq!(patch, json!({"a": "flat"}));
    }

    #[test]
    fn test_patch_type_from_str() {
        assert_eq!("Strategic".parse::<PatchType>(), Ok(PatchType::Strategic));
        assert_eq!("json-merge".parse::<PatchType>(), Ok(PatchType::Merge));
        assert_eq!("JSONPatch".parse::<PatchType>(), Ok(PatchType::Json));
        assert!("apply".parse::<PatchType>().is_err());
        assert_eq!(PatchType::default(), PatchType::Strategic);
    }

    #[test]
    fn test_raw_patch_empty_object_is_noop() {
        assert!(raw_patch(json!({}), PatchType::Strategic).unwrap().is_none());
        assert!(raw_patch(Value::Null, PatchType::Merge).unwrap().is_none());
    }

    #[test]
    fn test_raw_json_patch_requires_array() {
        let err = raw_patch(json!({"op": "add"}), PatchType::Json).unwrap_err();
        assert!(matches!(err, Error::InvalidPatch(_)));
    }

    #[test]
    fn test_raw_json_patch_parses_operations() {
        let patch = raw_patch(
            json!([{"op": "replace", "path": "/spec/replicas", "value": 3}]),
            PatchType::Json,
        )
        .unwrap()
        .unwrap();
        match patch {
            Patch::Json(ops) => assert_eq!(ops.0.len(), 1),
            other => panic!("unexpected patch: {other:?}"),
        }
    }

    #[test]
    fn test_strategic_diff_removing_sidecar_replaces_list() {
        let original = json!({"spec": {"template": {"spec": {"containers": [
            {"name": "app", "image": "app:1"},
            {"name": "sidecar", "image": "proxy:1"},
        ]}}}});
        let modified = json!({"spec": {"template": {"spec": {"containers": [
            {"name": "app", "image": "app:1"},
        ]}}}});

        match diff_patch(&original, &modified, PatchType::Strategic).unwrap() {
            Some(Patch::Merge(body)) => assert_eq!(
                body,
                json!({"spec": {"template": {"spec": {"containers": [
                    {"name": "app", "image": "app:1"},
                ]}}}})
            ),
            other => panic!("unexpected patch: {other:?}"),
        }
    }

    #[test]
    fn test_strategic_diff_without_lists_stays_strategic() {
        let original = json!({"metadata": {"labels": {"tier": "web"}}, "spec": {"ports": [80]}});
        let modified = json!({"metadata": {"labels": {"tier": "api"}}, "spec": {"ports": [80]}});
        assert!(matches!(
            diff_patch(&original, &modified, PatchType::Strategic).unwrap(),
            Some(Patch::Strategic(_))
        ));
    }

    #[test]
    fn test_diff_patch_selects_semantics() {
        let original = json!({"spec": {"replicas": 1}});
        let modified = json!({"spec": {"replicas": 2}});

        assert!(matches!(
            diff_patch(&original, &modified, PatchType::Strategic).unwrap(),
            Some(Patch::Strategic(_))
        ));
        assert!(matches!(
            diff_patch(&original, &modified, PatchType::Merge).unwrap(),
            Some(Patch::Merge(_))
        ));
        assert!(matches!(
            diff_patch(&original, &modified, PatchType::Json).unwrap(),
            Some(Patch::Json(_))
        ));
        assert!(
            diff_patch(&original, &original, PatchType::Json)
                .unwrap()
                .is_none()
        );
    }
}
