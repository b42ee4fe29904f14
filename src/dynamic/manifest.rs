//! Multi-document manifests
//!
//! Every document of a YAML stream is handled as its own object, so one
//! file can carry a namespace, a CRD and the objects that live in it.
//! Apply goes front to back; delete goes back to front so dependents are
//! removed before what they live in.

use super::DynamicHandler;
use crate::error::{Error, Result};
use crate::input::{read_file, split_documents};
use kube::api::DynamicObject;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Decode every object in a YAML stream, flattening `kind: List` documents
pub fn manifest_objects(data: &[u8]) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for document in split_documents(data)? {
        flatten(document, &mut objects)?;
    }
    Ok(objects)
}

fn flatten(document: Value, objects: &mut Vec<DynamicObject>) -> Result<()> {
    let is_list = document
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind == "List" || kind.ends_with("List"))
        && document.get("items").is_some_and(Value::is_array);

    if is_list {
        if let Some(Value::Array(items)) = document.get("items") {
            for item in items {
                flatten(item.clone(), objects)?;
            }
        }
        return Ok(());
    }

    if !document.is_object() {
        return Err(Error::InvalidInput("manifest document is not an object"));
    }
    objects.push(serde_json::from_value(document)?);
    Ok(())
}

fn describe(obj: &DynamicObject) -> String {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("?");
    let name = obj.metadata.name.as_deref().unwrap_or("?");
    format!("{}/{}", kind, name)
}

impl DynamicHandler {
    /// Apply every document, stopping at the first failure
    pub async fn apply_manifest_bytes(&self, data: &[u8]) -> Result<Vec<DynamicObject>> {
        let objects = manifest_objects(data)?;
        let mut applied = Vec::with_capacity(objects.len());
        for obj in objects {
            debug!(object = %describe(&obj), "applying");
            applied.push(self.apply(obj).await?);
        }
        info!(count = applied.len(), "manifest applied");
        Ok(applied)
    }

    pub async fn apply_manifest_file(&self, path: &Path) -> Result<Vec<DynamicObject>> {
        self.apply_manifest_bytes(&read_file(path)?).await
    }

    /// Delete every document in reverse order, stopping at the first failure
    pub async fn delete_manifest_bytes(&self, data: &[u8]) -> Result<()> {
        let objects = manifest_objects(data)?;
        let count = objects.len();
        for obj in objects.into_iter().rev() {
            debug!(object = %describe(&obj), "deleting");
            self.delete(obj).await?;
        }
        info!(count, "manifest deleted");
        Ok(())
    }

    pub async fn delete_manifest_file(&self, path: &Path) -> Result<()> {
        self.delete_manifest_bytes(&read_file(path)?).await
    }
}
