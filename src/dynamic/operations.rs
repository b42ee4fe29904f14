use super::{DynamicHandler, DynamicInput};
use crate::error::{Error, Result};
use crate::handler::{Existence, WatchHandler, watch_loop};
use crate::input::{read_file, yaml_to_json};
use crate::patch::{PatchType, diff_patch, raw_patch};
use crate::restmapper::{Mapping, find_gvk};
use kube::Api;
use kube::api::{DynamicObject, PropagationPolicy};
use kube::core::GroupVersionKind;
use tracing::debug;

/// Kinds whose dependents are orphaned unless deleted in the background
const BACKGROUND_DELETE_KINDS: &[&str] = &["Job", "CronJob"];

/// `modified` with the original's apiVersion/kind filled in when absent.
/// A different kind is rejected.
fn same_kind(original: &DynamicObject, mut modified: DynamicObject) -> Result<DynamicObject> {
    match (&original.types, &modified.types) {
        (Some(want), Some(got))
            if want.api_version != got.api_version || want.kind != got.kind =>
        {
            Err(Error::KindMismatch {
                expected: format!("{}/{}", want.api_version, want.kind),
                found: format!("{}/{}", got.api_version, got.kind),
            })
        }
        (Some(want), None) => {
            modified.types = Some(want.clone());
            Ok(modified)
        }
        _ => Ok(modified),
    }
}

impl DynamicHandler {
    pub async fn create(&self, input: impl Into<DynamicInput>) -> Result<DynamicObject> {
        let obj = input.into().require_object()?;
        self.create_object(obj).await
    }

    pub async fn update(&self, input: impl Into<DynamicInput>) -> Result<DynamicObject> {
        let obj = input.into().require_object()?;
        self.update_object(obj).await
    }

    /// Create the object, or update it if it already exists
    pub async fn apply(&self, input: impl Into<DynamicInput>) -> Result<DynamicObject> {
        let obj = input.into().require_object()?;
        match self.create_object(obj.clone()).await {
            Err(err) if err.is_already_exists() => {
                debug!(name = ?obj.metadata.name, "object exists, updating");
                self.update_object(obj).await
            }
            result => result,
        }
    }

    /// Delete by name (needs `with_gvk`) or by the object's own kind, name
    /// and namespace
    pub async fn delete(&self, input: impl Into<DynamicInput>) -> Result<()> {
        let (gvk, api, name) = self.locate(input.into()).await?;
        let mut params = self.options.snapshot().delete;
        if BACKGROUND_DELETE_KINDS.contains(&gvk.kind.as_str()) {
            params.propagation_policy = Some(PropagationPolicy::Background);
        }
        api.delete(&name, &params).await?;
        Ok(())
    }

    pub async fn get(&self, input: impl Into<DynamicInput>) -> Result<DynamicObject> {
        let (_, api, name) = self.locate(input.into()).await?;
        Ok(api.get(&name).await?)
    }

    /// List objects of the `with_gvk` kind in the handler's namespace
    pub async fn list(&self, label_selector: &str) -> Result<Vec<DynamicObject>> {
        let api = self.gvk_api(&self.namespace).await?;
        let params = self.options.snapshot().list_by_label(label_selector);
        Ok(api.list(&params).await?.items)
    }

    pub async fn list_all(&self) -> Result<Vec<DynamicObject>> {
        let gvk = self.gvk.as_ref().ok_or(Error::MissingGvk)?;
        let mapping = self.mapper.mapping(gvk).await?;
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &mapping.api_resource);
        let params = self.options.snapshot().list;
        Ok(api.list(&params).await?.items)
    }

    /// Watch one object by name; never returns unless the watch cannot be opened
    pub async fn watch_by_name<H>(&self, name: &str, mut handler: H) -> Result<()>
    where
        H: WatchHandler<DynamicObject>,
    {
        let api = self.gvk_api(&self.namespace).await?;
        let params = self
            .options
            .snapshot()
            .watch_params()
            .fields(&format!("metadata.name={}", name));
        watch_loop(&api, &params, &Existence::name(name), &mut handler).await
    }

    pub async fn watch_by_label<H>(&self, selector: &str, mut handler: H) -> Result<()>
    where
        H: WatchHandler<DynamicObject>,
    {
        let api = self.gvk_api(&self.namespace).await?;
        let params = self.options.snapshot().watch_params().labels(selector);
        watch_loop(&api, &params, &Existence::labels(selector), &mut handler).await
    }

    /// Watch the object addressed by `input`
    pub async fn watch<H>(&self, input: impl Into<DynamicInput>, handler: H) -> Result<()>
    where
        H: WatchHandler<DynamicObject>,
    {
        match input.into() {
            DynamicInput::Name(name) => self.watch_by_name(&name, handler).await,
            other => {
                let obj = other.require_object()?;
                let gvk = find_gvk(&obj)?;
                let name = obj.metadata.name.clone().ok_or(Error::MissingName)?;
                let namespace = obj.metadata.namespace.clone().unwrap_or_default();
                self.with_gvk(gvk)
                    .with_namespace_or_current(&namespace)
                    .watch_by_name(&name, handler)
                    .await
            }
        }
    }

    /// Patch `original`, as the typed handler does. `None` means merge, since
    /// strategic merge is rejected for kinds without a known schema.
    pub async fn patch(
        &self,
        original: &DynamicObject,
        patch: impl Into<DynamicInput>,
        patch_type: Option<PatchType>,
    ) -> Result<DynamicObject> {
        let patch_type = patch_type.unwrap_or(PatchType::Merge);
        let (_, api, name) = self.locate(DynamicInput::Object(original.clone())).await?;

        let original_value = serde_json::to_value(original)?;
        let patch = match patch.into() {
            DynamicInput::Name(_) => {
                return Err(Error::InvalidInput("a patch cannot be a name"));
            }
            DynamicInput::File(path) => raw_patch(yaml_to_json(&read_file(&path)?)?, patch_type)?,
            DynamicInput::Bytes(data) => raw_patch(yaml_to_json(&data)?, patch_type)?,
            structured => {
                let modified = same_kind(original, structured.require_object()?)?;
                diff_patch(&original_value, &serde_json::to_value(&modified)?, patch_type)?
            }
        };

        let Some(patch) = patch else {
            debug!(name = %name, "empty patch, nothing to send");
            return Ok(original.clone());
        };
        let params = self.options.snapshot().patch;
        Ok(api.patch(&name, &params, &patch).await?)
    }

    pub(super) async fn create_object(&self, mut obj: DynamicObject) -> Result<DynamicObject> {
        obj.metadata.resource_version = None;
        obj.metadata.uid = None;
        let gvk = find_gvk(&obj)?;
        let mapping = self.mapper.mapping(&gvk).await?;
        let api = self.api_for(&mapping, obj.metadata.namespace.as_deref());
        let params = self.options.snapshot().post;
        Ok(api.create(&params, &obj).await?)
    }

    pub(super) async fn update_object(&self, mut obj: DynamicObject) -> Result<DynamicObject> {
        let name = obj.metadata.name.clone().ok_or(Error::MissingName)?;
        obj.metadata.resource_version = None;
        obj.metadata.uid = None;
        let gvk = find_gvk(&obj)?;
        let mapping = self.mapper.mapping(&gvk).await?;
        let api = self.api_for(&mapping, obj.metadata.namespace.as_deref());
        let params = self.options.snapshot().post;
        Ok(api.replace(&name, &params, &obj).await?)
    }

    /// Kind, api and name addressed by an input
    pub(super) async fn locate(
        &self,
        input: DynamicInput,
    ) -> Result<(GroupVersionKind, Api<DynamicObject>, String)> {
        match input {
            DynamicInput::Name(name) => {
                let gvk = self.gvk.clone().ok_or(Error::MissingGvk)?;
                let mapping = self.mapper.mapping(&gvk).await?;
                Ok((gvk, self.api_for(&mapping, None), name))
            }
            other => {
                let obj = other.require_object()?;
                let name = obj
                    .metadata
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .ok_or(Error::MissingName)?;
                let gvk = find_gvk(&obj)?;
                let mapping = self.mapper.mapping(&gvk).await?;
                let api = self.api_for(&mapping, obj.metadata.namespace.as_deref());
                Ok((gvk, api, name))
            }
        }
    }

    fn with_namespace_or_current(&self, namespace: &str) -> Self {
        if namespace.is_empty() {
            self.clone()
        } else {
            self.with_namespace(namespace)
        }
    }

    async fn gvk_api(&self, namespace: &str) -> Result<Api<DynamicObject>> {
        let gvk = self.gvk.as_ref().ok_or(Error::MissingGvk)?;
        let mapping = self.mapper.mapping(gvk).await?;
        Ok(self.api_for(&mapping, Some(namespace)))
    }

    /// Namespaced kinds use the object's namespace or the handler's
    fn api_for(&self, mapping: &Mapping, namespace: Option<&str>) -> Api<DynamicObject> {
        if mapping.namespaced {
            let namespace = namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or(&self.namespace);
            Api::namespaced_with(self.client.clone(), namespace, &mapping.api_resource)
        } else {
            Api::all_with(self.client.clone(), &mapping.api_resource)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_map_without_type_meta_takes_originals() {
        let original = object(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w1"},
            "spec": {"size": 1}
        }));
        let modified = object(json!({"metadata": {"name": "w1"}, "spec": {"size": 2}}));

        let modified = same_kind(&original, modified).unwrap();
        let patch = crate::patch::create_merge_patch(
            &serde_json::to_value(&original).unwrap(),
            &serde_json::to_value(&modified).unwrap(),
        );
        assert_eq!(patch, json!({"spec": {"size": 2}}));
    }

    #[test]
    fn test_other_kind_rejected() {
        let original = object(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w1"}
        }));
        let modified = object(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "w1"}
        }));
        assert!(matches!(
            same_kind(&original, modified),
            Err(Error::KindMismatch { .. })
        ));
    }
}
