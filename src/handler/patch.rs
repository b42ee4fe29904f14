use super::{Handler, ManagedResource, name_of};
use crate::error::Result;
use crate::input::{ResourceInput, decode, read_file, yaml_to_json};
use crate::patch::{PatchType, diff_patch, raw_patch};
use serde_json::Value;
use tracing::debug;

impl<K: ManagedResource> Handler<K> {
    /// Patch `original`.
    ///
    /// A file or bytes input is a patch document and is sent as-is with
    /// `patch_type` semantics. A typed object or map is the desired state:
    /// the difference from `original` is computed and sent instead. When
    /// there is nothing to change, `original` is returned without a request.
    pub async fn patch(
        &self,
        original: &K,
        patch: impl Into<ResourceInput<K>>,
        patch_type: PatchType,
    ) -> Result<K> {
        let name = name_of(original)?;
        let patch = match patch.into() {
            ResourceInput::File(path) => raw_patch(yaml_to_json(&read_file(&path)?)?, patch_type)?,
            ResourceInput::Bytes(data) => raw_patch(yaml_to_json(&data)?, patch_type)?,
            ResourceInput::Object(modified) => diff_patch(
                &serde_json::to_value(original)?,
                &serde_json::to_value(&modified)?,
                patch_type,
            )?,
            ResourceInput::Map(modified) => {
                let modified: K = decode(Value::Object(modified))?;
                diff_patch(
                    &serde_json::to_value(original)?,
                    &serde_json::to_value(&modified)?,
                    patch_type,
                )?
            }
        };

        let Some(patch) = patch else {
            debug!(kind = %K::KIND, name = %name, "empty patch, nothing to send");
            return Ok(original.clone());
        };

        let params = self.options.snapshot().patch;
        Ok(self.api_for(original).patch(&name, &params, &patch).await?)
    }
}
