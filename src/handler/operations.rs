//! Create, update, apply, delete, get and list

use super::{Handler, ManagedResource, name_of, object_namespace, strip_server_fields};
use crate::error::Result;
use crate::input::{ResourceInput, Target};
use tracing::debug;

impl<K: ManagedResource> Handler<K> {
    /// Create the object in its own namespace, or the handler's
    pub async fn create(&self, input: impl Into<ResourceInput<K>>) -> Result<K> {
        let obj = input.into().into_object()?;
        self.create_object(obj).await
    }

    /// Replace the object named in the input
    pub async fn update(&self, input: impl Into<ResourceInput<K>>) -> Result<K> {
        let obj = input.into().into_object()?;
        self.update_object(obj).await
    }

    /// Create the object, or update it if it already exists
    pub async fn apply(&self, input: impl Into<ResourceInput<K>>) -> Result<K> {
        let obj = input.into().into_object()?;
        match self.create_object(obj.clone()).await {
            Err(err) if err.is_already_exists() => {
                debug!(kind = %K::KIND, "object exists, updating");
                self.update_object(obj).await
            }
            result => result,
        }
    }

    /// Delete by name, or by the name and namespace of the given object
    pub async fn delete(&self, target: impl Into<Target<K>>) -> Result<()> {
        let (namespace, name) = self.resolve(target.into())?;
        let mut params = self.options.snapshot().delete;
        if let Some(policy) = K::delete_propagation() {
            params.propagation_policy = Some(policy);
        }
        self.api_in(&namespace).delete(&name, &params).await?;
        Ok(())
    }

    /// Fetch by name, or fetch the current state of the given object
    pub async fn get(&self, target: impl Into<Target<K>>) -> Result<K> {
        let (namespace, name) = self.resolve(target.into())?;
        Ok(self.api_in(&namespace).get(&name).await?)
    }

    /// List objects in the handler's namespace matching `label_selector`
    pub async fn list(&self, label_selector: &str) -> Result<Vec<K>> {
        self.list_by_label(label_selector).await
    }

    pub async fn list_by_label(&self, selector: &str) -> Result<Vec<K>> {
        let params = self.options.snapshot().list_by_label(selector);
        Ok(self.api().list(&params).await?.items)
    }

    pub async fn list_by_field(&self, selector: &str) -> Result<Vec<K>> {
        let params = self.options.snapshot().list_by_field(selector);
        Ok(self.api().list(&params).await?.items)
    }

    pub async fn list_by_namespace(&self, namespace: &str) -> Result<Vec<K>> {
        let params = self.options.snapshot().list;
        Ok(self.api_in(namespace).list(&params).await?.items)
    }

    /// List across every namespace
    pub async fn list_all(&self) -> Result<Vec<K>> {
        let params = self.options.snapshot().list;
        let api: kube::Api<K> = kube::Api::all(self.client.clone());
        Ok(api.list(&params).await?.items)
    }

    async fn create_object(&self, mut obj: K) -> Result<K> {
        strip_server_fields(&mut obj);
        let params = self.options.snapshot().post;
        Ok(self.api_for(&obj).create(&params, &obj).await?)
    }

    async fn update_object(&self, mut obj: K) -> Result<K> {
        let name = name_of(&obj)?;
        strip_server_fields(&mut obj);
        let params = self.options.snapshot().post;
        Ok(self.api_for(&obj).replace(&name, &params, &obj).await?)
    }

    /// Namespace and name addressed by a target
    pub(super) fn resolve(&self, target: Target<K>) -> Result<(String, String)> {
        match target {
            Target::Name(name) => Ok((self.namespace.clone(), name)),
            Target::Input(input) => {
                let obj = input.into_object()?;
                let name = name_of(&obj)?;
                let namespace = object_namespace(&obj)
                    .unwrap_or(&self.namespace)
                    .to_string();
                Ok((namespace, name))
            }
        }
    }
}
