//! Per-handler request options
//!
//! Handlers carry one set of request parameters per verb. The set lives behind
//! a lock so a handler shared between tasks can be tuned through `&self`.
//! Copies made with `with_namespace`/`with_dry_run`/`clone` get their own set.

use kube::api::{DeleteParams, ListParams, PatchParams, PostParams, PropagationPolicy, WatchParams};
use std::sync::{PoisonError, RwLock};

/// Request parameters applied to every call a handler makes
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    pub list: ListParams,
    pub post: PostParams,
    pub delete: DeleteParams,
    pub patch: PatchParams,
}

impl HandlerOptions {
    /// Mark every mutating verb as dry-run
    pub fn enable_dry_run(&mut self) {
        self.post.dry_run = true;
        self.delete.dry_run = true;
        self.patch.dry_run = true;
        self.delete.propagation_policy = Some(PropagationPolicy::Background);
    }

    pub fn set_timeout(&mut self, seconds: u32) {
        self.list.timeout = Some(seconds);
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.list.limit = Some(limit);
    }

    /// Force delete sets a zero grace period; turning it off restores the server default
    pub fn set_force_delete(&mut self, force: bool) {
        self.delete.grace_period_seconds = force.then_some(0);
    }

    pub fn set_propagation_policy(&mut self, policy: &str) {
        self.delete.propagation_policy = Some(parse_propagation_policy(policy));
    }

    pub fn set_field_manager(&mut self, manager: &str) {
        self.post.field_manager = Some(manager.to_string());
        self.patch.field_manager = Some(manager.to_string());
    }

    /// List parameters with a label selector applied
    pub fn list_by_label(&self, selector: &str) -> ListParams {
        let mut lp = self.list.clone();
        lp.label_selector = (!selector.is_empty()).then(|| selector.to_string());
        lp
    }

    /// List parameters with a field selector applied
    pub fn list_by_field(&self, selector: &str) -> ListParams {
        let mut lp = self.list.clone();
        lp.field_selector = (!selector.is_empty()).then(|| selector.to_string());
        lp
    }

    /// Watch parameters matching the list timeout, if one is set
    pub fn watch_params(&self) -> WatchParams {
        let mut wp = WatchParams::default();
        // The API server caps watch timeouts just below 300s
        if let Some(timeout) = self.list.timeout.filter(|t| *t > 0 && *t < 295) {
            wp = wp.timeout(timeout);
        }
        wp
    }
}

/// Parse a propagation policy name, case-insensitively.
///
/// Anything other than `foreground` or `orphan` means background.
pub fn parse_propagation_policy(policy: &str) -> PropagationPolicy {
    match policy.to_lowercase().as_str() {
        "foreground" => PropagationPolicy::Foreground,
        "orphan" => PropagationPolicy::Orphan,
        _ => PropagationPolicy::Background,
    }
}

/// Lock-guarded options; `Clone` deep-copies the current values
#[derive(Debug, Default)]
pub(crate) struct SharedOptions(RwLock<HandlerOptions>);

impl SharedOptions {
    pub(crate) fn new(options: HandlerOptions) -> Self {
        Self(RwLock::new(options))
    }

    pub(crate) fn snapshot(&self) -> HandlerOptions {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut HandlerOptions)) {
        let mut options = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut options);
    }
}

impl Clone for SharedOptions {
    fn clone(&self) -> Self {
        Self::new(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_propagation_policy() {
        assert!(matches!(
            parse_propagation_policy("Foreground"),
            PropagationPolicy::Foreground
        ));
        assert!(matches!(
            parse_propagation_policy("ORPHAN"),
            PropagationPolicy::Orphan
        ));
        assert!(matches!(
            parse_propagation_policy("background"),
            PropagationPolicy::Background
        ));
        assert!(matches!(
            parse_propagation_policy("bogus"),
            PropagationPolicy::Background
        ));
    }

    #[test]
    fn test_enable_dry_run() {
        let mut options = HandlerOptions::default();
        options.enable_dry_run();
        assert!(options.post.dry_run);
        assert!(options.delete.dry_run);
        assert!(options.patch.dry_run);
        assert!(matches!(
            options.delete.propagation_policy,
            Some(PropagationPolicy::Background)
        ));
    }

    #[test]
    fn test_force_delete_toggle() {
        let mut options = HandlerOptions::default();
        options.set_force_delete(true);
        assert_eq!(options.delete.grace_period_seconds, Some(0));
        options.set_force_delete(false);
        assert_eq!(options.delete.grace_period_seconds, None);
    }

    #[test]
    fn test_list_by_label_keeps_limit() {
        let mut options = HandlerOptions::default();
        options.set_limit(10);
        let lp = options.list_by_label("app=nginx");
        assert_eq!(lp.label_selector.as_deref(), Some("app=nginx"));
        assert_eq!(lp.limit, Some(10));
        assert!(options.list_by_label("").label_selector.is_none());
    }

    #[test]
    fn test_watch_params_timeout() {
        let mut options = HandlerOptions::default();
        options.set_timeout(30);
        assert_eq!(options.watch_params().timeout, Some(30));

        options.set_timeout(600);
        assert_ne!(options.watch_params().timeout, Some(600));
    }

    #[test]
    fn test_shared_options_clone_is_independent() {
        let shared = SharedOptions::default();
        let copy = shared.clone();
        copy.update(|o| o.set_limit(5));
        assert_eq!(shared.snapshot().list.limit, None);
        assert_eq!(copy.snapshot().list.limit, Some(5));
    }
}
