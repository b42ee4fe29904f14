//! k8s-handler
//!
//! Per-kind Kubernetes handlers. Each operation takes the object as a file
//! path, raw YAML/JSON bytes, a typed object or a JSON map, and makes exactly
//! one API call with it. An unstructured [`DynamicHandler`] covers every
//! other kind.

pub mod config;
pub mod dynamic;
pub mod error;
pub mod handler;
pub mod input;
pub mod kube;
pub mod models;
pub mod options;
pub mod patch;
pub mod restmapper;

// Re-export commonly used types for convenience
pub use dynamic::{DynamicHandler, DynamicInput};
pub use error::{Error, Result};
pub use handler::{
    Handler, Informer, InformerHandler, Lister, ManagedResource, WatchDispatcher, WatchHandler,
};
pub use input::{ResourceInput, Target};
pub use models::{ResourceKind, get_all_commands};
pub use options::HandlerOptions;
pub use patch::PatchType;
pub use restmapper::RestMapper;
