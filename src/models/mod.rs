//! Model layer
//!
//! Resource kind metadata shared by typed handlers, the dynamic handler
//! and the CLI.

pub mod resource_kind;

pub use resource_kind::{ResourceEntry, ResourceKind, RESOURCE_REGISTRY, get_all_commands};
