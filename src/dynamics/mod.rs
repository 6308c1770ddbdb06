//! Insertion resolver for strata.
//!
//! This module resolves named "dynamic" insertions into document fragments:
//! - User-registered dynamics: reusable builder units with parameter
//!   metadata, held in a [`DynamicsRegistry`]
//! - Builtin shortcuts: a read-only [`ShortcutRegistry`] mapping short
//!   names to concrete resource types and their known property names
//!
//! Both registries are explicit objects handed to an [`Inserter`], never
//! process-wide state, so tests and concurrent authoring flows stay
//! independent.

mod insert;
mod registry;
mod shortcuts;


pub use insert::{snake, ConfigValue, InsertArgs, Inserter, RefineFn};
pub use registry::{Dynamic, DynamicBuilder, DynamicsRegistry, ParamInfo, ParamMeta};
pub use shortcuts::{Shortcut, ShortcutRegistry};
