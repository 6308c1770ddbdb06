//! strata: layered template composition for CloudFormation-style documents.
//!
//! Independently authored fragments and layered overrides compose, in load
//! order, into a single cached template document. A second pass rewrites
//! that document so templates nested inside one another can be deployed as
//! separate artifacts while still sharing parameters and outputs:
//!
//! - [`Formation`] is the composition engine: fragments merge in load
//!   order, overrides run in registration order, and the result is
//!   memoized until [`Formation::recompile`]
//! - [`dynamics`] resolves named insertions (user-registered builders or
//!   builtin resource shortcuts) into document fragments
//! - [`nesting`] detaches embedded sub-templates, wires their parameters
//!   against sibling outputs or newly minted top-level parameters, and
//!   hands each detached template to a caller-supplied locator callback
//!   for persistence

pub mod document;
pub mod dynamics;
pub mod error;
pub mod formation;
pub mod nesting;
pub mod sources;

pub use document::{Document, Intrinsic, Mapping, Node, Scalar};
pub use error::{Result, StrataError};
pub use formation::{Formation, Fragment, Override};
pub use nesting::{apply_nesting, nest, NestingOptions, NESTED_STACK_TYPE};
pub use sources::{ComponentFile, FragmentSource, TemplatePaths};
