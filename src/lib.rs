//! Exchequer – a durable registry of worths for stackable resources.
//!
//! Exchequer maintains one canonical, queryable mapping from resource
//! identifiers to a per-unit scalar worth, where:
//! * A [`stack::Stack`] names "some quantity of some resource": a discrete
//!   item with an optional variant tag, a fluid with a volume, or a wildcard
//!   for any member of a named category.
//! * A [`stack::StackKey`] is a stack validated against the host's
//!   [`stack::Directory`] and normalized to a unit quantity; keys carry a
//!   strict total order so sorted mappings are reproducible across runs.
//! * A [`worth::Worth`] is the strictly positive scalar assigned to one unit
//!   of a key, factored down whenever a registration covers more than one
//!   unit.
//!
//! Worths are assigned in two tiers kept by [`registry::TierKeeper`]
//! structures: pre-assigned base values and post-assigned overrides that win
//! over anything a recompute produces. [`registry::Registry::compute`]
//! merges both tiers into an immutable sorted [`registry::Snapshot`] and
//! publishes it with a single pointer swap, so lookups never block and never
//! observe a half-merged mapping.
//!
//! ## Modules
//! * [`stack`] – Stacks, canonical keys and the host resource directory.
//! * [`worth`] – The worth scalar and its factoring operation.
//! * [`registry`] – Tier keepers, the snapshot engine and the registration
//!   entry point.
//! * [`persist`] – JSON record persistence and restoration for the three
//!   mappings.
//! * [`script`] – A small command DSL (`declare`, `add`, `compute`, ...) for
//!   driving a registry.
//! * [`interface`] – Thread-per-script submission with cooperative
//!   cancellation.
//!
//! ## Persistence
//! The [`persist::Persistor`] owns a worth directory holding one record per
//! tier plus the baked snapshot. [`registry::Registry::load`] restores prior
//! state on startup: missing tier records simply start empty, while a
//! missing snapshot record is regenerated by an immediate recompute.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use exchequer::{persist::Persistor, registry::{Registry, Tier}, stack::{DeclaredDirectory, Stack}, worth::Worth};
//! let directory = Arc::new(DeclaredDirectory::new());
//! directory.declare_item("apple");
//! let registry = Registry::new(Persistor::new("doctest_worths"), directory);
//! registry.register(&Stack::item("apple"), Worth::new(1).unwrap(), Tier::Pre, false).unwrap();
//! registry.compute().unwrap();
//! assert_eq!(registry.snapshot().len(), 1);
//! # std::fs::remove_dir_all("doctest_worths").ok();
//! ```
//!
//! ## Status & Roadmap
//! The two-tier assignment model, the snapshot discipline and the record
//! round-trip are stable. Deriving worths from the known ways to make a
//! resource is still an open extension point in the recompute. Expect the
//! script grammar to grow while the public surface settles.

pub mod error;
pub mod interface;
pub mod persist;
pub mod registry;
pub mod script;
pub mod stack;
pub mod worth;
