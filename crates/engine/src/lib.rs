#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Incremental composition engine.
//!
//! # Purpose
//!
//! A [`Definition`] is a base factory plus an ordered stack of transformer
//! layers. Compiling it folds the enabled layers into an artifact that is
//! memoized until something it depends on changes. Dependencies are never
//! declared: whichever definition is being compiled when another is compiled
//! becomes its parent, and mutating a definition evicts it together with every
//! parent that compiled through it.
//!
//! # Mental Model
//!
//! 1. **Define:** [`Engine::define_class`], [`Engine::define_mixin`] and
//!    [`Engine::define_module`] register a base factory and return a typed,
//!    copyable handle.
//! 2. **Extend:** [`Engine::add_layer`] stacks a transformer on a class or
//!    mixin and returns an [`Extension`] that can later be removed and
//!    reapplied without disturbing the slots of other extensions.
//! 3. **Compile:** [`Engine::compile`] or [`CompileCx::compile`] fold the
//!    layers. Every compile issued from inside a factory or transformer
//!    records an edge from the dependency to the definition being built.
//! 4. **Invalidate:** any layer mutation cascades along recorded edges,
//!    evicting cached artifacts and clearing the edges it walked.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`Engine`] | Definition arena, artifact cache and mutation entry points. |
//! | [`CompileCx`] | Compile stack of one pass; handed to every layer. |
//! | [`Def`] | Typed handle: [`ClassDef`], [`MixinDef`], [`ModuleDef`]. |
//! | [`Extension`] | Handle to one transformer slot. |
//! | [`Class`] | Constructor artifact with super-style extension. |
//! | [`Mixin`] | Base-to-base transform; combine with [`mix_with`]. |
//!
//! # Invariants
//!
//! - Enabled layers fold in slot order; disabled slots are skipped, never moved.
//!   - Enforced in: [`layer::LayerStack::chain`]
//!   - Tested by: [`invariants::test_layers_fold_in_slot_order`]
//!   - Failure symptom: Overrides apply in the wrong order after a remove/reapply.
//!
//! - A cached artifact is returned by identity until it is invalidated.
//!   - Enforced in: [`Engine::compile_in`]
//!   - Tested by: [`invariants::test_cache_returns_same_artifact`]
//!   - Failure symptom: Factories rerun on every compile; identity checks fail.
//!
//! - Mutating a definition evicts every definition that compiled through it.
//!   - Enforced in: [`graph::Graph::invalidate`]
//!   - Tested by: [`invariants::test_cascade_reaches_transitive_parents`]
//!   - Failure symptom: Stale artifacts survive a change to a dependency.
//!
//! - Invalidation never evicts definitions outside the affected subgraph.
//!   - Enforced in: [`graph::Graph::invalidate`]
//!   - Tested by: [`invariants::test_cascade_is_scoped`]
//!   - Failure symptom: Unrelated definitions recompile after a mutation.
//!
//! - Parent edges are deduplicated and kept in first-seen order.
//!   - Enforced in: [`graph::Graph::record_parent`]
//!   - Tested by: [`invariants::test_parent_edges_dedup`]
//!   - Failure symptom: Unbounded edge growth on repeated compiles.
//!
//! - A multi-target layer is rejected unless every target shares one origin.
//!   - Enforced in: [`LayerTarget`] for slices
//!   - Tested by: [`invariants::test_origin_mismatch_rejected`]
//!   - Failure symptom: A layer silently lands on the wrong definition.
//!
//! - A failed compile caches nothing and leaves the compile stack balanced.
//!   - Enforced in: [`Engine::compile_in`], [`context::Frame`]
//!   - Tested by: [`invariants::test_failed_compile_unwinds`]
//!   - Failure symptom: Later compiles see a phantom parent or a half-built artifact.
//!
//! - A result computed across a concurrent invalidation is not cached.
//!   - Enforced in: [`Engine::compile_in`] via node epochs
//!   - Tested by: [`invariants::test_stale_result_not_cached`]
//!   - Failure symptom: An artifact built from an old dependency outlives the change.
//!
//! # Concurrency
//!
//! [`Engine`] is `Send + Sync`. Graph bookkeeping runs under one mutex that is
//! released before any user callback runs. Each pass owns its own stack, so
//! concurrent passes attribute parents correctly; two passes racing on the same
//! uncached definition may both run its factory, and the first to finish wins
//! the cache slot. The slower pass discards its own value and returns the
//! stored one, so every caller observes a single artifact per epoch.

mod class;
mod config;
mod context;
mod engine;
mod error;
mod graph;
mod handle;
mod id;
mod kind;
mod layer;
mod mixin;

#[cfg(any(test, doc))]
pub(crate) mod invariants;

pub use class::{Class, Construct};
pub use config::EngineConfig;
pub use context::CompileCx;
pub use engine::Engine;
pub use error::{BoxError, Error, LayerResult, Result};
pub use graph::Cascade;
pub use handle::{ClassDef, Def, Definition, Extension, LayerTarget, MixinDef, ModuleDef};
pub use id::{DefId, DefRef, EngineId};
pub use kind::{ClassLike, DefKind, Extensible, Kind, MixinLike, ModuleLike};
pub use mixin::{Mixin, mix_with};
