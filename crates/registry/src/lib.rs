//! Name-keyed registry over the composition engine.
//!
//! # Purpose
//!
//! Lets independent parts of an application refer to shared definitions by
//! string name instead of passing typed handles around. A plugin can extend
//! `"Calculator"` without linking against the code that defined it, as long as
//! both agree on the artifact type.
//!
//! # Mental Model
//!
//! ```text
//! Registry ─┬─ names: "A" -> ClassDef<..>, "Mixin" -> MixinDef<..>, ...
//!           └─ engine: layers, cache, parent edges
//! ```
//!
//! Each name maps to exactly one engine definition. [`Registry::define`],
//! [`Registry::mixin`] and [`Registry::module`] create it; [`Registry::extend`]
//! stacks layers on it; [`Registry::resolve`] compiles it. Factories receive a
//! [`Scope`], whose [`Scope::require`] compiles another name inside the same
//! pass, so the dependency edge is recorded exactly as with typed handles.
//!
//! Names are resolved when a factory runs, not when it is registered, so a
//! definition may require a name that is registered after it.
//!
//! # Errors
//!
//! Lookups fail with [`RegistryError::Unregistered`]; asking for the wrong
//! artifact type fails with [`RegistryError::TypeMismatch`] instead of
//! panicking. Engine failures pass through as [`RegistryError::Engine`].

mod error;
mod registry;
mod scope;

pub use error::{RegistryError, Result};
pub use registry::Registry;
pub use scope::Scope;
