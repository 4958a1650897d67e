//! Name lookups from inside a running factory.

use std::sync::Arc;

use stratum_engine::{BoxError, CompileCx, Construct, Engine, LayerResult, Mixin, mix_with};

use crate::error::RegistryError;
use crate::registry::Shared;

/// Compile-time view handed to factories and transformers registered by name.
///
/// Everything resolved through a scope is compiled in the caller's pass, so
/// the definition being built is recorded as a parent of each name it pulls
/// in.
pub struct Scope<'a, 'e> {
	shared: &'a Shared,
	cx: &'a mut CompileCx<'e>,
}

impl<'a, 'e> Scope<'a, 'e> {
	pub(crate) fn new(shared: &'a Shared, cx: &'a mut CompileCx<'e>) -> Self {
		Self { shared, cx }
	}

	/// Compiles the definition registered under `name`.
	pub fn require<A>(&mut self, name: &str) -> LayerResult<Arc<A>>
	where
		A: Send + Sync + 'static,
	{
		self.shared.compile(self.cx, name).map_err(boxed)
	}

	/// Compiles the class registered under `name` and instantiates it.
	pub fn create<C: Construct>(&mut self, name: &str, args: C::Args) -> LayerResult<C::Output> {
		self.shared.create::<C>(self.cx, name, args).map_err(boxed)
	}

	/// Applies the mixins registered under `names` to `base`, left to right.
	///
	/// Each mixin is compiled first, so a later change to any of them
	/// invalidates the caller.
	pub fn mix_with<B>(&mut self, base: B, names: &[&str]) -> LayerResult<B>
	where
		B: 'static,
	{
		let mixins = names
			.iter()
			.map(|name| self.require::<Mixin<B>>(name))
			.collect::<LayerResult<Vec<_>>>()?;
		mix_with(base, mixins)
	}

	/// The underlying compile pass, for definitions held as typed handles.
	pub fn cx(&mut self) -> &mut CompileCx<'e> {
		&mut *self.cx
	}

	pub fn engine(&self) -> &'e Engine {
		self.cx.engine()
	}

	/// Depth of the current pass.
	pub fn depth(&self) -> usize {
		self.cx.depth()
	}
}

impl std::fmt::Debug for Scope<'_, '_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scope").field("cx", &self.cx).finish()
	}
}

/// Unwraps engine errors so nested failures stay walkable with
/// [`stratum_engine::Error::root_layer`].
fn boxed(err: RegistryError) -> BoxError {
	match err {
		RegistryError::Engine(err) => Box::new(err),
		other => Box::new(other),
	}
}
