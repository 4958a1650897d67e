//! The engine: definition arena, compile entry points and layer mutation.
//!
//! # Role
//!
//! [`Engine`] owns every definition registered with it. Compiling a
//! definition folds its enabled layers into an artifact and memoizes it;
//! mutating a definition's layers evicts its artifact and, transitively, the
//! artifact of every definition that compiled through it.
//!
//! # Locking
//!
//! Graph state sits behind one mutex that is held only for bookkeeping. It is
//! never held while a factory or transformer runs, so callbacks are free to
//! compile other definitions or mutate layers.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::class::Construct;
use crate::config::EngineConfig;
use crate::context::CompileCx;
use crate::error::{Error, LayerResult, Result};
use crate::graph::{Artifact, Cascade, Graph};
use crate::handle::{ClassDef, Def, Definition, Extension, LayerTarget, MixinDef, ModuleDef};
use crate::id::{DefId, DefRef, EngineId};
use crate::kind::{ClassLike, DefKind, Kind, MixinLike, ModuleLike};
use crate::layer::{Chain, LayerStack, TransformFn, Value, erase_base, erase_transform};
use crate::mixin::Mixin;

struct Inner {
	id: EngineId,
	config: EngineConfig,
	graph: Mutex<Graph>,
}

/// Registry of definitions with memoized, self-invalidating artifacts.
///
/// Cheap to clone; clones share the same definitions.
#[derive(Clone)]
pub struct Engine {
	inner: Arc<Inner>,
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Engine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Engine")
			.field("id", &self.inner.id)
			.field("label", &self.inner.config.label)
			.field("definitions", &self.len())
			.finish()
	}
}

impl Engine {
	pub fn new() -> Self {
		Self::with_config(EngineConfig::default())
	}

	pub fn with_config(config: EngineConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				id: EngineId::next(),
				config,
				graph: Mutex::new(Graph::default()),
			}),
		}
	}

	#[inline]
	pub fn id(&self) -> EngineId {
		self.inner.id
	}

	#[inline]
	pub fn config(&self) -> &EngineConfig {
		&self.inner.config
	}

	/// Number of registered definitions.
	pub fn len(&self) -> usize {
		self.inner.graph.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Opens an explicit top-level compile pass.
	pub fn context(&self) -> CompileCx<'_> {
		CompileCx::new(self)
	}

	/// Registers a class-like definition with its base factory.
	pub fn define_class<C, F>(&self, factory: F) -> ClassDef<C>
	where
		C: Send + Sync + 'static,
		F: Fn(&mut CompileCx<'_>) -> LayerResult<C> + Send + Sync + 'static,
	{
		self.define::<ClassLike, C, F>(factory)
	}

	/// Registers a mixin-like definition with its base factory.
	pub fn define_mixin<B, F>(&self, factory: F) -> MixinDef<B>
	where
		B: 'static,
		F: Fn(&mut CompileCx<'_>) -> LayerResult<Mixin<B>> + Send + Sync + 'static,
	{
		self.define::<MixinLike, Mixin<B>, F>(factory)
	}

	/// Registers a module-like definition; modules have exactly one layer.
	pub fn define_module<T, F>(&self, factory: F) -> ModuleDef<T>
	where
		T: Send + Sync + 'static,
		F: Fn(&mut CompileCx<'_>) -> LayerResult<T> + Send + Sync + 'static,
	{
		self.define::<ModuleLike, T, F>(factory)
	}

	fn define<K, A, F>(&self, factory: F) -> Def<K, A>
	where
		K: Kind,
		A: Send + Sync + 'static,
		F: Fn(&mut CompileCx<'_>) -> LayerResult<A> + Send + Sync + 'static,
	{
		let id = self
			.inner
			.graph
			.lock()
			.insert(K::KIND, LayerStack::new(erase_base(factory)));
		tracing::debug!(engine = %self.inner.config.label, def = %id, kind = %K::KIND, "definition registered");
		Def::new(self.def_ref(id))
	}

	/// Stacks `transformer` on top of `target`'s origin definition.
	///
	/// The origin and everything compiled through it are invalidated before
	/// the extension handle is returned.
	pub fn add_layer<A, T, F>(&self, target: &T, transformer: F) -> Result<Extension<A>>
	where
		A: Send + Sync + 'static,
		T: LayerTarget<A> + ?Sized,
		F: Fn(&mut CompileCx<'_>, A) -> LayerResult<A> + Send + Sync + 'static,
	{
		let origin = target.origin()?;
		let id = self.check(origin)?;
		let transform = erase_transform(transformer);

		let (slot, generation, cascade) = {
			let mut graph = self.inner.graph.lock();
			let node = graph.node_mut(id);
			let slot = node.layers.push(Arc::clone(&transform));
			let generation = node.generation;
			(slot, generation, graph.invalidate(id))
		};
		tracing::debug!(
			engine = %self.inner.config.label,
			def = %id,
			slot,
			visited = cascade.visited,
			evicted = cascade.evicted,
			"layer added"
		);

		Ok(Extension {
			engine: self.clone(),
			origin,
			slot,
			generation,
			transform,
			_artifact: PhantomData,
		})
	}

	/// Compiles `def` in a fresh pass.
	pub fn compile<D: Definition>(&self, def: &D) -> Result<Arc<D::Artifact>> {
		self.context().compile(def)
	}

	/// Compiles `def` in a fresh pass and instantiates the result.
	pub fn create<C: Construct>(&self, def: &ClassDef<C>, args: C::Args) -> Result<C::Output> {
		self.context().create(def, args)
	}

	/// Returns true if `def` has a memoized artifact.
	pub fn is_cached<D: Definition>(&self, def: &D) -> bool {
		self.check(def.def_ref())
			.map(|id| self.inner.graph.lock().node(id).artifact.is_some())
			.unwrap_or(false)
	}

	/// Evicts `def` and everything compiled through it.
	pub fn invalidate<D: Definition>(&self, def: &D) -> Result<Cascade> {
		let id = self.check(def.def_ref())?;
		let cascade = self.inner.graph.lock().invalidate(id);
		tracing::debug!(
			engine = %self.inner.config.label,
			def = %id,
			visited = cascade.visited,
			evicted = cascade.evicted,
			"invalidated"
		);
		Ok(cascade)
	}

	/// Definitions recorded as having compiled through `def` since its last
	/// invalidation, in the order they were first observed.
	pub fn parents<D: Definition>(&self, def: &D) -> Result<Vec<DefId>> {
		let id = self.check(def.def_ref())?;
		Ok(self
			.inner
			.graph
			.lock()
			.node(id)
			.parents
			.iter()
			.copied()
			.collect())
	}

	pub fn kind<D: Definition>(&self, def: &D) -> Result<DefKind> {
		let id = self.check(def.def_ref())?;
		Ok(self.inner.graph.lock().node(id).kind)
	}

	/// Slot count of `def`, counting the base and disabled slots.
	pub fn layer_count<D: Definition>(&self, def: &D) -> Result<usize> {
		let id = self.check(def.def_ref())?;
		Ok(self.inner.graph.lock().node(id).layers.len())
	}

	/// Clears every definition's layers, artifacts and parent edges.
	///
	/// Handles stay valid but compile to [`Error::Undefined`] until the
	/// definition is registered again; extensions minted before the reset go
	/// stale. Meant for test isolation.
	///
	/// Cleared definitions are not reused: defining again after a reset
	/// appends to the arena, so [`Engine::len`] never shrinks.
	pub fn reset_all(&self) {
		let mut graph = self.inner.graph.lock();
		graph.reset();
		tracing::debug!(engine = %self.inner.config.label, definitions = graph.len(), "engine reset");
	}

	pub(crate) fn compile_in<D: Definition>(
		&self,
		cx: &mut CompileCx<'_>,
		def: &D,
	) -> Result<Arc<D::Artifact>> {
		let id = self.check(def.def_ref())?;
		if cx.contains(id) {
			return Err(Error::Cycle {
				def: id,
				depth: cx.depth(),
			});
		}
		let limit = self.inner.config.max_depth;
		if cx.depth() >= limit {
			return Err(Error::DepthExceeded { def: id, limit });
		}

		let (kind, epoch, chain) = {
			let mut graph = self.inner.graph.lock();
			if let Some(parent) = cx.current() {
				graph.record_parent(id, parent);
			}
			let node = graph.node(id);
			if let Some(artifact) = &node.artifact {
				tracing::trace!(engine = %self.inner.config.label, def = %id, "cache hit");
				return downcast::<D::Artifact>(Arc::clone(artifact));
			}
			let chain = node
				.layers
				.chain()
				.ok_or(Error::Undefined { def: id, kind: node.kind })?;
			(node.kind, node.epoch, chain)
		};
		tracing::trace!(engine = %self.inner.config.label, def = %id, %kind, "cache miss");

		let value = {
			let _span = tracing::trace_span!("compile", def = %id, %kind).entered();
			let mut frame = cx.enter(id);
			fold(&mut frame, id, kind, chain)?
		};
		let artifact: Artifact = Arc::from(value);

		let artifact = {
			let mut graph = self.inner.graph.lock();
			let node = graph.node_mut(id);
			if node.epoch != epoch {
				tracing::debug!(
					engine = %self.inner.config.label,
					def = %id,
					"invalidated while compiling; result not cached"
				);
				artifact
			} else if let Some(stored) = &node.artifact {
				tracing::trace!(
					engine = %self.inner.config.label,
					def = %id,
					"concurrent pass stored first; keeping its artifact"
				);
				Arc::clone(stored)
			} else {
				node.artifact = Some(Arc::clone(&artifact));
				artifact
			}
		};

		downcast::<D::Artifact>(artifact)
	}

	pub(crate) fn set_slot(
		&self,
		id: DefId,
		slot: usize,
		generation: u32,
		transform: Option<Arc<TransformFn>>,
	) -> Result<()> {
		let enabled = transform.is_some();
		let cascade = {
			let mut graph = self.inner.graph.lock();
			let node = graph.node_mut(id);
			if node.generation != generation || !node.layers.set(slot, transform) {
				return Err(Error::StaleExtension { def: id, slot });
			}
			graph.invalidate(id)
		};
		tracing::debug!(
			engine = %self.inner.config.label,
			def = %id,
			slot,
			enabled,
			visited = cascade.visited,
			evicted = cascade.evicted,
			"layer toggled"
		);
		Ok(())
	}

	pub(crate) fn slot_active(&self, id: DefId, slot: usize, generation: u32) -> bool {
		let graph = self.inner.graph.lock();
		let node = graph.node(id);
		node.generation == generation && node.layers.is_active(slot)
	}

	fn def_ref(&self, id: DefId) -> DefRef {
		DefRef {
			engine: self.inner.id,
			id,
		}
	}

	fn check(&self, def: DefRef) -> Result<DefId> {
		if def.engine == self.inner.id {
			Ok(def.id)
		} else {
			Err(Error::ForeignHandle { def: def.id })
		}
	}
}

/// Runs the base factory, then every enabled transformer in slot order.
fn fold(cx: &mut CompileCx<'_>, id: DefId, kind: DefKind, chain: Chain) -> Result<Value> {
	let layer_err = |slot: usize| move |source| Error::Layer { def: id, kind, slot, source };
	let mut value = (chain.base)(cx).map_err(layer_err(0))?;
	for (slot, transform) in chain.transforms {
		value = transform(cx, value).map_err(layer_err(slot))?;
	}
	Ok(value)
}

fn downcast<A: Send + Sync + 'static>(artifact: Artifact) -> Result<Arc<A>> {
	artifact.downcast::<A>().map_err(|_| Error::ArtifactType {
		expected: std::any::type_name::<A>(),
	})
}
