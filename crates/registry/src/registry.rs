//! Name table and registration entry points.
//!
//! # Role
//!
//! Maps each name to exactly one engine definition. Readers load the current
//! table without locking; registrations serialize on a writer lock, copy the
//! table, and publish the copy atomically.

use std::any::{Any, type_name};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap};
use stratum_engine::{
	Cascade, ClassDef, ClassLike, CompileCx, Construct, Def, DefId, DefKind, DefRef, Definition,
	Engine, Extension, Kind, LayerResult, Mixin, MixinDef, MixinLike, ModuleDef, ModuleLike,
};

use crate::error::{RegistryError, Result};
use crate::scope::Scope;

/// Published snapshot of every registered name.
#[derive(Clone, Default)]
struct Table {
	names: IndexMap<Box<str>, Entry, FxBuildHasher>,
	/// Owning name of each registered definition.
	by_def: FxHashMap<DefId, Box<str>>,
}

/// One registered name: its kind, its artifact type, and the typed handle.
#[derive(Clone)]
struct Entry {
	kind: DefKind,
	def: DefRef,
	artifact: &'static str,
	/// A `Def<K, A>` matching `kind` and `artifact`.
	handle: Arc<dyn Any + Send + Sync>,
}

impl Entry {
	fn new<K: Kind, A: Send + Sync + 'static>(def: Def<K, A>) -> Self {
		Self {
			kind: K::KIND,
			def: def.def_ref(),
			artifact: type_name::<A>(),
			handle: Arc::new(def),
		}
	}

	fn typed<K: Kind, A: Send + Sync + 'static>(&self, name: &str) -> Result<Def<K, A>> {
		self.handle
			.downcast_ref::<Def<K, A>>()
			.copied()
			.ok_or_else(|| RegistryError::TypeMismatch {
				name: name.into(),
				expected: type_name::<A>(),
				found: self.artifact,
			})
	}
}

/// Artifact-agnostic view of an entry, for queries that never compile.
struct Untyped(DefRef);

impl Definition for Untyped {
	type Artifact = ();

	fn def_ref(&self) -> DefRef {
		self.0
	}
}

pub(crate) struct Shared {
	table: ArcSwap<Table>,
	write: Mutex<()>,
}

impl Shared {
	fn entry(&self, name: &str) -> Result<Entry> {
		self.table
			.load()
			.names
			.get(name)
			.cloned()
			.ok_or_else(|| RegistryError::Unregistered { name: name.into() })
	}

	pub(crate) fn compile<A>(&self, cx: &mut CompileCx<'_>, name: &str) -> Result<Arc<A>>
	where
		A: Send + Sync + 'static,
	{
		let entry = self.entry(name)?;
		tracing::trace!(
			engine = %cx.engine().config().label,
			name,
			kind = %entry.kind,
			depth = cx.depth(),
			"resolving name"
		);
		let artifact = match entry.kind {
			DefKind::Class => cx.compile(&entry.typed::<ClassLike, A>(name)?),
			DefKind::Mixin => cx.compile(&entry.typed::<MixinLike, A>(name)?),
			DefKind::Module => cx.compile(&entry.typed::<ModuleLike, A>(name)?),
		};
		Ok(artifact?)
	}

	pub(crate) fn create<C: Construct>(
		&self,
		cx: &mut CompileCx<'_>,
		name: &str,
		args: C::Args,
	) -> Result<C::Output> {
		let entry = self.entry(name)?;
		if entry.kind != DefKind::Class {
			return Err(RegistryError::NotInstantiable {
				name: name.into(),
				kind: entry.kind,
			});
		}
		let def = entry.typed::<ClassLike, C>(name)?;
		Ok(cx.create(&def, args)?)
	}
}

/// Name-keyed façade over an [`Engine`].
///
/// Every name owns one definition. Factories and transformers registered here
/// receive a [`Scope`] instead of a bare [`CompileCx`], so they can pull in
/// other names with [`Scope::require`] and still record parent edges.
///
/// Cheap to clone; clones share the same names and engine.
#[derive(Clone)]
pub struct Registry {
	engine: Engine,
	shared: Arc<Shared>,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry")
			.field("engine", &self.engine)
			.field("names", &self.len())
			.finish()
	}
}

impl Registry {
	pub fn new() -> Self {
		Self::with_engine(Engine::new())
	}

	/// Builds a registry on an existing engine.
	///
	/// Definitions created directly on `engine` can still depend on names
	/// through [`Registry::require`].
	pub fn with_engine(engine: Engine) -> Self {
		Self {
			engine,
			shared: Arc::new(Shared {
				table: ArcSwap::from_pointee(Table::default()),
				write: Mutex::new(()),
			}),
		}
	}

	#[inline]
	pub fn engine(&self) -> &Engine {
		&self.engine
	}

	/// Registers a class under `name`.
	pub fn define<C, F>(&self, name: &str, factory: F) -> Result<ClassDef<C>>
	where
		C: Send + Sync + 'static,
		F: Fn(&mut Scope<'_, '_>) -> LayerResult<C> + Send + Sync + 'static,
	{
		self.register(name, |engine, scoped| engine.define_class(scoped.factory(factory)))
	}

	/// Registers a mixin over base type `B` under `name`.
	pub fn mixin<B, F>(&self, name: &str, factory: F) -> Result<MixinDef<B>>
	where
		B: 'static,
		F: Fn(&mut Scope<'_, '_>) -> LayerResult<Mixin<B>> + Send + Sync + 'static,
	{
		self.register(name, |engine, scoped| engine.define_mixin(scoped.factory(factory)))
	}

	/// Registers a module under `name`.
	pub fn module<T, F>(&self, name: &str, factory: F) -> Result<ModuleDef<T>>
	where
		T: Send + Sync + 'static,
		F: Fn(&mut Scope<'_, '_>) -> LayerResult<T> + Send + Sync + 'static,
	{
		self.register(name, |engine, scoped| engine.define_module(scoped.factory(factory)))
	}

	/// Stacks `transformer` on the class or mixin registered under `name`.
	pub fn extend<A, F>(&self, name: &str, transformer: F) -> Result<Extension<A>>
	where
		A: Send + Sync + 'static,
		F: Fn(&mut Scope<'_, '_>, A) -> LayerResult<A> + Send + Sync + 'static,
	{
		let entry = self.shared.entry(name)?;
		let transformer = self.scoped(name).transformer(transformer);
		let ext = match entry.kind {
			DefKind::Class => self
				.engine
				.add_layer(&entry.typed::<ClassLike, A>(name)?, transformer)?,
			DefKind::Mixin => self
				.engine
				.add_layer(&entry.typed::<MixinLike, A>(name)?, transformer)?,
			DefKind::Module => return Err(RegistryError::NotExtensible { name: name.into() }),
		};
		tracing::debug!(
			engine = %self.engine.config().label,
			name,
			kind = %entry.kind,
			slot = ext.slot(),
			"name extended"
		);
		Ok(ext)
	}

	/// Compiles the definition registered under `name` in a fresh pass.
	pub fn resolve<A>(&self, name: &str) -> Result<Arc<A>>
	where
		A: Send + Sync + 'static,
	{
		self.shared.compile(&mut self.engine.context(), name)
	}

	/// Compiles `name` as a dependency of whatever `cx` is currently building.
	pub fn require<A>(&self, cx: &mut CompileCx<'_>, name: &str) -> Result<Arc<A>>
	where
		A: Send + Sync + 'static,
	{
		self.shared.compile(cx, name)
	}

	/// Compiles the class registered under `name` and instantiates it.
	pub fn create<C: Construct>(&self, name: &str, args: C::Args) -> Result<C::Output> {
		self.shared.create::<C>(&mut self.engine.context(), name, args)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.shared.table.load().names.contains_key(name)
	}

	/// Kind of the definition registered under `name`.
	pub fn kind(&self, name: &str) -> Result<DefKind> {
		Ok(self.shared.entry(name)?.kind)
	}

	/// Returns true if `name` has a memoized artifact.
	pub fn is_cached(&self, name: &str) -> Result<bool> {
		let entry = self.shared.entry(name)?;
		Ok(self.engine.is_cached(&Untyped(entry.def)))
	}

	/// Evicts `name` and everything compiled through it.
	pub fn invalidate(&self, name: &str) -> Result<Cascade> {
		let entry = self.shared.entry(name)?;
		Ok(self.engine.invalidate(&Untyped(entry.def))?)
	}

	/// Names of the definitions that compiled through `name`, in the order
	/// they were first observed. Unnamed parents are skipped.
	pub fn dependents(&self, name: &str) -> Result<Vec<Box<str>>> {
		let entry = self.shared.entry(name)?;
		let parents = self.engine.parents(&Untyped(entry.def))?;
		let table = self.shared.table.load();
		Ok(parents
			.into_iter()
			.filter_map(|id| table.by_def.get(&id).cloned())
			.collect())
	}

	/// Registered names in registration order.
	pub fn names(&self) -> Vec<Box<str>> {
		self.shared.table.load().names.keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.shared.table.load().names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Forgets every name and resets the engine.
	///
	/// Affects every definition on the shared engine, including ones created
	/// without a name. Meant for test isolation.
	///
	/// The engine keeps the cleared definitions so that handles minted before
	/// the reset stay in bounds; registering a name again allocates a new
	/// definition, and the engine's arena grows by one per re-registration.
	pub fn reset(&self) {
		let _write = self.shared.write.lock();
		self.engine.reset_all();
		self.shared.table.store(Arc::new(Table::default()));
		tracing::debug!(engine = %self.engine.config().label, "registry reset");
	}

	fn register<K, A, D>(&self, name: &str, define: D) -> Result<Def<K, A>>
	where
		K: Kind,
		A: Send + Sync + 'static,
		D: FnOnce(&Engine, Scoped) -> Def<K, A>,
	{
		let _write = self.shared.write.lock();
		let current = self.shared.table.load_full();
		if current.names.contains_key(name) {
			return Err(RegistryError::Duplicate { name: name.into() });
		}

		let def = define(&self.engine, self.scoped(name));
		let mut next = Table::clone(&current);
		next.names.insert(name.into(), Entry::new(def));
		next.by_def.insert(def.id(), name.into());
		self.shared.table.store(Arc::new(next));

		tracing::debug!(
			engine = %self.engine.config().label,
			name,
			kind = %K::KIND,
			def = %def.id(),
			"name registered"
		);
		Ok(def)
	}

	fn scoped(&self, name: &str) -> Scoped {
		Scoped {
			name: name.into(),
			shared: Arc::downgrade(&self.shared),
		}
	}
}

/// Adapts registry callbacks to engine callbacks.
///
/// Holds the registry weakly: the engine owns the adapted closures, and the
/// registry owns the engine.
struct Scoped {
	name: Arc<str>,
	shared: Weak<Shared>,
}

impl Scoped {
	fn upgrade(&self) -> Result<Arc<Shared>> {
		self.shared.upgrade().ok_or_else(|| RegistryError::Detached {
			name: self.name.as_ref().into(),
		})
	}

	fn factory<A, F>(
		self,
		factory: F,
	) -> impl Fn(&mut CompileCx<'_>) -> LayerResult<A> + Send + Sync + 'static
	where
		A: Send + Sync + 'static,
		F: Fn(&mut Scope<'_, '_>) -> LayerResult<A> + Send + Sync + 'static,
	{
		move |cx: &mut CompileCx<'_>| {
			let shared = self.upgrade()?;
			factory(&mut Scope::new(&shared, cx))
		}
	}

	fn transformer<A, F>(
		self,
		transformer: F,
	) -> impl Fn(&mut CompileCx<'_>, A) -> LayerResult<A> + Send + Sync + 'static
	where
		A: Send + Sync + 'static,
		F: Fn(&mut Scope<'_, '_>, A) -> LayerResult<A> + Send + Sync + 'static,
	{
		move |cx: &mut CompileCx<'_>, prev: A| {
			let shared = self.upgrade()?;
			transformer(&mut Scope::new(&shared, cx), prev)
		}
	}
}
