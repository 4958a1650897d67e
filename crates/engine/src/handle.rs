//! Typed definition and extension handles.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::id::{DefId, DefRef};
use crate::kind::{ClassLike, Extensible, Kind, MixinLike, ModuleLike};
use crate::layer::TransformFn;
use crate::mixin::Mixin;

/// Anything that names a definition and knows its artifact type.
pub trait Definition {
	type Artifact: Send + Sync + 'static;

	fn def_ref(&self) -> DefRef;

	#[inline]
	fn id(&self) -> DefId {
		self.def_ref().id
	}
}

/// Handle to a definition of kind `K` producing artifacts of type `A`.
///
/// Handles are plain copyable references into their engine's arena; they do
/// not keep the engine alive.
pub struct Def<K, A> {
	def: DefRef,
	_marker: PhantomData<fn() -> (K, A)>,
}

/// A class-like definition compiling to a constructor `C`.
pub type ClassDef<C> = Def<ClassLike, C>;

/// A mixin-like definition compiling to a transform over base type `B`.
pub type MixinDef<B> = Def<MixinLike, Mixin<B>>;

/// A module-like definition compiling to a plain value `T`.
pub type ModuleDef<T> = Def<ModuleLike, T>;

impl<K, A> Def<K, A> {
	pub(crate) fn new(def: DefRef) -> Self {
		Self {
			def,
			_marker: PhantomData,
		}
	}
}

impl<K, A> Clone for Def<K, A> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<K, A> Copy for Def<K, A> {}

impl<K, A> PartialEq for Def<K, A> {
	fn eq(&self, other: &Self) -> bool {
		self.def == other.def
	}
}

impl<K, A> Eq for Def<K, A> {}

impl<K, A> std::hash::Hash for Def<K, A> {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.def.hash(state);
	}
}

impl<K: Kind, A> std::fmt::Debug for Def<K, A> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}({})", K::KIND, self.def)
	}
}

impl<K: Kind, A: Send + Sync + 'static> Definition for Def<K, A> {
	type Artifact = A;

	#[inline]
	fn def_ref(&self) -> DefRef {
		self.def
	}
}

/// A target that a transformer layer can be stacked on.
///
/// Single handles resolve to themselves, extensions resolve to the definition
/// they were added to, and lists resolve to their shared origin or fail with
/// [`Error::OriginMismatch`].
pub trait LayerTarget<A> {
	fn origin(&self) -> Result<DefRef>;
}

impl<K: Extensible, A> LayerTarget<A> for Def<K, A> {
	fn origin(&self) -> Result<DefRef> {
		Ok(self.def)
	}
}

impl<A> LayerTarget<A> for Extension<A> {
	fn origin(&self) -> Result<DefRef> {
		Ok(self.origin)
	}
}

impl<A, T: LayerTarget<A> + ?Sized> LayerTarget<A> for &T {
	fn origin(&self) -> Result<DefRef> {
		(**self).origin()
	}
}

impl<A, T: LayerTarget<A>> LayerTarget<A> for [T] {
	fn origin(&self) -> Result<DefRef> {
		let (first, rest) = self.split_first().ok_or(Error::EmptyTarget)?;
		let origin = first.origin()?;
		for item in rest {
			let other = item.origin()?;
			if other != origin {
				return Err(Error::OriginMismatch {
					expected: origin.id,
					found: other.id,
				});
			}
		}
		Ok(origin)
	}
}

impl<A, T: LayerTarget<A>, const N: usize> LayerTarget<A> for [T; N] {
	fn origin(&self) -> Result<DefRef> {
		self.as_slice().origin()
	}
}

impl<A, T: LayerTarget<A>> LayerTarget<A> for Vec<T> {
	fn origin(&self) -> Result<DefRef> {
		self.as_slice().origin()
	}
}

/// Handle to one transformer slot of a definition.
///
/// [`remove`](Self::remove) and [`reapply`](Self::reapply) only ever toggle the
/// slot this handle was created for; slot indices of other extensions never
/// move.
pub struct Extension<A> {
	pub(crate) engine: Engine,
	pub(crate) origin: DefRef,
	pub(crate) slot: usize,
	pub(crate) generation: u32,
	pub(crate) transform: Arc<TransformFn>,
	pub(crate) _artifact: PhantomData<fn() -> A>,
}

impl<A> Extension<A> {
	/// The definition this extension was added to.
	#[inline]
	pub fn origin(&self) -> DefRef {
		self.origin
	}

	/// Slot index of this extension within its definition.
	#[inline]
	pub fn slot(&self) -> usize {
		self.slot
	}

	/// Disables the slot and invalidates everything compiled through it.
	pub fn remove(&self) -> Result<()> {
		self.engine
			.set_slot(self.origin.id, self.slot, self.generation, None)
	}

	/// Restores the slot's transformer and invalidates everything compiled
	/// through it.
	pub fn reapply(&self) -> Result<()> {
		self.engine.set_slot(
			self.origin.id,
			self.slot,
			self.generation,
			Some(Arc::clone(&self.transform)),
		)
	}

	/// Returns true if the slot currently participates in compiles.
	pub fn is_active(&self) -> bool {
		self.engine
			.slot_active(self.origin.id, self.slot, self.generation)
	}
}

impl<A> Clone for Extension<A> {
	fn clone(&self) -> Self {
		Self {
			engine: self.engine.clone(),
			origin: self.origin,
			slot: self.slot,
			generation: self.generation,
			transform: Arc::clone(&self.transform),
			_artifact: PhantomData,
		}
	}
}

impl<A> std::fmt::Debug for Extension<A> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extension")
			.field("origin", &self.origin)
			.field("slot", &self.slot)
			.field("generation", &self.generation)
			.finish_non_exhaustive()
	}
}
