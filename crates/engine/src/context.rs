//! Per-pass compile stack.
//!
//! A [`CompileCx`] is the record of which definitions are in progress in one
//! compilation pass. Whatever sits on top of the stack when a definition is
//! compiled becomes that definition's parent, which is how the dependency
//! graph is discovered. The stack belongs to the pass, not to the engine:
//! two passes running at the same time never see each other's frames.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::class::Construct;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::handle::{ClassDef, Definition};
use crate::id::DefId;

/// Compilation context threaded through every factory and transformer.
pub struct CompileCx<'e> {
	engine: &'e Engine,
	stack: SmallVec<[DefId; 8]>,
}

impl<'e> CompileCx<'e> {
	pub(crate) fn new(engine: &'e Engine) -> Self {
		Self {
			engine,
			stack: SmallVec::new(),
		}
	}

	/// The engine this pass compiles against.
	#[inline]
	pub fn engine(&self) -> &'e Engine {
		self.engine
	}

	/// Number of definitions currently in progress.
	#[inline]
	pub fn depth(&self) -> usize {
		self.stack.len()
	}

	/// The definition whose layers are running, if any.
	#[inline]
	pub fn current(&self) -> Option<DefId> {
		self.stack.last().copied()
	}

	/// Ids currently in progress, outermost first.
	pub fn in_progress(&self) -> &[DefId] {
		&self.stack
	}

	pub(crate) fn contains(&self, id: DefId) -> bool {
		self.stack.contains(&id)
	}

	/// Compiles `def` as a dependency of the current definition.
	pub fn compile<D: Definition>(&mut self, def: &D) -> Result<Arc<D::Artifact>> {
		let engine = self.engine;
		engine.compile_in(self, def)
	}

	/// Compiles `def` as a dependency and instantiates it.
	pub fn create<C: Construct>(&mut self, def: &ClassDef<C>, args: C::Args) -> Result<C::Output> {
		let class = self.compile(def)?;
		class.construct(args).map_err(|source| Error::Instantiate {
			def: def.id(),
			source,
		})
	}

	/// Pushes `id` for the lifetime of the returned frame.
	pub(crate) fn enter(&mut self, id: DefId) -> Frame<'_, 'e> {
		self.stack.push(id);
		tracing::trace!(def = %id, depth = self.stack.len(), "frame pushed");
		Frame { cx: self, id }
	}
}

impl std::fmt::Debug for CompileCx<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CompileCx")
			.field("engine", &self.engine.id())
			.field("stack", &self.stack.as_slice())
			.finish()
	}
}

/// Scoped stack frame; pops its definition on every exit path.
pub(crate) struct Frame<'a, 'e> {
	cx: &'a mut CompileCx<'e>,
	id: DefId,
}

impl<'e> Deref for Frame<'_, 'e> {
	type Target = CompileCx<'e>;

	fn deref(&self) -> &Self::Target {
		&*self.cx
	}
}

impl DerefMut for Frame<'_, '_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self.cx
	}
}

impl Drop for Frame<'_, '_> {
	fn drop(&mut self) {
		let popped = self.cx.stack.pop();
		debug_assert_eq!(popped, Some(self.id), "compile stack popped out of order");
		tracing::trace!(def = %self.id, depth = self.cx.stack.len(), "frame popped");
	}
}
