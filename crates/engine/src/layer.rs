//! Per-definition layer registry.
//!
//! Slot 0 holds the base factory; slots `1..` hold transformers in insertion
//! order. Slots are never reordered or removed: disabling a transformer turns
//! its slot into `None` so every other [`Extension`](crate::Extension) keeps
//! pointing at the slot it was created for.

use std::any::Any;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::context::CompileCx;
use crate::error::{Error, LayerResult};

/// Type-erased value flowing through a fold.
pub(crate) type Value = Box<dyn Any + Send + Sync>;

pub(crate) type BaseFn = dyn Fn(&mut CompileCx<'_>) -> LayerResult<Value> + Send + Sync;
pub(crate) type TransformFn = dyn Fn(&mut CompileCx<'_>, Value) -> LayerResult<Value> + Send + Sync;

/// Erases a typed base factory.
pub(crate) fn erase_base<A, F>(factory: F) -> Arc<BaseFn>
where
	A: Send + Sync + 'static,
	F: Fn(&mut CompileCx<'_>) -> LayerResult<A> + Send + Sync + 'static,
{
	Arc::new(move |cx: &mut CompileCx<'_>| factory(cx).map(|value| Box::new(value) as Value))
}

/// Erases a typed transformer.
pub(crate) fn erase_transform<A, F>(transformer: F) -> Arc<TransformFn>
where
	A: Send + Sync + 'static,
	F: Fn(&mut CompileCx<'_>, A) -> LayerResult<A> + Send + Sync + 'static,
{
	Arc::new(move |cx: &mut CompileCx<'_>, prev: Value| {
		let prev = prev.downcast::<A>().map_err(|_| Error::ArtifactType {
			expected: std::any::type_name::<A>(),
		})?;
		transformer(cx, *prev).map(|value| Box::new(value) as Value)
	})
}

/// Enabled layers captured at the start of a compile.
pub(crate) struct Chain {
	pub(crate) base: Arc<BaseFn>,
	pub(crate) transforms: SmallVec<[(usize, Arc<TransformFn>); 4]>,
}

#[derive(Default)]
pub(crate) struct LayerStack {
	base: Option<Arc<BaseFn>>,
	/// Slot `n` lives at `extensions[n - 1]`.
	extensions: Vec<Option<Arc<TransformFn>>>,
}

impl LayerStack {
	pub(crate) fn new(base: Arc<BaseFn>) -> Self {
		Self {
			base: Some(base),
			extensions: Vec::new(),
		}
	}

	/// Appends a transformer and returns its slot index.
	pub(crate) fn push(&mut self, transform: Arc<TransformFn>) -> usize {
		self.extensions.push(Some(transform));
		self.extensions.len()
	}

	/// Replaces the transformer at `slot`; `None` disables it.
	///
	/// Returns false if the slot does not exist.
	pub(crate) fn set(&mut self, slot: usize, transform: Option<Arc<TransformFn>>) -> bool {
		match slot.checked_sub(1).and_then(|i| self.extensions.get_mut(i)) {
			Some(entry) => {
				*entry = transform;
				true
			}
			None => false,
		}
	}

	pub(crate) fn is_active(&self, slot: usize) -> bool {
		match slot {
			0 => self.base.is_some(),
			n => matches!(self.extensions.get(n - 1), Some(Some(_))),
		}
	}

	/// Total slot count including the base and disabled slots.
	pub(crate) fn len(&self) -> usize {
		usize::from(self.base.is_some()) + self.extensions.len()
	}

	/// Snapshots the enabled layers in slot order.
	///
	/// Returns `None` when there is no base factory.
	pub(crate) fn chain(&self) -> Option<Chain> {
		let base = self.base.clone()?;
		let transforms = self
			.extensions
			.iter()
			.enumerate()
			.filter_map(|(i, slot)| slot.as_ref().map(|t| (i + 1, Arc::clone(t))))
			.collect();
		Some(Chain { base, transforms })
	}

	pub(crate) fn clear(&mut self) {
		self.base = None;
		self.extensions.clear();
	}
}
