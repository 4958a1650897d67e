//! Mixin artifacts.
//!
//! A compiled mixin is a pure function from a base to an extended base.
//! Mixing several into one base is an ordered chain of single-parent
//! extensions: `mix_with(base, [m1, m2])` is `m2(m1(base))`, so the last
//! listed mixin sits outermost and its overrides win.

use std::sync::Arc;

use crate::error::LayerResult;

type Apply<B> = dyn Fn(B) -> LayerResult<B> + Send + Sync;

/// A transform from a base of type `B` to an extended `B`.
pub struct Mixin<B> {
	apply: Arc<Apply<B>>,
}

impl<B: 'static> Mixin<B> {
	pub fn new<F>(apply: F) -> Self
	where
		F: Fn(B) -> LayerResult<B> + Send + Sync + 'static,
	{
		Self {
			apply: Arc::new(apply),
		}
	}

	/// The mixin that returns its base unchanged.
	pub fn identity() -> Self {
		Self::new(Ok)
	}

	/// Composes `wrap` after this mixin.
	pub fn then<F>(&self, wrap: F) -> Self
	where
		F: Fn(B) -> LayerResult<B> + Send + Sync + 'static,
	{
		let inner = Arc::clone(&self.apply);
		Self::new(move |base| wrap(inner(base)?))
	}

	/// Composes another mixin after this one.
	pub fn and(&self, outer: &Mixin<B>) -> Self {
		let outer = Arc::clone(&outer.apply);
		self.then(move |base| outer(base))
	}

	pub fn apply(&self, base: B) -> LayerResult<B> {
		(self.apply)(base)
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.apply, &other.apply)
	}
}

impl<B> Clone for Mixin<B> {
	fn clone(&self) -> Self {
		Self {
			apply: Arc::clone(&self.apply),
		}
	}
}

impl<B> AsRef<Mixin<B>> for Mixin<B> {
	fn as_ref(&self) -> &Mixin<B> {
		self
	}
}

impl<B> std::fmt::Debug for Mixin<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mixin")
			.field("base", &std::any::type_name::<B>())
			.finish()
	}
}

/// Applies `mixins` to `base` left to right.
///
/// Accepts compiled artifacts directly (`Arc<Mixin<B>>`) as well as plain
/// [`Mixin`] values.
pub fn mix_with<B, M, I>(base: B, mixins: I) -> LayerResult<B>
where
	B: 'static,
	M: AsRef<Mixin<B>>,
	I: IntoIterator<Item = M>,
{
	mixins
		.into_iter()
		.try_fold(base, |acc, mixin| mixin.as_ref().apply(acc))
}
