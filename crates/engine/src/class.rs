//! Constructor artifacts for class-like definitions.
//!
//! A class is represented as data: a shareable constructor function. Layering
//! "a class that extends the previous class" becomes wrapping the previous
//! constructor, so a method override is an instance that delegates to the
//! instance its base produced.

use std::sync::Arc;

use crate::error::LayerResult;

/// Something that can be instantiated with arguments.
///
/// [`Engine::create`](crate::Engine::create) requires the artifact of a
/// class-like definition to implement this.
pub trait Construct: Send + Sync + 'static {
	type Args;
	type Output;

	fn construct(&self, args: Self::Args) -> LayerResult<Self::Output>;
}

type Ctor<Args, T> = dyn Fn(Args) -> LayerResult<T> + Send + Sync;

/// A compiled class: a constructor from `Args` to instances of `T`.
///
/// `T` is usually a boxed trait object so that layers can wrap the instance
/// produced by their base and override part of its behavior.
pub struct Class<Args, T> {
	ctor: Arc<Ctor<Args, T>>,
}

impl<Args: 'static, T: 'static> Class<Args, T> {
	pub fn new<F>(ctor: F) -> Self
	where
		F: Fn(Args) -> LayerResult<T> + Send + Sync + 'static,
	{
		Self { ctor: Arc::new(ctor) }
	}

	/// Derives a class whose constructor receives this class as its base.
	///
	/// The derived constructor decides whether and how to call through to the
	/// base, like a subclass constructor calling `super`.
	pub fn extend<F>(&self, ctor: F) -> Self
	where
		F: Fn(&Class<Args, T>, Args) -> LayerResult<T> + Send + Sync + 'static,
	{
		let base = self.clone();
		Self::new(move |args| ctor(&base, args))
	}

	/// Derives a class that post-processes every instance this class builds.
	pub fn map<F>(&self, wrap: F) -> Self
	where
		F: Fn(T) -> LayerResult<T> + Send + Sync + 'static,
	{
		self.extend(move |base, args| wrap(base.instantiate(args)?))
	}

	pub fn instantiate(&self, args: Args) -> LayerResult<T> {
		(self.ctor)(args)
	}

	/// Returns true if both handles share one constructor.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.ctor, &other.ctor)
	}
}

impl<Args, T> Clone for Class<Args, T> {
	fn clone(&self) -> Self {
		Self {
			ctor: Arc::clone(&self.ctor),
		}
	}
}

impl<Args, T> std::fmt::Debug for Class<Args, T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Class")
			.field("args", &std::any::type_name::<Args>())
			.field("output", &std::any::type_name::<T>())
			.finish()
	}
}

impl<Args: 'static, T: 'static> Construct for Class<Args, T> {
	type Args = Args;
	type Output = T;

	fn construct(&self, args: Args) -> LayerResult<T> {
		self.instantiate(args)
	}
}
