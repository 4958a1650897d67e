//! Definition kinds.
//!
//! All three kinds share the same layer registry, compile stack and
//! invalidation machinery. They differ in what their artifact is and in
//! whether further layers may be stacked on the base factory:
//!
//! | Kind | Artifact | Extensible |
//! |------|----------|------------|
//! | [`ClassLike`] | a constructor, usually [`Class`](crate::Class) | yes |
//! | [`MixinLike`] | a base transform, [`Mixin`](crate::Mixin) | yes |
//! | [`ModuleLike`] | any plain value | no, exactly one layer |

mod sealed {
	pub trait Sealed {}
}

/// Runtime tag for a definition's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
	Class,
	Mixin,
	Module,
}

impl DefKind {
	/// Returns true if layers can be added on top of the base factory.
	#[inline]
	pub fn is_extensible(self) -> bool {
		!matches!(self, DefKind::Module)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			DefKind::Class => "class",
			DefKind::Mixin => "mixin",
			DefKind::Module => "module",
		}
	}
}

impl std::fmt::Display for DefKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Type-level kind marker carried by [`Def`](crate::Def) handles.
pub trait Kind: sealed::Sealed + 'static {
	const KIND: DefKind;
}

/// Kinds that accept transformer layers.
pub trait Extensible: Kind {}

/// Marker for class-like definitions.
#[derive(Debug, Clone, Copy)]
pub enum ClassLike {}

/// Marker for mixin-like definitions.
#[derive(Debug, Clone, Copy)]
pub enum MixinLike {}

/// Marker for module-like definitions.
#[derive(Debug, Clone, Copy)]
pub enum ModuleLike {}

impl sealed::Sealed for ClassLike {}
impl sealed::Sealed for MixinLike {}
impl sealed::Sealed for ModuleLike {}

impl Kind for ClassLike {
	const KIND: DefKind = DefKind::Class;
}

impl Kind for MixinLike {
	const KIND: DefKind = DefKind::Mixin;
}

impl Kind for ModuleLike {
	const KIND: DefKind = DefKind::Module;
}

impl Extensible for ClassLike {}
impl Extensible for MixinLike {}
