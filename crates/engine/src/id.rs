use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one [`Engine`](crate::Engine) instance.
///
/// Every handle carries the id of the engine that minted it, so a handle
/// passed to the wrong engine is rejected instead of aliasing an unrelated
/// definition at the same dense index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

impl EngineId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	#[inline]
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl std::fmt::Display for EngineId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "engine#{}", self.0)
	}
}

/// Dense arena index of a definition inside its engine.
///
/// Ids are assigned in registration order and never reused; a definition lives
/// for as long as its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(u32);

impl DefId {
	#[inline]
	pub(crate) fn from_index(index: usize) -> Self {
		Self(index as u32)
	}

	#[inline]
	pub fn as_u32(self) -> u32 {
		self.0
	}

	#[inline]
	pub(crate) fn index(self) -> usize {
		self.0 as usize
	}
}

impl std::fmt::Display for DefId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "def#{}", self.0)
	}
}

/// Engine-qualified reference to a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefRef {
	pub(crate) engine: EngineId,
	pub(crate) id: DefId,
}

impl DefRef {
	#[inline]
	pub fn engine(self) -> EngineId {
		self.engine
	}

	#[inline]
	pub fn id(self) -> DefId {
		self.id
	}
}

impl std::fmt::Display for DefRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.engine, self.id)
	}
}
