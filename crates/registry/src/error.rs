use stratum_engine::DefKind;

/// Errors raised by name-keyed registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	/// The name was extended or resolved before it was registered.
	#[error("`{name}` is not registered")]
	Unregistered { name: Box<str> },

	/// The name already has a definition.
	#[error("`{name}` is already registered")]
	Duplicate { name: Box<str> },

	/// Modules have exactly one layer.
	#[error("`{name}` is a module and cannot be extended")]
	NotExtensible { name: Box<str> },

	/// Only class definitions produce instances.
	#[error("`{name}` is a {kind}; only classes can be instantiated")]
	NotInstantiable { name: Box<str>, kind: DefKind },

	/// The caller asked for a different artifact type than the name produces.
	#[error("`{name}` produces `{found}`, not `{expected}`")]
	TypeMismatch {
		name: Box<str>,
		expected: &'static str,
		found: &'static str,
	},

	/// A factory registered by name ran after its registry was dropped.
	#[error("registry backing `{name}` was dropped")]
	Detached { name: Box<str> },

	#[error(transparent)]
	Engine(#[from] stratum_engine::Error),
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
