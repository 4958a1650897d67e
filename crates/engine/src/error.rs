use crate::id::DefId;
use crate::kind::DefKind;

/// Error type returned by user factories and transformers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for user factories and transformers.
pub type LayerResult<T> = std::result::Result<T, BoxError>;

/// Result type for engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// `add_layer` was given an empty target list.
	#[error("cannot add a layer to an empty target list")]
	EmptyTarget,

	/// A target list spans more than one origin definition.
	#[error("extension targets span different definitions: expected {expected}, found {found}")]
	OriginMismatch { expected: DefId, found: DefId },

	/// A handle minted by another engine was passed in.
	#[error("{def} belongs to a different engine")]
	ForeignHandle { def: DefId },

	/// The definition has no base factory (it was cleared by a reset).
	#[error("{kind} {def} has no base factory")]
	Undefined { def: DefId, kind: DefKind },

	/// The definition is already being compiled in the current pass.
	#[error("{def} is already being compiled in this pass (depth {depth})")]
	Cycle { def: DefId, depth: usize },

	/// Nested compiles exceeded the configured depth.
	#[error("compile depth limit of {limit} exceeded at {def}")]
	DepthExceeded { def: DefId, limit: usize },

	/// A factory or transformer failed.
	#[error("{kind} {def} failed in layer {slot}")]
	Layer {
		def: DefId,
		kind: DefKind,
		slot: usize,
		#[source]
		source: BoxError,
	},

	/// A compiled class failed to produce an instance.
	#[error("failed to instantiate {def}")]
	Instantiate {
		def: DefId,
		#[source]
		source: BoxError,
	},

	/// The extension's slot was wiped by a reset.
	#[error("extension slot {slot} of {def} was cleared by a reset")]
	StaleExtension { def: DefId, slot: usize },

	/// A layer produced a value of the wrong type.
	#[error("layer value is not a `{expected}`")]
	ArtifactType { expected: &'static str },
}

impl Error {
	/// Returns the innermost layer failure, following nested compile errors.
	///
	/// A factory that compiles a dependency wraps the dependency's error in its
	/// own [`Error::Layer`]; this walks down to the definition that actually
	/// failed.
	pub fn root_layer(&self) -> &Error {
		let mut current = self;
		while let Error::Layer { source, .. } = current {
			match source.downcast_ref::<Error>() {
				Some(inner @ Error::Layer { .. }) => current = inner,
				_ => break,
			}
		}
		current
	}
}
