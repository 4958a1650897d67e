use serde::{Deserialize, Serialize};

/// Engine settings.
///
/// Deserializable so a host application can embed it in its own config file:
///
/// ```toml
/// label = "plugins"
/// max_depth = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Name attached to every log event emitted by the engine.
	pub label: String,
	/// Maximum number of nested compiles within one pass.
	pub max_depth: usize,
}

impl EngineConfig {
	pub const DEFAULT_MAX_DEPTH: usize = 256;

	pub fn labeled(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			..Self::default()
		}
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			label: "engine".to_string(),
			max_depth: Self::DEFAULT_MAX_DEPTH,
		}
	}
}
