//! Error types for metric rendering and configuration.

use thiserror::Error;

/// Errors that can occur when building renderers or loading their configuration.
#[derive(Debug, Error)]
pub enum MetricsError {
	/// Error parsing the TOML configuration.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A built-in pattern failed to compile.
	#[error("invalid pattern: {0}")]
	Pattern(#[from] regex::Error),

	/// A configured namespace or subsystem is not a valid name part.
	#[error("invalid {field}: {value:?}")]
	InvalidName { field: &'static str, value: String },
}

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
