//! Bridge configuration.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML document could not be parsed.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is outside its allowed range.
	#[error("invalid value for {field}: {reason}")]
	Invalid { field: &'static str, reason: String },
}

/// Tunables of the ABI adapters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
	/// Upper bound on resolved field accessors one outbound adapter keeps.
	pub max_cached_accessors: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			max_cached_accessors: 1024,
		}
	}
}

impl BridgeConfig {
	/// Parses a TOML document; missing keys take their defaults.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		if config.max_cached_accessors == 0 {
			return Err(ConfigError::Invalid {
				field: "max_cached_accessors",
				reason: "must be at least 1".into(),
			});
		}
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_uses_defaults() {
		assert_eq!(BridgeConfig::from_toml_str("").unwrap(), BridgeConfig::default());
	}

	#[test]
	fn cache_bound_is_read() {
		let config = BridgeConfig::from_toml_str("max_cached_accessors = 4").unwrap();
		assert_eq!(config.max_cached_accessors, 4);
	}

	#[test]
	fn zero_bound_is_rejected() {
		let err = BridgeConfig::from_toml_str("max_cached_accessors = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { field: "max_cached_accessors", .. }));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = BridgeConfig::from_toml_str("max_cached = 4").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}
}
