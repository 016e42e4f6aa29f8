//! Exposition settings.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{MetricsError, Result};

/// Naming and labelling applied to every exposition block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpositionConfig {
	/// Prefix joined to every metric name with `_`. Empty for none.
	pub namespace: String,
	/// Second prefix, after the namespace. Empty for none.
	pub subsystem: String,
	/// Text of the `# HELP` line. Empty emits a bare `# HELP <name>`.
	pub help: String,
	/// Labels attached to every metric line. Ordered by key.
	pub const_labels: BTreeMap<String, String>,
}

fn valid_part(s: &str) -> bool {
	s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

impl ExpositionConfig {
	/// Parses a TOML document; missing keys take their defaults.
	pub fn from_toml_str(src: &str) -> Result<Self> {
		let config: Self = toml::from_str(src)?;
		for (field, value) in [("namespace", &config.namespace), ("subsystem", &config.subsystem)] {
			if !valid_part(value) {
				return Err(MetricsError::InvalidName {
					field,
					value: value.clone(),
				});
			}
		}
		Ok(config)
	}

	/// `namespace_subsystem_`, skipping empty parts.
	pub fn qualifier(&self) -> String {
		let mut out = String::new();
		for part in [&self.namespace, &self.subsystem] {
			if !part.is_empty() {
				out.push_str(part);
				out.push('_');
			}
		}
		out
	}
}
