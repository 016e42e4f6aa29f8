//! Unit conventions and renderers.

use std::fmt::Write as _;

use regex::Regex;

use crate::config::ExpositionConfig;
use crate::error::Result;
use crate::{Metric, MetricKind, MetricUnit, MetricValue, convert_memory};

/// Rewrites samples into a unit convention and renders them as text.
pub trait MetricsConverter {
	/// Rewrites `metric` in place. The default keeps it as recorded.
	fn to_unit_convention(&self, _metric: &mut Metric) {}

	/// `"name value\n"`.
	fn to_text(&self, metric: &Metric) -> String {
		format!("{} {}\n", metric.name, metric.value)
	}
}

/// Renders samples as recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainConverter;

impl MetricsConverter for PlainConverter {}

fn memory_as_double(metric: &Metric, to: MetricUnit) -> Option<f64> {
	let raw = match metric.value {
		MetricValue::U32(v) => f64::from(v),
		MetricValue::U64(v) => v as f64,
		_ => return None,
	};
	matches!(metric.unit, MetricUnit::MemoryBytes | MetricUnit::MemoryKibibytes)
		.then(|| convert_memory(metric.unit, to, raw))
}

/// Memory in megabytes, for output attached to rule matches.
#[derive(Debug, Clone)]
pub struct OutputRuleConverter {
	memory_suffix: Regex,
}

impl OutputRuleConverter {
	pub fn new() -> Result<Self> {
		Ok(Self {
			memory_suffix: Regex::new("(_kb|_bytes)")?,
		})
	}
}

impl MetricsConverter for OutputRuleConverter {
	fn to_unit_convention(&self, metric: &mut Metric) {
		if let Some(mb) = memory_as_double(metric, MetricUnit::MemoryMegabytes) {
			metric.value = MetricValue::Double(mb);
			metric.name = self.memory_suffix.replace_all(&metric.name, "_mb").into_owned();
			metric.unit = MetricUnit::MemoryMegabytes;
		}
	}
}

/// Base units (bytes, ratios) and the text exposition format.
#[derive(Debug, Clone)]
pub struct PrometheusConverter {
	memory_suffix: Regex,
	perc_suffix: Regex,
	unit_suffixes: Regex,
	name_invalid: Regex,
	label_invalid: Regex,
	underscores: Regex,
}

impl PrometheusConverter {
	pub fn new() -> Result<Self> {
		Ok(Self {
			memory_suffix: Regex::new("(_kb|_bytes)")?,
			perc_suffix: Regex::new("(_perc)")?,
			unit_suffixes: Regex::new("(_kb|_bytes|_mb|_percentage|_perc|_ratio|_ns|_ts|_sec|_total)")?,
			name_invalid: Regex::new("[^a-zA-Z0-9_:]")?,
			label_invalid: Regex::new("[^a-zA-Z0-9_]")?,
			underscores: Regex::new("_+")?,
		})
	}

	fn sanitize(&self, name: &str, invalid: &Regex) -> String {
		let replaced = invalid.replace_all(name, "_");
		let mut out = self.underscores.replace_all(&replaced, "_").into_owned();
		if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
			out.insert(0, '_');
		}
		out
	}

	/// Sanitizes a metric name: invalid characters become `_`, runs of `_` collapse,
	/// and a leading `_` is added unless the name starts with a letter or `_`.
	pub fn sanitize_name(&self, name: &str) -> String {
		self.sanitize(name, &self.name_invalid)
	}

	/// As [`sanitize_name`](Self::sanitize_name), without `:`.
	pub fn sanitize_label(&self, name: &str) -> String {
		self.sanitize(name, &self.label_invalid)
	}

	fn block(&self, qualified: &str, kind: &str, value: &str, config: &ExpositionConfig) -> String {
		let fqn = self.sanitize_name(qualified);
		let mut out = String::new();
		if config.help.is_empty() {
			let _ = writeln!(out, "# HELP {fqn}");
		} else {
			let _ = writeln!(out, "# HELP {fqn} {}", config.help);
		}
		let _ = writeln!(out, "# TYPE {fqn} {kind}");
		out.push_str(&fqn);
		let labels: Vec<_> = config
			.const_labels
			.iter()
			.filter(|(k, _)| !k.is_empty())
			.map(|(k, v)| format!("{}=\"{}\"", self.sanitize_label(k), escape_label_value(v)))
			.collect();
		if !labels.is_empty() {
			let _ = write!(out, "{{{}}}", labels.join(","));
		}
		let _ = writeln!(out, " {value}");
		out
	}

	/// One exposition block for `metric`.
	///
	/// The name is qualified with the namespace and subsystem, stripped of recorded
	/// unit suffixes, and given the base-unit suffix of `metric.unit`.
	pub fn render(&self, metric: &Metric, config: &ExpositionConfig) -> String {
		let qualified = format!("{}{}_", config.qualifier(), metric.name);
		let mut qualified = self.unit_suffixes.replace_all(&qualified, "").into_owned();
		qualified.push_str(metric.unit.exposition_suffix());
		self.block(&qualified, &metric.kind.to_string(), &metric.value.to_string(), config)
	}

	/// A `<name>_info` gauge with value 1, carrying the configured labels.
	pub fn render_info(&self, name: &str, config: &ExpositionConfig) -> String {
		let qualified = format!("{}{name}_info", config.qualifier());
		self.block(&qualified, &MetricKind::Gauge.to_string(), "1", config)
	}
}

fn escape_label_value(v: &str) -> String {
	v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

impl MetricsConverter for PrometheusConverter {
	fn to_unit_convention(&self, metric: &mut Metric) {
		if let Some(bytes) = memory_as_double(metric, MetricUnit::MemoryBytes) {
			metric.value = MetricValue::Double(bytes);
			metric.name = self.memory_suffix.replace_all(&metric.name, "_bytes").into_owned();
			metric.unit = MetricUnit::MemoryBytes;
		} else if let (MetricUnit::Perc, MetricValue::Double(v)) = (metric.unit, metric.value) {
			metric.value = MetricValue::Double(v / 100.0);
			metric.name = self.perc_suffix.replace_all(&metric.name, "_ratio").into_owned();
			metric.unit = MetricUnit::Ratio;
		}
	}
}

#[cfg(test)]
mod tests;
