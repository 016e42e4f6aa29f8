//! Metric records and their text renderings.
//!
//! A [`Metric`] is a named sample with a unit and a kind. Converters rewrite samples
//! into a unit convention (memory in megabytes for rule output, bytes and ratios for
//! the exposition format) and render them either as plain `name value` lines or as
//! `# HELP` / `# TYPE` exposition blocks.

use std::fmt;

use strum_macros::{Display, EnumIter};

/// Exposition settings.
pub mod config;
/// Unit conventions and renderers.
pub mod convert;
/// Error types.
pub mod error;

pub use config::ExpositionConfig;
pub use convert::{MetricsConverter, OutputRuleConverter, PlainConverter, PrometheusConverter};
pub use error::{MetricsError, Result};

/// Numeric payload of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
	U32(u32),
	S32(i32),
	U64(u64),
	S64(i64),
	Double(f64),
	Float(f32),
	Int(i32),
}

impl fmt::Display for MetricValue {
	/// Integers print exactly; floating values with six decimals.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			MetricValue::U32(v) => write!(f, "{v}"),
			MetricValue::S32(v) | MetricValue::Int(v) => write!(f, "{v}"),
			MetricValue::U64(v) => write!(f, "{v}"),
			MetricValue::S64(v) => write!(f, "{v}"),
			MetricValue::Double(v) => write!(f, "{v:.6}"),
			MetricValue::Float(v) => write!(f, "{:.6}", f64::from(v)),
		}
	}
}

/// Unit of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum MetricUnit {
	Count,
	Ratio,
	Perc,
	MemoryBytes,
	MemoryKibibytes,
	MemoryMegabytes,
	TimeNs,
	TimeS,
	TimeNsCount,
	TimeSCount,
	TimeTimestampNs,
}

impl MetricUnit {
	/// Base-unit suffix used in exposition names.
	pub const fn exposition_suffix(self) -> &'static str {
		match self {
			MetricUnit::Count => "total",
			MetricUnit::Ratio => "ratio",
			MetricUnit::Perc => "percentage",
			MetricUnit::MemoryBytes => "bytes",
			MetricUnit::MemoryKibibytes => "kibibytes",
			MetricUnit::MemoryMegabytes => "megabytes",
			MetricUnit::TimeNs => "nanoseconds",
			MetricUnit::TimeS => "seconds",
			MetricUnit::TimeNsCount => "nanoseconds_total",
			MetricUnit::TimeSCount => "seconds_total",
			MetricUnit::TimeTimestampNs => "timestamp_nanoseconds",
		}
	}

	fn is_memory(self) -> bool {
		matches!(
			self,
			MetricUnit::MemoryBytes | MetricUnit::MemoryKibibytes | MetricUnit::MemoryMegabytes
		)
	}
}

/// Whether a sample only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MetricKind {
	#[strum(serialize = "counter")]
	Monotonic,
	#[strum(serialize = "gauge")]
	Gauge,
}

/// One named sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
	pub name: String,
	pub value: MetricValue,
	pub unit: MetricUnit,
	pub kind: MetricKind,
}

impl Metric {
	pub fn new(name: impl Into<String>, value: MetricValue, unit: MetricUnit, kind: MetricKind) -> Self {
		Self {
			name: name.into(),
			value,
			unit,
			kind,
		}
	}
}

/// Converts an amount of memory between units. Results in kibibytes or megabytes are
/// rounded to one decimal.
pub fn convert_memory(from: MetricUnit, to: MetricUnit, value: f64) -> f64 {
	if !from.is_memory() || !to.is_memory() {
		return value;
	}
	let exponent = |u: MetricUnit| match u {
		MetricUnit::MemoryKibibytes => 1,
		MetricUnit::MemoryMegabytes => 2,
		_ => 0,
	};
	let shift = exponent(from) - exponent(to);
	let out = value * 1024f64.powi(shift);
	match to {
		MetricUnit::MemoryBytes => out,
		_ => (out * 10.0).round() / 10.0,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use strum::IntoEnumIterator;

	use super::*;

	#[rstest]
	#[case(MetricValue::U32(7), "7")]
	#[case(MetricValue::S32(-7), "-7")]
	#[case(MetricValue::U64(u64::MAX), "18446744073709551615")]
	#[case(MetricValue::S64(i64::MIN), "-9223372036854775808")]
	#[case(MetricValue::Int(0), "0")]
	#[case(MetricValue::Double(0.25), "0.250000")]
	#[case(MetricValue::Float(1.5), "1.500000")]
	fn values_print_like_the_exposition_format(#[case] value: MetricValue, #[case] text: &str) {
		assert_eq!(value.to_string(), text);
	}

	#[rstest]
	#[case(MetricUnit::MemoryKibibytes, MetricUnit::MemoryBytes, 2.0, 2048.0)]
	#[case(MetricUnit::MemoryBytes, MetricUnit::MemoryMegabytes, 1_572_864.0, 1.5)]
	#[case(MetricUnit::MemoryKibibytes, MetricUnit::MemoryMegabytes, 1000.0, 1.0)]
	#[case(MetricUnit::MemoryBytes, MetricUnit::MemoryKibibytes, 1100.0, 1.1)]
	#[case(MetricUnit::Count, MetricUnit::MemoryBytes, 3.0, 3.0)]
	fn memory_conversion(#[case] from: MetricUnit, #[case] to: MetricUnit, #[case] value: f64, #[case] want: f64) {
		assert_eq!(convert_memory(from, to, value), want);
	}

	#[test]
	fn every_unit_has_a_distinct_suffix() {
		let mut suffixes: Vec<_> = MetricUnit::iter().map(MetricUnit::exposition_suffix).collect();
		let n = suffixes.len();
		suffixes.sort_unstable();
		suffixes.dedup();
		assert_eq!(suffixes.len(), n);
	}

	#[test]
	fn kinds_name_their_exposition_type() {
		assert_eq!(MetricKind::Monotonic.to_string(), "counter");
		assert_eq!(MetricKind::Gauge.to_string(), "gauge");
	}
}
