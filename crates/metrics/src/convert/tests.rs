use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn prom() -> PrometheusConverter {
	PrometheusConverter::new().unwrap()
}

fn labelled() -> ExpositionConfig {
	ExpositionConfig {
		namespace: "lookout".into(),
		subsystem: "state".into(),
		help: "state bridge metrics".into(),
		const_labels: BTreeMap::from([
			("raw_name".to_string(), "cpu_usage_perc".to_string()),
			("".to_string(), "dropped".to_string()),
			("engine.kind".to_string(), "kmod".to_string()),
		]),
	}
}

#[test]
fn plain_text_line() {
	let m = Metric::new("n_evts", MetricValue::U64(42), MetricUnit::Count, MetricKind::Monotonic);
	assert_eq!(PlainConverter.to_text(&m), "n_evts 42\n");
}

#[test]
fn output_rule_memory_in_megabytes() {
	let conv = OutputRuleConverter::new().unwrap();
	let mut m = Metric::new(
		"memory_rss_kb",
		MetricValue::U32(262_144),
		MetricUnit::MemoryKibibytes,
		MetricKind::Gauge,
	);
	conv.to_unit_convention(&mut m);
	assert_eq!(m.name, "memory_rss_mb");
	assert_eq!(m.unit, MetricUnit::MemoryMegabytes);
	assert_eq!(conv.to_text(&m), "memory_rss_mb 256.000000\n");
}

#[test]
fn output_rule_leaves_other_units() {
	let conv = OutputRuleConverter::new().unwrap();
	let original = Metric::new("cpu_usage_perc", MetricValue::Double(12.5), MetricUnit::Perc, MetricKind::Gauge);
	let mut m = original.clone();
	conv.to_unit_convention(&mut m);
	assert_eq!(m, original);
}

#[rstest]
fn memory_in_bytes(prom: PrometheusConverter) {
	let mut m = Metric::new(
		"memory_vsz_kb",
		MetricValue::U64(2),
		MetricUnit::MemoryKibibytes,
		MetricKind::Gauge,
	);
	prom.to_unit_convention(&mut m);
	assert_eq!(m.name, "memory_vsz_bytes");
	assert_eq!(m.value, MetricValue::Double(2048.0));
	assert_eq!(
		prom.render(&m, &ExpositionConfig::default()),
		"# HELP memory_vsz_bytes\n# TYPE memory_vsz_bytes gauge\nmemory_vsz_bytes 2048.000000\n"
	);
}

#[rstest]
fn percentage_becomes_ratio(prom: PrometheusConverter) {
	let mut m = Metric::new("cpu_usage_perc", MetricValue::Double(50.0), MetricUnit::Perc, MetricKind::Gauge);
	prom.to_unit_convention(&mut m);
	assert_eq!(m.name, "cpu_usage_ratio");
	assert_eq!(m.unit, MetricUnit::Ratio);
	assert_eq!(m.value, MetricValue::Double(0.5));
}

#[rstest]
fn integer_percentage_is_kept(prom: PrometheusConverter) {
	let original = Metric::new("host_cpu_perc", MetricValue::U32(50), MetricUnit::Perc, MetricKind::Gauge);
	let mut m = original.clone();
	prom.to_unit_convention(&mut m);
	assert_eq!(m, original);
}

#[rstest]
fn counter_block_with_labels(prom: PrometheusConverter) {
	let m = Metric::new("n_evts", MetricValue::U64(7), MetricUnit::Count, MetricKind::Monotonic);
	assert_eq!(
		prom.render(&m, &labelled()),
		concat!(
			"# HELP lookout_state_n_evts_total state bridge metrics\n",
			"# TYPE lookout_state_n_evts_total counter\n",
			"lookout_state_n_evts_total{engine_kind=\"kmod\",raw_name=\"cpu_usage_perc\"} 7\n",
		)
	);
}

#[rstest]
#[case("n_drops_total", MetricUnit::Count, "n_drops_total")]
#[case("cpu_usage_perc", MetricUnit::Perc, "cpu_usage_percentage")]
#[case("duration_ns", MetricUnit::TimeNs, "duration_nanoseconds")]
#[case("start_ts", MetricUnit::TimeTimestampNs, "start_timestamp_nanoseconds")]
#[case("uptime_sec", MetricUnit::TimeS, "uptime_seconds")]
#[case("load", MetricUnit::Ratio, "load_ratio")]
fn recorded_suffixes_are_replaced(
	prom: PrometheusConverter,
	#[case] name: &str,
	#[case] unit: MetricUnit,
	#[case] fqn: &str,
) {
	let m = Metric::new(name, MetricValue::U64(1), unit, MetricKind::Gauge);
	let block = prom.render(&m, &ExpositionConfig::default());
	assert_eq!(block.lines().nth(2), Some(format!("{fqn} 1").as_str()));
}

#[rstest]
#[case("a.b-c", "a_b_c")]
#[case("a__b", "a_b")]
#[case("9lives", "_9lives")]
#[case("", "_")]
#[case("ns:name", "ns:name")]
fn metric_names_are_sanitized(prom: PrometheusConverter, #[case] raw: &str, #[case] clean: &str) {
	assert_eq!(prom.sanitize_name(raw), clean);
}

#[rstest]
fn labels_drop_colons(prom: PrometheusConverter) {
	assert_eq!(prom.sanitize_label("k8s:pod"), "k8s_pod");
}

#[rstest]
fn label_values_are_escaped(prom: PrometheusConverter) {
	let config = ExpositionConfig {
		const_labels: BTreeMap::from([("path".to_string(), "C:\\\"x\"".to_string())]),
		..Default::default()
	};
	let block = prom.render_info("build", &config);
	assert!(block.ends_with("build_info{path=\"C:\\\\\\\"x\\\"\"} 1\n"));
}

#[rstest]
fn info_line(prom: PrometheusConverter) {
	let config = ExpositionConfig {
		namespace: "lookout".into(),
		const_labels: BTreeMap::from([("version".to_string(), "0.10.0".to_string())]),
		..Default::default()
	};
	assert_eq!(
		prom.render_info("build", &config),
		concat!(
			"# HELP lookout_build_info\n",
			"# TYPE lookout_build_info gauge\n",
			"lookout_build_info{version=\"0.10.0\"} 1\n",
		)
	);
}
