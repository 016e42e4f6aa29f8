use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use super::*;
use crate::error::ErrorKind;

fn threads() -> NativeTable<u64> {
	let def = StaticFieldsDef::new()
		.read_only_field("tid", StateType::I64)
		.field("comm", StateType::String);
	NativeTable::with_static_fields("threads", def).unwrap()
}

#[fixture]
fn counters() -> NativeTable<u32> {
	NativeTable::with_static_fields("counters", StaticFieldsDef::new().field("count", StateType::U64)).unwrap()
}

fn insert<K: StateKey>(table: &mut NativeTable<K>, key: K) {
	let entry = table.new_entry().unwrap();
	table.add_entry(key, entry).unwrap();
}

macro_rules! key_round_trip {
	($($name:ident: $ty:ty = $key:expr),* $(,)?) => {
		$(
			#[test]
			fn $name() {
				let mut table = NativeTable::<$ty>::new("t");
				let field = table.add_dynamic_field("v", StateType::U8).unwrap();
				assert_eq!(field.index(), 0);
				let acc = table.accessor("v").unwrap();

				let mut entry = table.new_entry().unwrap();
				entry.set_field(&acc, Value::U8(9)).unwrap();
				table.add_entry($key, entry).unwrap();

				assert_eq!(table.key_type(), <$ty as StateValue>::STATE_TYPE);
				let found = table.get_entry(&$key).unwrap().unwrap();
				assert_eq!(found.get_field(&acc).unwrap(), Value::U8(9));
				assert!(table.erase_entry(&$key).unwrap());
				assert!(table.get_entry(&$key).unwrap().is_none());
			}
		)*
	};
}

key_round_trip! {
	i8_keys: i8 = -3i8,
	i16_keys: i16 = -300i16,
	i32_keys: i32 = i32::MIN,
	i64_keys: i64 = 1i64 << 40,
	u8_keys: u8 = 255u8,
	u16_keys: u16 = 65535u16,
	u32_keys: u32 = 7u32,
	u64_keys: u64 = u64::MAX,
	string_keys: String = String::from("/usr/bin/bash"),
	bool_keys: bool = true,
}

#[rstest]
fn count_field_on_key_seven(mut counters: NativeTable<u32>) {
	let count = counters.typed_accessor::<u64>("count").unwrap();
	let mut entry = counters.new_entry().unwrap();
	entry.write(&count, 10).unwrap();
	counters.add_entry(7, entry).unwrap();

	let mut found = counters.get_entry(&7).unwrap().unwrap();
	assert_eq!(found.read(&count).unwrap(), 10);
	found.write(&count, 11).unwrap();
	assert_eq!(counters.get_entry(&7).unwrap().unwrap().read(&count).unwrap(), 11);
	assert_eq!(counters.entries_count().unwrap(), 1);

	assert!(counters.erase_entry(&7).unwrap());
	assert!(counters.get_entry(&7).unwrap().is_none());
	assert!(!counters.erase_entry(&7).unwrap());
}

#[rstest]
fn adding_under_an_existing_key_replaces(mut counters: NativeTable<u32>) {
	let count = counters.typed_accessor::<u64>("count").unwrap();
	let mut first = counters.new_entry().unwrap();
	first.write(&count, 1).unwrap();
	counters.add_entry(7, first).unwrap();

	let mut second = counters.new_entry().unwrap();
	second.write(&count, 2).unwrap();
	counters.add_entry(7, second).unwrap();

	assert_eq!(counters.entries_count().unwrap(), 1);
	assert_eq!(counters.get_entry(&7).unwrap().unwrap().read(&count).unwrap(), 2);
}

#[rstest]
fn unset_dynamic_fields_read_as_zero(mut counters: NativeTable<u32>) {
	insert(&mut counters, 1);
	counters.add_dynamic_field("label", StateType::String).unwrap();
	let label = counters.accessor("label").unwrap();
	let entry = counters.get_entry(&1).unwrap().unwrap();
	assert_eq!(entry.get_field(&label).unwrap(), Value::String(String::new()));
}

#[test]
fn dynamic_field_with_static_name_is_rejected() {
	let mut table = threads();
	let err = table.add_dynamic_field("comm", StateType::String).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaConflict);
	assert!(matches!(err, StateError::StaticFieldConflict(ref f) if f == "comm"));
	assert!(table.dynamic_fields().unwrap().is_empty());
}

#[rstest]
fn duplicate_dynamic_field_is_rejected(mut counters: NativeTable<u32>) {
	counters.add_dynamic_field("seen", StateType::Bool).unwrap();
	let err = counters.add_dynamic_field("seen", StateType::U64).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaConflict);
	assert_eq!(counters.dynamic_fields().unwrap().len(), 1);
	assert_eq!(counters.accessor("seen").unwrap().ty(), StateType::Bool);
}

#[test]
fn read_only_static_field_rejects_writes() {
	let mut table = threads();
	let tid = table.accessor("tid").unwrap();
	assert_eq!(tid.kind(), FieldKind::Static);

	let mut entry = table.new_entry().unwrap();
	let err = entry.set_field(&tid, Value::I64(4)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ReadOnly);
	assert_eq!(entry.get_field(&tid).unwrap(), Value::I64(0));
}

#[test]
fn mistyped_write_leaves_value_unchanged() {
	let mut table = threads();
	let comm = table.accessor("comm").unwrap();
	let mut entry = table.new_entry().unwrap();
	entry.set_field(&comm, Value::String("init".into())).unwrap();

	let err = entry.set_field(&comm, Value::U32(1)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::TypeMismatch);
	assert_eq!(entry.get_field(&comm).unwrap(), Value::String("init".into()));
}

#[test]
fn accessor_of_another_table_is_rejected() {
	let mut a = threads();
	let b = threads();
	let comm_a = a.accessor("comm").unwrap();
	let entry = b.new_entry().unwrap();
	let err = entry.get_field(&comm_a).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaConflict);
}

#[test]
fn entry_of_another_table_is_rejected() {
	let mut a = threads();
	let b = threads();
	let stray = b.new_entry().unwrap();
	let err = a.add_entry(1, stray).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaConflict);
	assert_eq!(a.entries_count().unwrap(), 0);
}

#[test]
fn field_declared_in_both_parts_is_ambiguous() {
	let mut table = NativeTable::<u64>::new("t");
	table.add_dynamic_field("x", StateType::U8).unwrap();
	// Only reachable when a static set is built with a name already dynamic.
	let schema = table.schema();
	table.static_fields = StaticFieldsDef::new().field("x", StateType::U8).build("t", schema).unwrap();
	let err = table.accessor("x").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SchemaConflict);
	assert!(matches!(err, StateError::AmbiguousField(_)));
}

#[rstest]
fn unknown_field_is_not_found(mut counters: NativeTable<u32>) {
	let err = counters.accessor("missing").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::NotFound);
	assert_eq!(err.to_string(), "undefined field 'missing' in table 'counters'");
}

#[rstest]
fn foreach_stops_when_predicate_returns_false(mut counters: NativeTable<u32>) {
	for key in 0..5 {
		insert(&mut counters, key);
	}
	let mut seen = 0;
	let completed = counters
		.foreach_entry(&mut |_| {
			seen += 1;
			seen < 2
		})
		.unwrap();
	assert!(!completed);
	assert_eq!(seen, 2);

	let mut all = 0;
	assert!(counters.foreach_entry(&mut |_| {
		all += 1;
		true
	})
	.unwrap());
	assert_eq!(all, 5);
}

#[rstest]
fn foreach_can_write_through_entries(mut counters: NativeTable<u32>) {
	let count = counters.accessor("count").unwrap();
	for key in 0..3 {
		insert(&mut counters, key);
	}
	counters
		.foreach_entry(&mut |e| e.set_field(&count, Value::U64(5)).is_ok())
		.unwrap();
	for key in 0..3 {
		assert_eq!(counters.get_entry(&key).unwrap().unwrap().get_field(&count).unwrap(), Value::U64(5));
	}
}

#[rstest]
fn clear_keeps_the_schema(mut counters: NativeTable<u32>) {
	insert(&mut counters, 1);
	insert(&mut counters, 2);
	counters.clear_entries().unwrap();
	assert_eq!(counters.entries_count().unwrap(), 0);
	assert!(counters.accessor("count").is_ok());
}

#[rstest]
fn erase_missing_key_reports_false(mut counters: NativeTable<u32>) {
	assert!(!counters.erase_entry(&99).unwrap());
}

#[test]
fn state_table_delegates_to_native() {
	let mut table: StateTable<u64> = threads().into();
	assert!(!table.is_plugin());
	let comm = table.typed_accessor::<String>("comm").unwrap();
	let mut entry = table.new_entry().unwrap();
	entry.write(&comm, "sshd".to_string()).unwrap();
	table.add_entry(42, entry).unwrap();

	let found = table.get_entry(&42).unwrap().unwrap();
	assert_eq!(found.read(&comm).unwrap(), "sshd");
	assert_eq!(table.name(), "threads");
	assert_eq!(table.key_type(), StateType::U64);
}
