//! A table implemented on the extension side of the ABI, keyed by `u64`.
//!
//! Supports `u64`, `u32`, `bool` and string fields. Tests reshape its schema directly
//! to simulate an extension that changes fields on its own.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::rc::Rc;

use lookout_state::{PluginModule, StateType};
use lookout_table_api::{
	PluginRc, RawEntry, RawField, RawPluginState, RawTable, StateData, StateTypeTag, TableFieldInfo, TableFieldsVtable,
	TableInput, TableReaderVtable, TableWriterVtable,
};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct FakeField {
	name: CString,
	ty: StateTypeTag,
	index: usize,
	read_only: bool,
}

#[derive(Default)]
enum Slot {
	#[default]
	Unset,
	Num(u64),
	Bool(bool),
	Str(CString),
}

#[derive(Default)]
struct FakeEntry {
	values: Vec<Slot>,
}

pub struct FakeTable {
	name: CString,
	fields: RefCell<Vec<Box<FakeField>>>,
	listed: RefCell<Vec<TableFieldInfo>>,
	entries: RefCell<BTreeMap<u64, Box<FakeEntry>>>,
	last_error: RefCell<CString>,
	created: Cell<usize>,
	destroyed: Cell<usize>,
	reject_inserts: Cell<bool>,
}

impl FakeTable {
	pub fn new(name: &str) -> Box<Self> {
		Box::new(Self {
			name: CString::new(name).unwrap(),
			fields: RefCell::default(),
			listed: RefCell::default(),
			entries: RefCell::default(),
			last_error: RefCell::default(),
			created: Cell::new(0),
			destroyed: Cell::new(0),
			reject_inserts: Cell::new(false),
		})
	}

	/// Adds a field as if the extension did so on its own.
	pub fn push_field(&self, name: &str, ty: StateType) {
		let mut fields = self.fields.borrow_mut();
		let index = fields.len();
		fields.push(Box::new(FakeField {
			name: CString::new(name).unwrap(),
			ty: ty.to_raw(),
			index,
			read_only: false,
		}));
	}

	pub fn set_read_only(&self, index: usize, on: bool) {
		self.fields.borrow_mut()[index].read_only = on;
	}

	pub fn rename_field(&self, index: usize, name: &str) {
		self.fields.borrow_mut()[index].name = CString::new(name).unwrap();
	}

	pub fn pop_field(&self) {
		self.fields.borrow_mut().pop();
	}

	pub fn reject_inserts(&self, on: bool) {
		self.reject_inserts.set(on);
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	pub fn created(&self) -> usize {
		self.created.get()
	}

	pub fn destroyed(&self) -> usize {
		self.destroyed.get()
	}

	pub fn last_error(&self) -> String {
		self.last_error.borrow().to_string_lossy().into_owned()
	}

	fn fail(&self, message: &str) {
		*self.last_error.borrow_mut() = CString::new(message).unwrap();
	}

	pub fn input(&self) -> TableInput {
		TableInput {
			table: (self as *const Self).cast_mut().cast(),
			name: self.name.as_ptr(),
			key_type: StateType::U64.to_raw(),
			fields: TableFieldsVtable {
				list_table_fields: Some(list_fields),
				get_table_field: Some(get_field),
				add_table_field: Some(add_field),
			},
			reader: TableReaderVtable {
				get_table_name: Some(get_name),
				get_table_size: Some(get_size),
				get_table_entry: Some(get_entry),
				read_entry_field: Some(read_entry_field),
			},
			writer: TableWriterVtable {
				clear_table: Some(clear),
				erase_table_entry: Some(erase_entry),
				create_table_entry: Some(create_entry),
				destroy_table_entry: Some(destroy_entry),
				add_table_entry: Some(add_entry),
				write_entry_field: Some(write_entry_field),
			},
		}
	}

	/// Host-side descriptor of the module owning this table.
	pub fn module(&self, name: &str) -> Rc<PluginModule> {
		let state = (self as *const Self).cast_mut().cast::<RawPluginState>();
		// SAFETY: tests keep the fake alive longer than any table built on it.
		Rc::new(unsafe { PluginModule::new(name, state, Some(module_last_error)) })
	}
}

unsafe fn this<'a>(t: *mut RawTable) -> &'a FakeTable {
	unsafe { &*t.cast::<FakeTable>() }
}

unsafe extern "C" fn module_last_error(s: *mut RawPluginState) -> *const c_char {
	let fake = unsafe { &*s.cast::<FakeTable>() };
	fake.last_error.borrow().as_ptr()
}

unsafe extern "C" fn list_fields(t: *mut RawTable, nfields: *mut u32) -> *const TableFieldInfo {
	let fake = unsafe { this(t) };
	let listed: Vec<_> = fake
		.fields
		.borrow()
		.iter()
		.map(|f| TableFieldInfo {
			name: f.name.as_ptr(),
			field_type: f.ty,
			read_only: u32::from(f.read_only),
		})
		.collect();
	let mut slot = fake.listed.borrow_mut();
	*slot = listed;
	unsafe { *nfields = slot.len() as u32 };
	if slot.is_empty() { ptr::null() } else { slot.as_ptr() }
}

unsafe extern "C" fn get_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	let fake = unsafe { this(t) };
	let name = unsafe { CStr::from_ptr(name) };
	let fields = fake.fields.borrow();
	match fields.iter().find(|f| f.name.as_c_str() == name) {
		Some(f) if f.ty == ty => (&**f as *const FakeField).cast_mut().cast(),
		Some(_) => {
			fake.fail("fake: wrong field type");
			ptr::null_mut()
		}
		None => {
			fake.fail("fake: no such field");
			ptr::null_mut()
		}
	}
}

unsafe extern "C" fn add_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	let fake = unsafe { this(t) };
	let exists = {
		let c = unsafe { CStr::from_ptr(name) };
		fake.fields.borrow().iter().any(|f| f.name.as_c_str() == c)
	};
	if !exists {
		let c = unsafe { CStr::from_ptr(name) };
		let Ok(ty_parsed) = StateType::from_raw(ty) else {
			fake.fail("fake: bad type");
			return ptr::null_mut();
		};
		fake.push_field(&c.to_string_lossy(), ty_parsed);
	}
	unsafe { get_field(t, name, ty) }
}

unsafe extern "C" fn get_name(t: *mut RawTable) -> *const c_char {
	unsafe { this(t) }.name.as_ptr()
}

unsafe extern "C" fn get_size(t: *mut RawTable) -> u64 {
	unsafe { this(t) }.len() as u64
}

unsafe extern "C" fn get_entry(t: *mut RawTable, key: *const StateData) -> *mut RawEntry {
	let fake = unsafe { this(t) };
	let key = unsafe { (*key).u64 };
	match fake.entries.borrow_mut().get_mut(&key) {
		Some(e) => (&mut **e as *mut FakeEntry).cast(),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn read_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	f: *const RawField,
	out: *mut StateData,
) -> PluginRc {
	let fake = unsafe { this(t) };
	let (entry, field) = unsafe { (&*e.cast::<FakeEntry>(), &*f.cast::<FakeField>()) };
	let out = unsafe { &mut *out };
	match (entry.values.get(field.index).unwrap_or(&Slot::Unset), StateType::from_raw(field.ty)) {
		(Slot::Num(n), Ok(StateType::U64)) => out.u64 = *n,
		(Slot::Num(n), Ok(StateType::U32)) => out.u32 = *n as u32,
		(Slot::Bool(b), Ok(StateType::Bool)) => out.b = u32::from(*b),
		(Slot::Str(s), Ok(StateType::String)) => out.str = s.as_ptr(),
		(Slot::Unset, Ok(StateType::String)) => out.str = c"".as_ptr(),
		(Slot::Unset, Ok(_)) => *out = StateData::zeroed(),
		_ => {
			fake.fail("fake: unsupported read");
			return PluginRc::FAILURE;
		}
	}
	PluginRc::SUCCESS
}

unsafe extern "C" fn write_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	f: *const RawField,
	value: *const StateData,
) -> PluginRc {
	let fake = unsafe { this(t) };
	let (entry, field) = unsafe { (&mut *e.cast::<FakeEntry>(), &*f.cast::<FakeField>()) };
	let value = unsafe { &*value };
	let slot = match StateType::from_raw(field.ty) {
		Ok(StateType::U64) => Slot::Num(unsafe { value.u64 }),
		Ok(StateType::U32) => Slot::Num(u64::from(unsafe { value.u32 })),
		Ok(StateType::Bool) => Slot::Bool(unsafe { value.b } != 0),
		Ok(StateType::String) => Slot::Str(unsafe { CStr::from_ptr(value.str) }.to_owned()),
		_ => {
			fake.fail("fake: unsupported write");
			return PluginRc::FAILURE;
		}
	};
	if entry.values.len() <= field.index {
		entry.values.resize_with(field.index + 1, Slot::default);
	}
	entry.values[field.index] = slot;
	PluginRc::SUCCESS
}

unsafe extern "C" fn clear(t: *mut RawTable) -> PluginRc {
	unsafe { this(t) }.entries.borrow_mut().clear();
	PluginRc::SUCCESS
}

unsafe extern "C" fn erase_entry(t: *mut RawTable, key: *const StateData) -> PluginRc {
	let fake = unsafe { this(t) };
	let key = unsafe { (*key).u64 };
	if fake.entries.borrow_mut().remove(&key).is_none() {
		fake.fail("fake: no such key");
		return PluginRc::FAILURE;
	}
	PluginRc::SUCCESS
}

unsafe extern "C" fn create_entry(t: *mut RawTable) -> *mut RawEntry {
	let fake = unsafe { this(t) };
	fake.created.set(fake.created.get() + 1);
	Box::into_raw(Box::<FakeEntry>::default()).cast()
}

unsafe extern "C" fn destroy_entry(t: *mut RawTable, e: *mut RawEntry) {
	let fake = unsafe { this(t) };
	fake.destroyed.set(fake.destroyed.get() + 1);
	drop(unsafe { Box::from_raw(e.cast::<FakeEntry>()) });
}

unsafe extern "C" fn add_entry(t: *mut RawTable, key: *const StateData, e: *mut RawEntry) -> *mut RawEntry {
	let fake = unsafe { this(t) };
	if fake.reject_inserts.get() {
		fake.fail("fake: table is full");
		return ptr::null_mut();
	}
	let key = unsafe { (*key).u64 };
	let entry = unsafe { Box::from_raw(e.cast::<FakeEntry>()) };
	let mut entries = fake.entries.borrow_mut();
	entries.insert(key, entry);
	match entries.get_mut(&key) {
		Some(e) => (&mut **e as *mut FakeEntry).cast(),
		None => ptr::null_mut(),
	}
}
